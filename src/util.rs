/// Usernames are public handles: 1 to 30 characters, ASCII
/// alphanumerics and underscores only.
#[must_use]
pub fn is_valid_username(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 30
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_format() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("alice_2024"));
        assert!(is_valid_username("A"));
        assert!(is_valid_username(&"a".repeat(30)));

        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"a".repeat(31)));
        assert!(!is_valid_username("ab cd"));
        assert!(!is_valid_username("alice!"));
        assert!(!is_valid_username("alice-2024"));
        assert!(!is_valid_username("ålice"));
    }

    #[test]
    fn blankness() {
        assert!(is_blank(""));
        assert!(is_blank("  "));
        assert!(is_blank("\t\n"));
        assert!(!is_blank(" a "));
    }
}
