use serde_json::Value;

use crate::auth::Claims;
use crate::error::{ApiError, ApiErrorCategory};
use crate::model::{Profile, User, UserProfile};
use crate::App;

/// Replaces the stored assessment results wholesale and bumps the
/// completion counter by one, creating the profile row on first use.
#[derive(Debug)]
pub struct UpdateAssessment<'a> {
    pub claims: &'a Claims,
    pub results: Value,
}

impl UpdateAssessment<'_> {
    #[tracing::instrument(skip(self, app), name = "services.profile.update_assessment")]
    pub async fn perform(self, app: &App) -> Result<Profile, ApiError> {
        let id = self.claims.user_id();

        let mut tx = app.db_write().await?;
        // The profile row needs its user row; bootstrap it so a fresh
        // caller's first assessment does not trip the foreign key.
        User::insert_if_missing(
            &mut *tx,
            &id,
            self.claims.email.as_deref(),
            self.claims.name.as_deref(),
        )
        .await?;

        match UserProfile::lock_assessments(&mut *tx, &id).await? {
            None => {
                UserProfile::insert_with_results(&mut *tx, &id, &self.results).await?;
            }
            Some(state) => {
                // The counter tracks completed assessment runs, not
                // entries in the payload, so it moves by exactly one.
                UserProfile::set_results(
                    &mut *tx,
                    &id,
                    Some(&self.results),
                    clamped_increment(state.completed_assessments),
                )
                .await?;
            }
        }
        tx.commit().await?;

        let mut conn = app.db_read().await?;
        Profile::find(&mut *conn, &id)
            .await?
            .ok_or_else(|| ApiError::unknown().detail("profile row missing after assessment write"))
    }
}

/// Removes every assessment entry whose `date` field matches one of the
/// given dates, and decrements the completion counter accordingly.
#[derive(Debug)]
pub struct DeleteAssessmentResults<'a> {
    pub claims: &'a Claims,
    pub dates: &'a [String],
}

impl DeleteAssessmentResults<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.delete_assessments")]
    pub async fn perform(self, app: &App) -> Result<Profile, ApiError> {
        let id = self.claims.user_id();

        let mut tx = app.db_write().await?;
        let Some(state) = UserProfile::lock_assessments(&mut *tx, &id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound).message("Profile not found"));
        };

        let filtered = state
            .assessment_results
            .map(|results| retain_unmatched(results, self.dates));
        let completed = clamped_decrement(state.completed_assessments, self.dates.len());

        UserProfile::set_results(&mut *tx, &id, filtered.as_ref(), completed).await?;
        tx.commit().await?;

        let mut conn = app.db_read().await?;
        Profile::find(&mut *conn, &id)
            .await?
            .ok_or_else(|| ApiError::unknown().detail("profile row missing after assessment delete"))
    }
}

/// Keeps the entries whose `date` does not match any of the given
/// dates. Entries without a string `date` field are kept, and anything
/// that is not an array passes through untouched.
fn retain_unmatched(results: Value, dates: &[String]) -> Value {
    match results {
        Value::Array(entries) => Value::Array(
            entries
                .into_iter()
                .filter(|entry| {
                    entry
                        .get("date")
                        .and_then(Value::as_str)
                        .map_or(true, |date| !dates.iter().any(|d| d == date))
                })
                .collect(),
        ),
        other => other,
    }
}

/// The counter never goes below zero, no matter how many dates the
/// caller sends.
fn clamped_decrement(current: i32, removed: usize) -> i32 {
    let removed = i32::try_from(removed).unwrap_or(i32::MAX);
    current.saturating_sub(removed).max(0)
}

/// Saturating so a pathological stored counter cannot abort the write.
fn clamped_increment(current: i32) -> i32 {
    current.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_only_matching_dates() {
        let results = json!([
            { "date": "2024-01-01", "score": 10 },
            { "date": "2024-02-01", "score": 20 },
            { "date": "2024-01-01", "score": 30 },
        ]);

        let filtered = retain_unmatched(results, &["2024-01-01".to_string()]);
        assert_eq!(filtered, json!([{ "date": "2024-02-01", "score": 20 }]));
    }

    #[test]
    fn keeps_entries_without_a_date() {
        let results = json!([
            { "score": 10 },
            { "date": "2024-01-01" },
            { "date": 20240101 },
        ]);

        let filtered = retain_unmatched(results, &["2024-01-01".to_string()]);
        assert_eq!(filtered, json!([{ "score": 10 }, { "date": 20240101 }]));
    }

    #[test]
    fn non_array_payloads_pass_through() {
        let results = json!({ "date": "2024-01-01" });
        let filtered = retain_unmatched(results.clone(), &["2024-01-01".to_string()]);
        assert_eq!(filtered, results);
    }

    #[test]
    fn counter_decrements_by_date_count_and_clamps_at_zero() {
        assert_eq!(clamped_decrement(5, 1), 4);
        assert_eq!(clamped_decrement(5, 5), 0);
        assert_eq!(clamped_decrement(2, 7), 0);
        assert_eq!(clamped_decrement(0, 1), 0);
    }

    #[test]
    fn counter_increment_saturates() {
        assert_eq!(clamped_increment(0), 1);
        assert_eq!(clamped_increment(4), 5);
        assert_eq!(clamped_increment(i32::MAX), i32::MAX);
    }

    #[tokio::test]
    async fn counter_moves_by_one_per_submission() {
        let app = crate::test_utils::build_test_app().await;
        let claims = crate::test_utils::sample_claims();

        let first = UpdateAssessment {
            claims: &claims,
            results: json!([{ "date": "2024-01-01", "score": 10 }]),
        }
        .perform(&app)
        .await
        .unwrap();
        assert_eq!(first.completed_assessments, Some(1));

        // A bigger payload still moves the counter by exactly one and
        // replaces the stored results wholesale.
        let results = json!([
            { "date": "2024-02-01", "score": 20 },
            { "date": "2024-03-01", "score": 30 },
            { "date": "2024-04-01", "score": 40 },
        ]);
        let second = UpdateAssessment {
            claims: &claims,
            results: results.clone(),
        }
        .perform(&app)
        .await
        .unwrap();

        assert_eq!(second.completed_assessments, Some(2));
        assert_eq!(second.assessment_results, Some(results));
    }
}
