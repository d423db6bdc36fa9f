mod id;

pub mod profile;
pub mod user;

pub use self::id::UserId;
pub use self::profile::{Profile, UserProfile};
pub use self::user::User;
