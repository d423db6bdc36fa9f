
mod assessments;
mod check;
mod custom_id;
mod delete;
mod fetch;
mod photo;
mod update;

pub use self::assessments::{DeleteAssessmentResults, UpdateAssessment};
pub use self::check::{CheckCustomId, CheckUsername};
pub use self::custom_id::UpdateCustomId;
pub use self::delete::DeleteUser;
pub use self::fetch::GetProfile;
pub use self::photo::UpdateProfilePhoto;
pub use self::update::UpdateProfile;
