use crate::auth::Claims;
use crate::{config, db, App};

/// Builds an [`App`] backed by a freshly created, fully migrated test
/// database and a unique uploads directory. Requires `WAYPOINT_DB_URL`
/// or `DATABASE_URL` to point at a reachable Postgres server.
pub(crate) async fn build_test_app() -> App {
    let db = db::Pool::connect_for_tests().await;

    let mut config = config::Server::for_tests();
    config.uploads.dir = std::env::temp_dir().join(format!(
        "waypoint-test-{}",
        random_string::generate(12, "abcdefghijklmnopqrstuvwxyz0123456789")
    ));

    App::from_parts_for_tests(config, db)
}

pub(crate) fn sample_claims() -> Claims {
    claims_for("uid-1234", "alice@example.com", "Alice")
}

pub(crate) fn claims_for(sub: &str, email: &str, name: &str) -> Claims {
    Claims {
        sub: sub.into(),
        email: Some(email.into()),
        name: Some(name.into()),
        exp: chrono::Utc::now().timestamp() + 3600,
    }
}
