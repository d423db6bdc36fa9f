use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::db::{Connection, ErrorExt, Result};
use crate::model::UserId;

/// The combined user + profile record returned to clients.
///
/// Profile columns are nullable because the select is a LEFT JOIN; a
/// user whose profile row has not been created yet reads back as nulls
/// rather than disappearing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub custom_user_id: Option<String>,
    pub major: Option<String>,
    pub interests: Option<Vec<String>>,
    pub completed_assessments: Option<i32>,
    pub assessment_results: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    #[tracing::instrument(skip(conn), name = "db.profiles.find")]
    pub async fn find(conn: &mut Connection, id: &UserId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT u.id, u.email, u.display_name, u.photo_url, u.custom_user_id,
                p.major, p.interests, p.completed_assessments, p.assessment_results,
                u.updated_at
            FROM "users" u
            LEFT JOIN "user_profiles" p ON p.user_id = u.id
            WHERE u.id = $1"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }
}

/// Snapshot of a profile's assessment state, locked for update so two
/// concurrent mutations cannot interleave their read-modify-write.
#[derive(Debug, FromRow)]
pub struct AssessmentState {
    pub assessment_results: Option<Value>,
    pub completed_assessments: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub major: Option<String>,
    pub interests: Vec<String>,
    pub completed_assessments: i32,
    pub assessment_results: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Inserts an empty profile row unless one already exists. Part of
    /// the lazy-creation bootstrap; safe to race with itself.
    #[tracing::instrument(skip(conn), name = "db.user_profiles.insert_if_missing")]
    pub async fn insert_if_missing(conn: &mut Connection, user_id: &UserId) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "user_profiles" (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING"#,
        )
        .bind(user_id)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(())
    }

    #[tracing::instrument(skip(conn), name = "db.user_profiles.update")]
    pub async fn update(
        conn: &mut Connection,
        user_id: &UserId,
        major: Option<&str>,
        interests: &[String],
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE "user_profiles"
            SET major = $2, interests = $3, updated_at = now()
            WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(major)
        .bind(interests)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(result.rows_affected())
    }

    /// Reads the assessment state with a row lock held for the rest of
    /// the surrounding transaction.
    #[tracing::instrument(skip(conn), name = "db.user_profiles.lock_assessments")]
    pub async fn lock_assessments(
        conn: &mut Connection,
        user_id: &UserId,
    ) -> Result<Option<AssessmentState>> {
        sqlx::query_as::<_, AssessmentState>(
            r#"SELECT assessment_results, completed_assessments
            FROM "user_profiles"
            WHERE user_id = $1
            FOR UPDATE"#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }

    /// Creates the profile row with an initial assessment payload and a
    /// completion count of one.
    #[tracing::instrument(skip(conn, results), name = "db.user_profiles.insert_with_results")]
    pub async fn insert_with_results(
        conn: &mut Connection,
        user_id: &UserId,
        results: &Value,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "user_profiles" (user_id, assessment_results, completed_assessments)
            VALUES ($1, $2, 1)"#,
        )
        .bind(user_id)
        .bind(results)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(())
    }

    #[tracing::instrument(skip(conn, results), name = "db.user_profiles.set_results")]
    pub async fn set_results(
        conn: &mut Connection,
        user_id: &UserId,
        results: Option<&Value>,
        completed_assessments: i32,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE "user_profiles"
            SET assessment_results = $2, completed_assessments = $3, updated_at = now()
            WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(results)
        .bind(completed_assessments)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(conn), name = "db.user_profiles.delete")]
    pub async fn delete(conn: &mut Connection, user_id: &UserId) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM "user_profiles" WHERE user_id = $1"#)
            .bind(user_id)
            .execute(conn)
            .await
            .into_db_error()?;

        Ok(result.rows_affected())
    }
}
