use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::{Connection, ErrorExt, Result};
use crate::model::UserId;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub custom_user_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[tracing::instrument(skip(conn), name = "db.users.find")]
    pub async fn find(conn: &mut Connection, id: &UserId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "users" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Inserts the user row unless one already exists. Part of the
    /// lazy-creation bootstrap; safe to race with itself.
    #[tracing::instrument(skip(conn), name = "db.users.insert_if_missing")]
    pub async fn insert_if_missing(
        conn: &mut Connection,
        id: &UserId,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "users" (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING"#,
        )
        .bind(id)
        .bind(email)
        .bind(display_name)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(())
    }

    #[tracing::instrument(skip(conn), name = "db.users.update_identity")]
    pub async fn update_identity(
        conn: &mut Connection,
        id: &UserId,
        custom_user_id: Option<&str>,
        display_name: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE "users"
            SET custom_user_id = $2, display_name = $3, updated_at = now()
            WHERE id = $1"#,
        )
        .bind(id)
        .bind(custom_user_id)
        .bind(display_name)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(result.rows_affected())
    }

    /// Checks whether another user already holds this custom ID. The
    /// requesting user's own row is excluded so re-submitting the same
    /// handle stays a no-op.
    #[tracing::instrument(skip(conn), name = "db.users.is_custom_id_taken")]
    pub async fn is_custom_id_taken(
        conn: &mut Connection,
        exclude: &UserId,
        custom_user_id: &str,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                SELECT 1 FROM "users" WHERE custom_user_id = $1 AND id <> $2
            )"#,
        )
        .bind(custom_user_id)
        .bind(exclude)
        .fetch_one(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.users.set_custom_id")]
    pub async fn set_custom_id(
        conn: &mut Connection,
        id: &UserId,
        custom_user_id: &str,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"UPDATE "users"
            SET custom_user_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(custom_user_id)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }

    /// Returns the stored photo URL; the outer `None` means no such
    /// user row exists.
    #[tracing::instrument(skip(conn), name = "db.users.photo_url")]
    pub async fn photo_url(conn: &mut Connection, id: &UserId) -> Result<Option<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(r#"SELECT photo_url FROM "users" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.users.set_photo_url")]
    pub async fn set_photo_url(conn: &mut Connection, id: &UserId, photo_url: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE "users" SET photo_url = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(photo_url)
        .execute(conn)
        .await
        .into_db_error()?;

        Ok(result.rows_affected())
    }

    /// Every photo URL referenced by any user row. Used by the upload
    /// directory reconciliation sweep.
    #[tracing::instrument(skip(conn), name = "db.users.all_photo_urls")]
    pub async fn all_photo_urls(conn: &mut Connection) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT photo_url FROM "users" WHERE photo_url IS NOT NULL"#,
        )
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.users.delete")]
    pub async fn delete(conn: &mut Connection, id: &UserId) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM "users" WHERE id = $1"#)
            .bind(id)
            .execute(conn)
            .await
            .into_db_error()?;

        Ok(result.rows_affected())
    }
}
