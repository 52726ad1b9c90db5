use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;

use crate::application::repos::{RepoError, SettingsStore};
use crate::domain::snapshot::StoredOptions;

use super::{PostgresSettingsStore, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct OptionRow {
    key: String,
    value: Json<Value>,
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn load_options(&self) -> Result<StoredOptions, RepoError> {
        let rows = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT key, value
            FROM admin_style_options
            ORDER BY key
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.key, row.value.0))
            .collect())
    }

    async fn replace_options(&self, options: &StoredOptions) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM admin_style_options")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for (key, value) in options {
            sqlx::query(
                r#"
                INSERT INTO admin_style_options (key, value, updated_at)
                VALUES ($1, $2, now())
                "#,
            )
            .bind(key)
            .bind(Json(value))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn clear_options(&self) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM admin_style_options")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
