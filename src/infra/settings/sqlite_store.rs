use crate::core::settings::{
    GuildCombinesSettings, ScheduledTeardown, SettingsError, SettingsStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// SQLite-backed settings store. Holds the per-guild combines configuration
/// and the durable teardown queue.
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_combines_settings (
                guild_id INTEGER PRIMARY KEY,
                active BOOLEAN NOT NULL DEFAULT 0,
                api_url TEXT,
                category_id INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_teardowns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                lobby_id INTEGER NOT NULL,
                due TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn storage_err(e: sqlx::Error) -> SettingsError {
    SettingsError::Storage(e.to_string())
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn combines_settings(
        &self,
        guild_id: u64,
    ) -> Result<GuildCombinesSettings, SettingsError> {
        let row = sqlx::query(
            "SELECT active, api_url, category_id FROM guild_combines_settings WHERE guild_id = ?",
        )
        .bind(guild_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(GuildCombinesSettings::default());
        };

        Ok(GuildCombinesSettings {
            active: row.get::<bool, _>("active"),
            api_url: row.get::<Option<String>, _>("api_url"),
            category_id: row
                .get::<Option<i64>, _>("category_id")
                .map(|id| id as u64),
        })
    }

    async fn save_combines_settings(
        &self,
        guild_id: u64,
        settings: &GuildCombinesSettings,
    ) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            INSERT INTO guild_combines_settings (guild_id, active, api_url, category_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                active = excluded.active,
                api_url = excluded.api_url,
                category_id = excluded.category_id
            "#,
        )
        .bind(guild_id as i64)
        .bind(settings.active)
        .bind(settings.api_url.as_deref())
        .bind(settings.category_id.map(|id| id as i64))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn schedule_teardown(
        &self,
        guild_id: u64,
        lobby_id: i64,
        due: DateTime<Utc>,
    ) -> Result<(), SettingsError> {
        sqlx::query("INSERT INTO scheduled_teardowns (guild_id, lobby_id, due) VALUES (?, ?, ?)")
            .bind(guild_id as i64)
            .bind(lobby_id)
            .bind(due)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn due_teardowns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTeardown>, SettingsError> {
        let rows = sqlx::query(
            "SELECT id, guild_id, lobby_id, due FROM scheduled_teardowns WHERE due <= ? ORDER BY due",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .into_iter()
            .map(|row| ScheduledTeardown {
                id: row.get::<i64, _>("id"),
                guild_id: row.get::<i64, _>("guild_id") as u64,
                lobby_id: row.get::<i64, _>("lobby_id"),
                due: row.get::<DateTime<Utc>, _>("due"),
            })
            .collect())
    }

    async fn complete_teardown(&self, id: i64) -> Result<(), SettingsError> {
        sqlx::query("DELETE FROM scheduled_teardowns WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn temp_store() -> (tempfile::TempDir, SqliteSettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        let store = SqliteSettingsStore::new(path.to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn unknown_guild_gets_default_settings() {
        let (_dir, store) = temp_store().await;

        let settings = store.combines_settings(999).await.unwrap();
        assert!(!settings.active);
        assert!(settings.api_url.is_none());
        assert!(settings.category_id.is_none());
    }

    #[tokio::test]
    async fn settings_round_trip_and_overwrite() {
        let (_dir, store) = temp_store().await;

        let first = GuildCombinesSettings {
            active: true,
            api_url: Some("http://combines.local".into()),
            category_id: Some(42),
        };
        store.save_combines_settings(1, &first).await.unwrap();
        assert_eq!(store.combines_settings(1).await.unwrap(), first);

        let second = GuildCombinesSettings {
            active: false,
            api_url: None,
            category_id: Some(43),
        };
        store.save_combines_settings(1, &second).await.unwrap();
        assert_eq!(store.combines_settings(1).await.unwrap(), second);
    }

    #[tokio::test]
    async fn teardowns_become_due_and_complete() {
        let (_dir, store) = temp_store().await;
        let now = Utc::now();

        store
            .schedule_teardown(1, 42, now - Duration::seconds(5))
            .await
            .unwrap();
        store
            .schedule_teardown(1, 43, now + Duration::seconds(30))
            .await
            .unwrap();

        let due = store.due_teardowns(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lobby_id, 42);
        assert_eq!(due[0].guild_id, 1);

        store.complete_teardown(due[0].id).await.unwrap();
        assert!(store.due_teardowns(now).await.unwrap().is_empty());

        // The later row surfaces once its time comes.
        let later = now + Duration::seconds(60);
        let due = store.due_teardowns(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lobby_id, 43);
    }
}
