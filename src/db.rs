//! Progression Store
//!
//! Durable per-player material tier ceilings and an append-only log of
//! completed objectives. Failures are logged and swallowed: progression
//! gating degrades to the default ceiling instead of blocking gameplay.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::quest::{Objective, PlayerId};

/// Ceiling for players with no stored record
pub const DEFAULT_CEILING: u32 = 1;

pub struct ProgressionStore {
    pool: SqlitePool,
}

impl ProgressionStore {
    /// Open (creating if needed) the database at `database_url`
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database, mainly for tests
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quest_players (
                player_id TEXT PRIMARY KEY,
                max_material_level INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quest_completions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id TEXT NOT NULL,
                quest_level INTEGER NOT NULL,
                quest_type TEXT NOT NULL,
                quest_release_method TEXT NOT NULL,
                material_key TEXT NOT NULL,
                completed_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Progression store migrations complete");
        Ok(())
    }

    /// Highest material tier a player may be offered
    pub async fn get_ceiling(&self, player_id: PlayerId) -> u32 {
        match self.try_get_ceiling(player_id).await {
            Ok(Some(level)) => level,
            Ok(None) => DEFAULT_CEILING,
            Err(e) => {
                tracing::error!("Failed to read ceiling for {}: {}", player_id, e);
                DEFAULT_CEILING
            }
        }
    }

    async fn try_get_ceiling(&self, player_id: PlayerId) -> Result<Option<u32>, sqlx::Error> {
        let row = sqlx::query("SELECT max_material_level FROM quest_players WHERE player_id = ?")
            .bind(player_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let stored: i64 = r.get("max_material_level");
            u32::try_from(stored).unwrap_or_else(|_| {
                tracing::warn!(
                    "Stored ceiling {} for {} is out of range, using default",
                    stored, player_id
                );
                DEFAULT_CEILING
            })
        }))
    }

    /// Insert or overwrite a player's ceiling
    pub async fn set_ceiling(&self, player_id: PlayerId, level: u32) {
        let result = sqlx::query(
            r#"INSERT INTO quest_players (player_id, max_material_level)
            VALUES (?, ?)
            ON CONFLICT(player_id) DO UPDATE SET max_material_level = excluded.max_material_level"#,
        )
        .bind(player_id.to_string())
        .bind(level as i64)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to set ceiling for {} to {}: {}", player_id, level, e);
        }
    }

    /// Append a completion to the history log
    pub async fn record_completion(&self, player_id: PlayerId, objective: &Objective) {
        let result = sqlx::query(
            r#"INSERT INTO quest_completions
            (player_id, quest_level, quest_type, quest_release_method, material_key)
            VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(player_id.to_string())
        .bind(objective.level as i64)
        .bind(objective.objective_type.as_str())
        .bind(objective.release_method.as_str())
        .bind(&objective.material_key)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(
                "Failed to record completion of {} for {}: {}",
                objective.id, player_id, e
            );
        }
    }

    /// Number of logged completions for a player
    pub async fn completion_count(&self, player_id: PlayerId) -> i64 {
        let result = sqlx::query("SELECT COUNT(*) AS n FROM quest_completions WHERE player_id = ?")
            .bind(player_id.to_string())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => row.get("n"),
            Err(e) => {
                tracing::error!("Failed to count completions for {}: {}", player_id, e);
                0
            }
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::objective::tests::sample;
    use crate::quest::ReleaseMethod;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_ceiling_defaults_and_upserts() {
        let store = ProgressionStore::open_in_memory().await.unwrap();
        let player = Uuid::new_v4();

        assert_eq!(store.get_ceiling(player).await, DEFAULT_CEILING);

        store.set_ceiling(player, 3).await;
        assert_eq!(store.get_ceiling(player).await, 3);

        store.set_ceiling(player, 2).await;
        assert_eq!(store.get_ceiling(player).await, 2);
    }

    #[tokio::test]
    async fn test_completion_log_appends() {
        let store = ProgressionStore::open_in_memory().await.unwrap();
        let mut objective = sample(10, 10);
        let player = objective.player_id.unwrap();

        store.record_completion(player, &objective).await;
        objective.release_method = ReleaseMethod::Bounty;
        store.record_completion(player, &objective).await;

        assert_eq!(store.completion_count(player).await, 2);
        assert_eq!(store.completion_count(Uuid::new_v4()).await, 0);

        let row = sqlx::query("SELECT quest_type, quest_release_method, material_key FROM quest_completions ORDER BY id DESC")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("quest_type"), "MATERIAL");
        assert_eq!(row.get::<String, _>("quest_release_method"), "BOUNTY");
        assert_eq!(row.get::<String, _>("material_key"), "MM_DROPS:wolf_pelt");
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("quest.db").display());
        let player = Uuid::new_v4();

        let store = ProgressionStore::open(&url).await.unwrap();
        store.set_ceiling(player, 4).await;
        store.record_completion(player, &sample(5, 5)).await;
        store.close().await;

        let store = ProgressionStore::open(&url).await.unwrap();
        assert_eq!(store.get_ceiling(player).await, 4);
        assert_eq!(store.completion_count(player).await, 1);
    }

    #[tokio::test]
    async fn test_closed_store_degrades_to_defaults() {
        let store = ProgressionStore::open_in_memory().await.unwrap();
        let player = Uuid::new_v4();
        store.close().await;

        // Errors are swallowed
        store.set_ceiling(player, 5).await;
        store.record_completion(player, &sample(1, 1)).await;
        assert_eq!(store.get_ceiling(player).await, DEFAULT_CEILING);
    }

    #[tokio::test]
    async fn test_out_of_range_ceiling_falls_back_to_default() {
        let store = ProgressionStore::open_in_memory().await.unwrap();
        let huge = Uuid::new_v4();
        let negative = Uuid::new_v4();

        for (player, level) in [(huge, i64::from(u32::MAX) + 1), (negative, -3)] {
            sqlx::query("INSERT INTO quest_players (player_id, max_material_level) VALUES (?, ?)")
                .bind(player.to_string())
                .bind(level)
                .execute(&store.pool)
                .await
                .unwrap();
        }

        assert_eq!(store.get_ceiling(huge).await, DEFAULT_CEILING);
        assert_eq!(store.get_ceiling(negative).await, DEFAULT_CEILING);
    }
}
