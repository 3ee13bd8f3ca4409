use axum::async_trait;
use chrono::{NaiveDate, Utc};
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::data_layer_error::Result;
use crate::resources::game_resources::BossTemplate;

use super::models::BossEntity;

const BOSS_COLUMNS: &str = "id, month, name, max_hp, hp, status, reward, xp_bonus, completed_at";

#[async_trait]
pub trait BossDataLayer: Send + Sync {
    async fn get_boss(&self, month: NaiveDate) -> Result<Option<BossEntity>>;
    ///
    /// Creates the boss of `month` from `template`. If another caller created
    /// it first, that boss is returned instead.
    ///
    async fn create_boss(&self, month: NaiveDate, template: &BossTemplate) -> Result<BossEntity>;
    ///
    /// Sum of the damage of every settled, completed submission dated
    /// within `[from, to]`, across all combat instances
    ///
    async fn damage_between(&self, from: NaiveDate, to: NaiveDate) -> Result<i64>;
    async fn update_hp(&self, boss_id: i64, hp: i64) -> Result<()>;
    ///
    /// Marks the boss defeated and rewards everyone who completed a quest
    /// within `[from, to]`. Returns the rewarded users, or None if the boss
    /// had already been defeated.
    ///
    async fn defeat_boss(&self, boss_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Option<Vec<i64>>>;
    async fn get_rewarded_users(&self, boss_id: i64) -> Result<Vec<i64>>;
}

#[derive(Constructor)]
pub struct DbBossDataLayer {
    db: SqlitePool,
}

#[async_trait]
impl BossDataLayer for DbBossDataLayer {
    async fn get_boss(&self, month: NaiveDate) -> Result<Option<BossEntity>> {
        Ok(sqlx::query_as::<_, BossEntity>(&format!("SELECT {BOSS_COLUMNS} FROM boss_fights WHERE month = ?"))
            .bind(month)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn create_boss(&self, month: NaiveDate, template: &BossTemplate) -> Result<BossEntity> {
        sqlx::query(
            "INSERT OR IGNORE INTO boss_fights (month, name, max_hp, hp, status, reward, xp_bonus)
             VALUES (?, ?, ?, ?, 'active', ?, ?)",
        )
        .bind(month)
        .bind(&template.name)
        .bind(template.max_hp)
        .bind(template.max_hp)
        .bind(&template.reward)
        .bind(template.xp_bonus)
        .execute(&self.db)
        .await?;

        Ok(sqlx::query_as::<_, BossEntity>(&format!("SELECT {BOSS_COLUMNS} FROM boss_fights WHERE month = ?"))
            .bind(month)
            .fetch_one(&self.db)
            .await?)
    }

    async fn damage_between(&self, from: NaiveDate, to: NaiveDate) -> Result<i64> {
        let (damage,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(damage_dealt), 0) FROM submissions
             WHERE settled_at IS NOT NULL AND completed = TRUE AND date >= ? AND date <= ?",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        Ok(damage)
    }

    async fn update_hp(&self, boss_id: i64, hp: i64) -> Result<()> {
        // Completed bosses are frozen
        sqlx::query("UPDATE boss_fights SET hp = ? WHERE id = ? AND status = 'active'")
            .bind(hp)
            .bind(boss_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn defeat_boss(&self, boss_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Option<Vec<i64>>> {
        let mut tx = self.db.begin().await?;

        let defeated = sqlx::query(
            "UPDATE boss_fights SET status = 'completed', hp = 0, completed_at = ?
             WHERE id = ? AND status = 'active'",
        )
        .bind(Utc::now().naive_utc())
        .bind(boss_id)
        .execute(&mut *tx)
        .await?;

        if defeated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        let users: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT user_id FROM submissions
             WHERE settled_at IS NOT NULL AND completed = TRUE AND date >= ? AND date <= ?
             ORDER BY user_id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *tx)
        .await?;

        for (user_id,) in &users {
            sqlx::query(
                "INSERT OR IGNORE INTO boss_rewards (boss_id, user_id, reward, xp_bonus)
                 SELECT id, ?, reward, xp_bonus FROM boss_fights WHERE id = ?",
            )
            .bind(user_id)
            .bind(boss_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(users.into_iter().map(|(id,)| id).collect()))
    }

    async fn get_rewarded_users(&self, boss_id: i64) -> Result<Vec<i64>> {
        let users: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM boss_rewards WHERE boss_id = ? ORDER BY user_id")
            .bind(boss_id)
            .fetch_all(&self.db)
            .await?;

        Ok(users.into_iter().map(|(id,)| id).collect())
    }
}
