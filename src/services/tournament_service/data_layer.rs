use axum::async_trait;
use chrono::{NaiveDate, Utc};
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::data_layer_error::Result;
use crate::entities::{fetch_combatant, fetch_instance};
use crate::models::combat_models::{CombatInstance, CombatantState};

use super::models::{NewWeeklyResult, WeeklyResult};

const RESULT_COLUMNS: &str =
    "id, instance_id, week_start, winner_id, loser_id, winner_hp, loser_hp, reward, penalty, created_at";

#[async_trait]
pub trait TournamentDataLayer: Send + Sync {
    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>>;
    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState>;
    async fn get_result(&self, instance_id: i64, week_start: NaiveDate) -> Result<Option<WeeklyResult>>;
    ///
    /// Stores a weekly result. Returns None if the week was already resolved.
    ///
    async fn insert_result(&self, result: &NewWeeklyResult) -> Result<Option<WeeklyResult>>;
    async fn get_results(&self, instance_id: i64) -> Result<Vec<WeeklyResult>>;
}

#[derive(Constructor)]
pub struct DbTournamentDataLayer {
    db: SqlitePool,
    default_max_hp: i64,
}

#[async_trait]
impl TournamentDataLayer for DbTournamentDataLayer {
    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>> {
        fetch_instance(&self.db, instance_id).await
    }

    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState> {
        fetch_combatant(&self.db, instance_id, user_id, self.default_max_hp).await
    }

    async fn get_result(&self, instance_id: i64, week_start: NaiveDate) -> Result<Option<WeeklyResult>> {
        Ok(sqlx::query_as::<_, WeeklyResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM weekly_results WHERE instance_id = ? AND week_start = ?"
        ))
        .bind(instance_id)
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn insert_result(&self, r: &NewWeeklyResult) -> Result<Option<WeeklyResult>> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO weekly_results
                (instance_id, week_start, winner_id, loser_id, winner_hp, loser_hp, reward, penalty, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(r.instance_id)
        .bind(r.week_start)
        .bind(r.winner_id)
        .bind(r.loser_id)
        .bind(r.winner_hp)
        .bind(r.loser_hp)
        .bind(&r.reward)
        .bind(&r.penalty)
        .bind(Utc::now().naive_utc())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_result(r.instance_id, r.week_start).await
    }

    async fn get_results(&self, instance_id: i64) -> Result<Vec<WeeklyResult>> {
        Ok(sqlx::query_as::<_, WeeklyResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM weekly_results WHERE instance_id = ? ORDER BY week_start DESC"
        ))
        .bind(instance_id)
        .fetch_all(&self.db)
        .await?)
    }
}
