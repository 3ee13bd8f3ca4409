use axum::async_trait;
use chrono::{NaiveDate, Utc};
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::data_layer_error::Result;
use crate::entities::{
    fetch_combatant, fetch_instance, fetch_quest, QuestEntity, SideQuestEventEntity, QUEST_COLUMNS,
};
use crate::models::combat_models::{CombatInstance, CombatantState};
use crate::models::quest_models::{Quest, SideQuestEvent};

use super::models::NewSubmission;

#[async_trait]
pub trait SubmissionDataLayer: Send + Sync {
    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>>;
    async fn get_quest(&self, quest_id: i64) -> Result<Option<Quest>>;
    ///
    /// Retrieves every quest owned by the user
    ///
    async fn get_user_quests(&self, user_id: i64) -> Result<Vec<Quest>>;
    ///
    /// Retrieves the sidequest event covering `date`, or else the next
    /// upcoming one. Expired events are never returned.
    ///
    async fn get_sidequest_event(&self, quest_id: i64, date: NaiveDate) -> Result<Option<SideQuestEvent>>;
    ///
    /// Returns whether a submission of the quest already exists in the period
    /// beginning at `period_start`
    ///
    async fn has_submission_in_period(&self, instance_id: i64, user_id: i64, quest_id: i64, period_start: NaiveDate) -> Result<bool>;
    ///
    /// Appends a pending submission with the next per-day sequence number.
    /// Returns the new `(id, seq)`, or None if the period was taken in the meantime.
    ///
    async fn insert_submission(&self, submission: &NewSubmission) -> Result<Option<(i64, i64)>>;
    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState>;
}

#[derive(Constructor)]
pub struct DbSubmissionDataLayer {
    db: SqlitePool,
    default_max_hp: i64,
}

#[async_trait]
impl SubmissionDataLayer for DbSubmissionDataLayer {
    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>> {
        fetch_instance(&self.db, instance_id).await
    }

    async fn get_quest(&self, quest_id: i64) -> Result<Option<Quest>> {
        fetch_quest(&self.db, quest_id).await
    }

    async fn get_user_quests(&self, user_id: i64) -> Result<Vec<Quest>> {
        sqlx::query_as::<_, QuestEntity>(&format!("SELECT {QUEST_COLUMNS} FROM quests WHERE user_id = ? ORDER BY id"))
            .bind(user_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(QuestEntity::into_model)
            .collect()
    }

    async fn get_sidequest_event(&self, quest_id: i64, date: NaiveDate) -> Result<Option<SideQuestEvent>> {
        // Prefer the event running today
        let current = sqlx::query_as::<_, SideQuestEventEntity>(
            "SELECT id, quest_id, starts_on, expires_on FROM sidequest_events
             WHERE quest_id = ? AND starts_on <= ? AND expires_on >= ?
             ORDER BY starts_on DESC LIMIT 1",
        )
        .bind(quest_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        if let Some(current) = current {
            return Ok(Some(current.into()));
        }

        // Otherwise the next one scheduled
        let upcoming = sqlx::query_as::<_, SideQuestEventEntity>(
            "SELECT id, quest_id, starts_on, expires_on FROM sidequest_events
             WHERE quest_id = ? AND starts_on > ?
             ORDER BY starts_on ASC LIMIT 1",
        )
        .bind(quest_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(upcoming.map(SideQuestEvent::from))
    }

    async fn has_submission_in_period(&self, instance_id: i64, user_id: i64, quest_id: i64, period_start: NaiveDate) -> Result<bool> {
        Ok(sqlx::query(
            "SELECT id FROM submissions WHERE instance_id = ? AND user_id = ? AND quest_id = ? AND period_start = ?",
        )
        .bind(instance_id)
        .bind(user_id)
        .bind(quest_id)
        .bind(period_start)
        .fetch_optional(&self.db)
        .await?
        .is_some())
    }

    async fn insert_submission(&self, s: &NewSubmission) -> Result<Option<(i64, i64)>> {
        // The sequence number is computed inside the insert so concurrent
        // submissions cannot share one; unique constraints turn a lost race
        // into an ignored insert
        let result = sqlx::query(
            "INSERT OR IGNORE INTO submissions
                (instance_id, user_id, quest_id, date, period_start, seq, completed, value, created_at)
             SELECT ?, ?, ?, ?, ?, COALESCE(MAX(seq), 0) + 1, ?, ?, ?
             FROM submissions WHERE instance_id = ? AND user_id = ? AND date = ?",
        )
        .bind(s.instance_id)
        .bind(s.user_id)
        .bind(s.quest_id)
        .bind(s.date)
        .bind(s.period_start)
        .bind(s.completed)
        .bind(s.value)
        .bind(Utc::now().naive_utc())
        .bind(s.instance_id)
        .bind(s.user_id)
        .bind(s.date)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let id = result.last_insert_rowid();
        let seq: (i64,) = sqlx::query_as("SELECT seq FROM submissions WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(Some((id, seq.0)))
    }

    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState> {
        fetch_combatant(&self.db, instance_id, user_id, self.default_max_hp).await
    }
}
