use axum::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::data_layer_error::Result;
use crate::entities::{
    fetch_combatant, fetch_instance, InstanceEntity, QuestEntity, SubmissionEntity, INSTANCE_COLUMNS, QUEST_COLUMNS,
    SUBMISSION_COLUMNS,
};
use crate::models::combat_models::{CombatInstance, CombatantState};
use crate::models::quest_models::Submission;

use super::models::{NarrativeRecord, PendingSubmission, SettledLine, UserSettlement};

#[async_trait]
pub trait SettlementDataLayer: Send + Sync {
    ///
    /// Fails when the store cannot be reached
    ///
    async fn ping(&self) -> Result<()>;
    ///
    /// Takes the persisted run-lock for `holder`, overriding a lock acquired
    /// before `stale_before`. Returns false if another runner holds it.
    ///
    async fn try_acquire_lock(&self, holder: &str, now: NaiveDateTime, stale_before: NaiveDateTime) -> Result<bool>;
    async fn release_lock(&self, holder: &str) -> Result<()>;
    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>>;
    async fn get_active_instances(&self) -> Result<Vec<CombatInstance>>;
    ///
    /// Retrieves the unsettled submissions of the instance dated `through`
    /// or earlier, ordered by date, user, then sequence number
    ///
    async fn get_pending_submissions(&self, instance_id: i64, through: NaiveDate) -> Result<Vec<PendingSubmission>>;
    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState>;
    ///
    /// Atomically marks the user's submissions settled, applies their
    /// progress and damages the opponent. Returns false, changing nothing,
    /// if any of the submissions had already been settled.
    ///
    async fn commit_user(&self, settlement: &UserSettlement) -> Result<bool>;
    ///
    /// Drops the user's effects that expired before `today`
    ///
    async fn prune_effects(&self, instance_id: i64, user_id: i64, today: NaiveDate) -> Result<()>;
    ///
    /// Decays the streak of a user who submitted nothing on `date`. Does
    /// nothing once the instance has been settled through `date`, so a
    /// re-run cannot decay twice. Returns whether the streak was touched.
    ///
    async fn decay_absent_streak(&self, instance_id: i64, user_id: i64, date: NaiveDate) -> Result<bool>;
    async fn get_settled_lines(&self, instance_id: i64, date: NaiveDate) -> Result<Vec<SettledLine>>;
    async fn has_narrative(&self, instance_id: i64, date: NaiveDate) -> Result<bool>;
    ///
    /// Stores the narrative of a day. Returns false if one already existed.
    ///
    async fn insert_narrative(&self, instance_id: i64, date: NaiveDate, body: &str, fallback: bool) -> Result<bool>;
    async fn get_narratives(&self, instance_id: i64) -> Result<Vec<NarrativeRecord>>;
    ///
    /// Transitions the instance to completed. Returns true only for the call
    /// that performed the transition.
    ///
    async fn complete_instance(&self, instance_id: i64) -> Result<bool>;
    async fn mark_settled_through(&self, instance_id: i64, date: NaiveDate) -> Result<()>;
    ///
    /// Returns the instance to its initial state. Returns false if the
    /// instance does not exist.
    ///
    async fn reset_instance(&self, instance_id: i64) -> Result<bool>;
}

#[derive(Constructor)]
pub struct DbSettlementDataLayer {
    db: SqlitePool,
    default_max_hp: i64,
}

#[async_trait]
impl SettlementDataLayer for DbSettlementDataLayer {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn try_acquire_lock(&self, holder: &str, now: NaiveDateTime, stale_before: NaiveDateTime) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO settlement_lock (id, holder, acquired_at) VALUES (1, ?, ?)
             ON CONFLICT (id) DO UPDATE SET holder = excluded.holder, acquired_at = excluded.acquired_at
             WHERE settlement_lock.acquired_at < ?",
        )
        .bind(holder)
        .bind(now)
        .bind(stale_before)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_lock(&self, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM settlement_lock WHERE holder = ?")
            .bind(holder)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn get_instance(&self, instance_id: i64) -> Result<Option<CombatInstance>> {
        fetch_instance(&self.db, instance_id).await
    }

    async fn get_active_instances(&self) -> Result<Vec<CombatInstance>> {
        let rows = sqlx::query_as::<_, InstanceEntity>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM combat_instances WHERE status = 'active' ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(CombatInstance::from).collect())
    }

    async fn get_pending_submissions(&self, instance_id: i64, through: NaiveDate) -> Result<Vec<PendingSubmission>> {
        let submissions = sqlx::query_as::<_, SubmissionEntity>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE instance_id = ? AND date <= ? AND settled_at IS NULL
             ORDER BY date, user_id, seq"
        ))
        .bind(instance_id)
        .bind(through)
        .fetch_all(&self.db)
        .await?;

        let mut pending = Vec::with_capacity(submissions.len());
        for s in submissions {
            let quest = sqlx::query_as::<_, QuestEntity>(&format!("SELECT {QUEST_COLUMNS} FROM quests WHERE id = ?"))
                .bind(s.quest_id)
                .fetch_one(&self.db)
                .await?
                .into_model()?;

            pending.push(PendingSubmission { submission: Submission::from(s), quest });
        }
        Ok(pending)
    }

    async fn get_combatant(&self, instance_id: i64, user_id: i64) -> Result<CombatantState> {
        fetch_combatant(&self.db, instance_id, user_id, self.default_max_hp).await
    }

    async fn commit_user(&self, s: &UserSettlement) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        for settled in &s.outcomes {
            let o = &settled.outcome;
            let marked = sqlx::query(
                "UPDATE submissions
                 SET settled_at = ?, quality = ?, damage_dealt = ?, xp_gained = ?, is_critical = ?,
                     multiplier = ?, effects_produced = ?
                 WHERE id = ? AND settled_at IS NULL",
            )
            .bind(s.settled_at)
            .bind(o.quality.as_str())
            .bind(o.damage)
            .bind(o.xp)
            .bind(o.is_critical)
            .bind(o.multiplier)
            .bind(serde_json::to_string(&o.effects)?)
            .bind(settled.submission_id)
            .execute(&mut *tx)
            .await?;

            // Someone else settled it first; leave everything as it was
            if marked.rows_affected() != 1 {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        sqlx::query(
            "UPDATE combatants
             SET xp = xp + ?, level = (xp + ?) / 100 + 1, streak = ?,
                 total_damage_dealt = total_damage_dealt + ?, last_action_on = ?
             WHERE instance_id = ? AND user_id = ?",
        )
        .bind(s.xp_gained)
        .bind(s.xp_gained)
        .bind(s.streak)
        .bind(s.damage_to_opponent)
        .bind(s.date)
        .bind(s.instance_id)
        .bind(s.user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM status_effects WHERE instance_id = ? AND user_id = ?")
            .bind(s.instance_id)
            .bind(s.user_id)
            .execute(&mut *tx)
            .await?;

        for effect in &s.effects {
            sqlx::query(
                "INSERT INTO status_effects (instance_id, user_id, name, polarity, kind, expires_on)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(s.instance_id)
            .bind(s.user_id)
            .bind(&effect.name)
            .bind(effect.polarity.as_str())
            .bind(serde_json::to_string(&effect.kind)?)
            .bind(effect.expires_on)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE combatants SET hp = MAX(0, hp - ?) WHERE instance_id = ? AND user_id = ?")
            .bind(s.damage_to_opponent)
            .bind(s.instance_id)
            .bind(s.opponent_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn prune_effects(&self, instance_id: i64, user_id: i64, today: NaiveDate) -> Result<()> {
        sqlx::query("DELETE FROM status_effects WHERE instance_id = ? AND user_id = ? AND expires_on < ?")
            .bind(instance_id)
            .bind(user_id)
            .bind(today)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn decay_absent_streak(&self, instance_id: i64, user_id: i64, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE combatants SET streak = MAX(0, streak - 1)
             WHERE instance_id = ? AND user_id = ? AND streak > 0
               AND NOT EXISTS (SELECT 1 FROM submissions WHERE instance_id = ? AND user_id = ? AND date = ?)
               AND EXISTS (SELECT 1 FROM combat_instances
                           WHERE id = ? AND (last_settled_on IS NULL OR last_settled_on < ?))",
        )
        .bind(instance_id)
        .bind(user_id)
        .bind(instance_id)
        .bind(user_id)
        .bind(date)
        .bind(instance_id)
        .bind(date)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_settled_lines(&self, instance_id: i64, date: NaiveDate) -> Result<Vec<SettledLine>> {
        Ok(sqlx::query_as::<_, SettledLine>(
            "SELECT s.user_id, q.title AS quest_title, s.completed,
                    COALESCE(s.quality, 'failed') AS quality,
                    COALESCE(s.damage_dealt, 0) AS damage_dealt,
                    COALESCE(s.xp_gained, 0) AS xp_gained,
                    COALESCE(s.is_critical, FALSE) AS is_critical
             FROM submissions s JOIN quests q ON q.id = s.quest_id
             WHERE s.instance_id = ? AND s.date = ? AND s.settled_at IS NOT NULL
             ORDER BY s.user_id, s.seq",
        )
        .bind(instance_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?)
    }

    async fn has_narrative(&self, instance_id: i64, date: NaiveDate) -> Result<bool> {
        Ok(sqlx::query("SELECT id FROM narratives WHERE instance_id = ? AND date = ?")
            .bind(instance_id)
            .bind(date)
            .fetch_optional(&self.db)
            .await?
            .is_some())
    }

    async fn insert_narrative(&self, instance_id: i64, date: NaiveDate, body: &str, fallback: bool) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO narratives (instance_id, date, body, fallback, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(instance_id)
        .bind(date)
        .bind(body)
        .bind(fallback)
        .bind(Utc::now().naive_utc())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_narratives(&self, instance_id: i64) -> Result<Vec<NarrativeRecord>> {
        Ok(sqlx::query_as::<_, NarrativeRecord>(
            "SELECT id, instance_id, date, body, fallback, created_at FROM narratives
             WHERE instance_id = ? ORDER BY date DESC LIMIT 30",
        )
        .bind(instance_id)
        .fetch_all(&self.db)
        .await?)
    }

    async fn complete_instance(&self, instance_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE combat_instances SET status = 'completed', completed_at = ?
             WHERE id = ? AND status = 'active'
               AND EXISTS (SELECT 1 FROM combatants WHERE instance_id = ? AND hp <= 0)",
        )
        .bind(Utc::now().naive_utc())
        .bind(instance_id)
        .bind(instance_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_settled_through(&self, instance_id: i64, date: NaiveDate) -> Result<()> {
        sqlx::query(
            "UPDATE combat_instances SET last_settled_on = ?
             WHERE id = ? AND (last_settled_on IS NULL OR last_settled_on < ?)",
        )
        .bind(date)
        .bind(instance_id)
        .bind(date)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn reset_instance(&self, instance_id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let reactivated = sqlx::query(
            "UPDATE combat_instances SET status = 'active', last_settled_on = NULL, completed_at = NULL WHERE id = ?",
        )
        .bind(instance_id)
        .execute(&mut *tx)
        .await?;

        if reactivated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for table in ["submissions", "status_effects", "narratives", "weekly_results"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE instance_id = ?"))
                .bind(instance_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "UPDATE combatants
             SET hp = max_hp, xp = 0, level = 1, streak = 0, total_damage_dealt = 0, last_action_on = NULL
             WHERE instance_id = ?",
        )
        .bind(instance_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
