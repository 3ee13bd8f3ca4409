//!
//! Row types shared by the sqlx data layers, and the handful of lookups
//! more than one data layer needs.
//!

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, SqlitePool};

use crate::data_layer_error::Result;
use crate::models::combat_models::{CombatInstance, CombatStatus, CombatantState, EffectKind, Polarity, StatusEffect};
use crate::models::quest_models::{Difficulty, Quest, Recurrence, SideQuestEvent, Submission};

#[derive(FromRow)]
pub struct QuestEntity {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub quest_type: String,
    pub recurrence: String,
    pub difficulty: String,
    pub target_value: Option<f64>,
    pub base_damage: i64,
    pub base_xp: i64,
    pub tags: String,
}

impl QuestEntity {
    pub fn into_model(self) -> Result<Quest> {
        Ok(Quest {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            quest_type: self.quest_type,
            recurrence: Recurrence::parse(&self.recurrence),
            difficulty: Difficulty::parse(&self.difficulty),
            target_value: self.target_value,
            base_damage: self.base_damage,
            base_xp: self.base_xp,
            tags: serde_json::from_str(&self.tags)?,
        })
    }
}

#[derive(FromRow)]
pub struct SubmissionEntity {
    pub id: i64,
    pub instance_id: i64,
    pub user_id: i64,
    pub quest_id: i64,
    pub date: NaiveDate,
    pub period_start: NaiveDate,
    pub seq: i64,
    pub completed: bool,
    pub value: Option<f64>,
    pub settled_at: Option<NaiveDateTime>,
}

impl From<SubmissionEntity> for Submission {
    fn from(e: SubmissionEntity) -> Self {
        Submission {
            id: e.id,
            instance_id: e.instance_id,
            user_id: e.user_id,
            quest_id: e.quest_id,
            date: e.date,
            period_start: e.period_start,
            seq: e.seq,
            completed: e.completed,
            value: e.value,
            settled_at: e.settled_at,
        }
    }
}

#[derive(FromRow)]
pub struct SideQuestEventEntity {
    pub id: i64,
    pub quest_id: i64,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl From<SideQuestEventEntity> for SideQuestEvent {
    fn from(e: SideQuestEventEntity) -> Self {
        SideQuestEvent { id: e.id, quest_id: e.quest_id, starts_on: e.starts_on, expires_on: e.expires_on }
    }
}

#[derive(FromRow)]
pub struct InstanceEntity {
    pub id: i64,
    pub user_a: i64,
    pub user_b: i64,
    pub status: String,
    pub last_settled_on: Option<NaiveDate>,
}

impl From<InstanceEntity> for CombatInstance {
    fn from(e: InstanceEntity) -> Self {
        CombatInstance {
            id: e.id,
            user_a: e.user_a,
            user_b: e.user_b,
            status: CombatStatus::parse(&e.status),
            last_settled_on: e.last_settled_on,
        }
    }
}

#[derive(FromRow)]
pub struct CombatantEntity {
    pub instance_id: i64,
    pub user_id: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
    pub total_damage_dealt: i64,
    pub last_action_on: Option<NaiveDate>,
}

#[derive(FromRow)]
pub struct EffectEntity {
    pub name: String,
    pub polarity: String,
    pub kind: String,
    pub expires_on: NaiveDate,
}

impl EffectEntity {
    pub fn into_model(self) -> Result<StatusEffect> {
        let polarity = if self.polarity == "buff" { Polarity::Buff } else { Polarity::Debuff };
        let kind: EffectKind = serde_json::from_str(&self.kind)?;
        Ok(StatusEffect { name: self.name, polarity, kind, expires_on: self.expires_on })
    }
}

pub const INSTANCE_COLUMNS: &str = "id, user_a, user_b, status, last_settled_on";
pub const QUEST_COLUMNS: &str =
    "id, user_id, title, quest_type, recurrence, difficulty, target_value, base_damage, base_xp, tags";
pub const SUBMISSION_COLUMNS: &str =
    "id, instance_id, user_id, quest_id, date, period_start, seq, completed, value, settled_at";

pub async fn fetch_instance(db: &SqlitePool, instance_id: i64) -> Result<Option<CombatInstance>> {
    let row = sqlx::query_as::<_, InstanceEntity>(&format!(
        "SELECT {INSTANCE_COLUMNS} FROM combat_instances WHERE id = ?"
    ))
    .bind(instance_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(CombatInstance::from))
}

pub async fn fetch_quest(db: &SqlitePool, quest_id: i64) -> Result<Option<Quest>> {
    let row = sqlx::query_as::<_, QuestEntity>(&format!("SELECT {QUEST_COLUMNS} FROM quests WHERE id = ?"))
        .bind(quest_id)
        .fetch_optional(db)
        .await?;

    row.map(QuestEntity::into_model).transpose()
}

///
/// Retrieves a combatant with its status effects, creating it at full
/// health with `max_hp` if the participant has never been touched
///
pub async fn fetch_combatant(db: &SqlitePool, instance_id: i64, user_id: i64, max_hp: i64) -> Result<CombatantState> {
    sqlx::query("INSERT OR IGNORE INTO combatants (instance_id, user_id, hp, max_hp) VALUES (?, ?, ?, ?)")
        .bind(instance_id)
        .bind(user_id)
        .bind(max_hp)
        .bind(max_hp)
        .execute(db)
        .await?;

    let c = sqlx::query_as::<_, CombatantEntity>(
        "SELECT instance_id, user_id, hp, max_hp, xp, level, streak, total_damage_dealt, last_action_on
         FROM combatants WHERE instance_id = ? AND user_id = ?",
    )
    .bind(instance_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let effects = sqlx::query_as::<_, EffectEntity>(
        "SELECT name, polarity, kind, expires_on FROM status_effects
         WHERE instance_id = ? AND user_id = ? ORDER BY id",
    )
    .bind(instance_id)
    .bind(user_id)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(EffectEntity::into_model)
    .collect::<Result<Vec<_>>>()?;

    Ok(CombatantState {
        instance_id: c.instance_id,
        user_id: c.user_id,
        hp: c.hp,
        max_hp: c.max_hp,
        xp: c.xp,
        level: c.level,
        streak: c.streak,
        effects,
        total_damage_dealt: c.total_damage_dealt,
        last_action_on: c.last_action_on,
    })
}
