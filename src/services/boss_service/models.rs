use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::combat_models::CombatStatus;

#[derive(Debug, Clone, FromRow)]
pub struct BossEntity {
    pub id: i64,
    pub month: NaiveDate,
    pub name: String,
    pub max_hp: i64,
    pub hp: i64,
    pub status: String,
    pub reward: String,
    pub xp_bonus: i64,
    pub completed_at: Option<NaiveDateTime>,
}

///
/// The shared boss of one calendar month
///
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BossStatus {
    pub id: i64,
    pub month: NaiveDate,
    pub name: String,
    pub max_hp: i64,
    pub hp: i64,
    pub status: CombatStatus,
    pub reward: String,
    pub xp_bonus: i64,
    pub completed_at: Option<NaiveDateTime>,
    ///
    /// Users who received the reward, in ascending order
    ///
    pub rewarded_users: Vec<i64>,
}

impl BossStatus {
    pub fn from_entity(e: BossEntity, rewarded_users: Vec<i64>) -> Self {
        Self {
            id: e.id,
            month: e.month,
            name: e.name,
            max_hp: e.max_hp,
            hp: e.hp,
            status: CombatStatus::parse(&e.status),
            reward: e.reward,
            xp_bonus: e.xp_bonus,
            completed_at: e.completed_at,
            rewarded_users,
        }
    }
}

///
/// Remaining boss HP after `damage`, floored at 0
///
pub fn remaining_hp(max_hp: i64, damage: i64) -> i64 {
    (max_hp - damage).max(0)
}
