use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::combat_models::CombatantState;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyResult {
    pub id: i64,
    pub instance_id: i64,
    pub week_start: NaiveDate,
    ///
    /// `None` on a draw
    ///
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub winner_hp: i64,
    pub loser_hp: i64,
    pub reward: String,
    pub penalty: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewWeeklyResult {
    pub instance_id: i64,
    pub week_start: NaiveDate,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub winner_hp: i64,
    pub loser_hp: i64,
    pub reward: String,
    pub penalty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeeklyVerdict {
    Winner { winner_id: i64, loser_id: i64 },
    Draw,
}

///
/// Higher HP wins the week; equal HP goes to the higher cumulative damage
///
pub fn decide_winner(a: &CombatantState, b: &CombatantState) -> WeeklyVerdict {
    match (a.hp, a.total_damage_dealt).cmp(&(b.hp, b.total_damage_dealt)) {
        std::cmp::Ordering::Greater => WeeklyVerdict::Winner { winner_id: a.user_id, loser_id: b.user_id },
        std::cmp::Ordering::Less => WeeklyVerdict::Winner { winner_id: b.user_id, loser_id: a.user_id },
        std::cmp::Ordering::Equal => WeeklyVerdict::Draw,
    }
}
