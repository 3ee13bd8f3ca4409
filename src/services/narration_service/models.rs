use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::combat_models::CombatantState;
use crate::services::scoring_service::models::Quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CombatantSnapshot {
    pub user_id: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
}

impl From<&CombatantState> for CombatantSnapshot {
    fn from(c: &CombatantState) -> Self {
        Self { user_id: c.user_id, hp: c.hp, max_hp: c.max_hp, xp: c.xp, level: c.level, streak: c.streak }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestLine {
    pub user_id: i64,
    pub quest_title: String,
    pub completed: bool,
    pub quality: Quality,
    pub damage: i64,
    pub xp: i64,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDay {
    pub user_id: i64,
    pub submitted: bool,
    pub damage_dealt: i64,
    pub xp_gained: i64,
    pub critical_hits: usize,
    pub multiplier: f64,
    pub before: CombatantSnapshot,
    pub after: CombatantSnapshot,
}

///
/// Everything the narrator is told about one settled day of one duel
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub instance_id: i64,
    pub date: NaiveDate,
    pub players: Vec<PlayerDay>,
    pub quests: Vec<QuestLine>,
    pub both_submitted: bool,
    ///
    /// `None` when damage is tied
    ///
    pub winner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub instance_id: i64,
    pub week_start: NaiveDate,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub winner_hp: i64,
    pub loser_hp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NarrativeInput {
    DailyBattle(DaySummary),
    WeeklyRewards(WeeklySummary),
}

///
/// Reward/penalty payload of a weekly tournament
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPair {
    pub reward: String,
    pub penalty: String,
}

impl Default for RewardPair {
    fn default() -> Self {
        Self {
            reward: "Winner picks the next weekend activity".to_string(),
            penalty: "Loser makes breakfast on Monday".to_string(),
        }
    }
}
