use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{combat_models::CombatantState, quest_models::Recurrence};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub instance_id: i64,
    pub date: Option<NaiveDate>,
    pub quests: Vec<QuestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestEntry {
    pub quest_id: i64,
    pub completed: bool,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedSubmission {
    pub submission_id: i64,
    pub quest_id: i64,
    pub seq: i64,
    pub period_start: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedSubmission {
    pub quest_id: i64,
    pub reason: String,
    pub next_available: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub accepted: Vec<AcceptedSubmission>,
    pub rejected: Vec<RejectedSubmission>,
    ///
    /// Combatant stats as of the last settlement; today's submissions are not yet applied
    ///
    pub stats: CombatantState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestAvailabilityModel {
    pub quest_id: i64,
    pub title: String,
    pub recurrence: Recurrence,
    pub available: bool,
    pub reason: String,
    pub next_available: Option<NaiveDate>,
}

///
/// A submission that passed every check and is ready to be appended
///
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub instance_id: i64,
    pub user_id: i64,
    pub quest_id: i64,
    pub date: NaiveDate,
    pub period_start: NaiveDate,
    pub completed: bool,
    pub value: Option<f64>,
}
