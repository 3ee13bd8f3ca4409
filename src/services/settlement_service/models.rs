use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::combat_models::StatusEffect;
use crate::models::quest_models::{Quest, Submission};
use crate::services::boss_service::models::BossStatus;
use crate::services::scoring_service::models::Outcome;

///
/// An unsettled submission with the quest it completes
///
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub submission: Submission,
    pub quest: Quest,
}

#[derive(Debug, Clone)]
pub struct SettledOutcome {
    pub submission_id: i64,
    pub outcome: Outcome,
}

///
/// Everything one user's settlement writes, committed atomically
///
#[derive(Debug, Clone)]
pub struct UserSettlement {
    pub instance_id: i64,
    pub user_id: i64,
    pub opponent_id: i64,
    pub date: NaiveDate,
    pub outcomes: Vec<SettledOutcome>,
    pub xp_gained: i64,
    ///
    /// Damage after combo and effect modifiers, before the HP floor
    ///
    pub damage_to_opponent: i64,
    pub streak: i64,
    ///
    /// The complete new effect list of the user
    ///
    pub effects: Vec<StatusEffect>,
    pub settled_at: NaiveDateTime,
}

///
/// A settled submission of a day, as read back for the narrative
///
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettledLine {
    pub user_id: i64,
    pub quest_title: String,
    pub completed: bool,
    pub quality: String,
    pub damage_dealt: i64,
    pub xp_gained: i64,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRecord {
    pub id: i64,
    pub instance_id: i64,
    pub date: NaiveDate,
    pub body: String,
    pub fallback: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceReport {
    pub instance_id: i64,
    pub submissions_settled: usize,
    pub narratives_created: usize,
    pub completed: bool,
    pub weekly_results_created: usize,
}

///
/// Counts of what a settlement run processed
///
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub date: NaiveDate,
    pub instances_processed: usize,
    pub instances_failed: usize,
    pub submissions_settled: usize,
    pub narratives_created: usize,
    pub instances_completed: usize,
    pub weekly_results_created: usize,
    pub boss: Option<BossStatus>,
}

impl SettlementReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            instances_processed: 0,
            instances_failed: 0,
            submissions_settled: 0,
            narratives_created: 0,
            instances_completed: 0,
            weekly_results_created: 0,
            boss: None,
        }
    }

    pub fn record(&mut self, instance: &InstanceReport) {
        self.instances_processed += 1;
        self.submissions_settled += instance.submissions_settled;
        self.narratives_created += instance.narratives_created;
        self.instances_completed += instance.completed as usize;
        self.weekly_results_created += instance.weekly_results_created;
    }

    ///
    /// True when at least one instance faulted and needs another run
    ///
    pub fn has_failures(&self) -> bool {
        self.instances_failed > 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettlementRequest {
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_failed_instance_marks_the_run_for_retry() {
        let mut report = SettlementReport::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        report.record(&InstanceReport { instance_id: 1, submissions_settled: 2, narratives_created: 1, ..Default::default() });
        assert!(!report.has_failures());
        assert_eq!((report.instances_processed, report.submissions_settled, report.narratives_created), (1, 2, 1));

        report.instances_failed += 1;
        assert!(report.has_failures());
    }
}
