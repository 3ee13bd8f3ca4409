pub mod data_layer;
pub mod error;
pub mod models;

use std::sync::Arc;

use axum::async_trait;
use chrono::NaiveDate;
use derive_more::Constructor;
use log::{info, warn};

use crate::ai::strip_code_fences;
use crate::calendar::week_start;
use crate::models::combat_models::CombatInstance;

use self::data_layer::TournamentDataLayer;
use self::error::{Result, TournamentServiceError};
use self::models::{decide_winner, NewWeeklyResult, WeeklyResult, WeeklyVerdict};

use super::narration_service::models::{NarrativeInput, RewardPair, WeeklySummary};
use super::narration_service::Narrator;

#[async_trait]
pub trait TournamentService: Send + Sync {
    ///
    /// Decides the week containing `date` from the combatants' current
    /// state. Returns None if the week was already resolved.
    ///
    async fn resolve_week(&self, instance: &CombatInstance, date: NaiveDate) -> Result<Option<WeeklyResult>>;
    ///
    /// Lists the weekly results of an instance the user takes part in, latest first
    ///
    async fn results(&self, user_id: i64, instance_id: i64) -> Result<Vec<WeeklyResult>>;
}

#[derive(Constructor)]
pub struct CoreTournamentService {
    data_layer: Arc<dyn TournamentDataLayer>,
    narrator: Arc<dyn Narrator>,
}

#[async_trait]
impl TournamentService for CoreTournamentService {
    async fn resolve_week(&self, instance: &CombatInstance, date: NaiveDate) -> Result<Option<WeeklyResult>> {
        let week = week_start(date);
        if self.data_layer.get_result(instance.id, week).await?.is_some() {
            return Ok(None);
        }

        let a = self.data_layer.get_combatant(instance.id, instance.user_a).await?;
        let b = self.data_layer.get_combatant(instance.id, instance.user_b).await?;

        let (winner_id, loser_id, winner_hp, loser_hp) = match decide_winner(&a, &b) {
            WeeklyVerdict::Winner { winner_id, loser_id } => {
                let (w, l) = if winner_id == a.user_id { (&a, &b) } else { (&b, &a) };
                (Some(winner_id), Some(loser_id), w.hp, l.hp)
            }
            WeeklyVerdict::Draw => (None, None, a.hp, b.hp),
        };

        let summary = WeeklySummary { instance_id: instance.id, week_start: week, winner_id, loser_id, winner_hp, loser_hp };
        let pair = self.reward_pair(summary).await;

        let result = self.data_layer.insert_result(&NewWeeklyResult {
            instance_id: instance.id,
            week_start: week,
            winner_id,
            loser_id,
            winner_hp,
            loser_hp,
            reward: pair.reward,
            penalty: pair.penalty,
        }).await?;

        if let Some(result) = &result {
            info!(
                "Week of {} resolved for instance {}: winner {:?}",
                week, instance.id, result.winner_id
            );
        }
        Ok(result)
    }

    async fn results(&self, user_id: i64, instance_id: i64) -> Result<Vec<WeeklyResult>> {
        let instance = self.data_layer.get_instance(instance_id).await?
            .ok_or(TournamentServiceError::InstanceNotFound(instance_id))?;
        if !instance.is_participant(user_id) {
            return Err(TournamentServiceError::NotParticipant(instance_id));
        }
        Ok(self.data_layer.get_results(instance_id).await?)
    }
}

impl CoreTournamentService {
    async fn reward_pair(&self, summary: WeeklySummary) -> RewardPair {
        let instance_id = summary.instance_id;
        match self.narrator.summarize(&NarrativeInput::WeeklyRewards(summary)).await {
            Ok(text) => parse_reward_pair(&text).unwrap_or_else(|| {
                warn!("Unusable reward payload for instance {instance_id}. Using the default pair");
                RewardPair::default()
            }),
            Err(e) => {
                warn!("Reward narration failed for instance {instance_id}: {e}. Using the default pair");
                RewardPair::default()
            }
        }
    }
}

fn parse_reward_pair(text: &str) -> Option<RewardPair> {
    serde_json::from_str::<RewardPair>(strip_code_fences(text))
        .ok()
        .filter(|pair| !pair.reward.trim().is_empty() && !pair.penalty.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_pairs_are_validated() {
        let pair = parse_reward_pair("```json\n{\"reward\": \"Pizza night\", \"penalty\": \"Dishes\"}\n```").unwrap();
        assert_eq!(pair.reward, "Pizza night");
        assert!(parse_reward_pair("{\"reward\": \"\", \"penalty\": \"Dishes\"}").is_none());
        assert!(parse_reward_pair("Winner gets pizza").is_none());
    }
}
