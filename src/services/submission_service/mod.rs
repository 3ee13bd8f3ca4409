pub mod data_layer;
pub mod error;
pub mod models;

use std::sync::Arc;

use axum::async_trait;
use chrono::{FixedOffset, NaiveDate};
use derive_more::Constructor;
use log::{debug, info};

use crate::calendar::today_in;
use crate::models::combat_models::{CombatInstance, CombatStatus};
use crate::models::quest_models::Recurrence;

use self::data_layer::SubmissionDataLayer;
use self::error::{Result, SubmissionServiceError};
use self::models::{
    AcceptedSubmission, NewSubmission, QuestAvailabilityModel, QuestEntry, RejectedSubmission, SubmissionRequest,
    SubmissionResponse,
};

use super::availability::{is_available, next_period_opening, period_bounds};

///
/// Real-time ingestion of quest completions. Never scores anything and never
/// touches combatant state; settlement picks the pending rows up later.
///
#[async_trait]
pub trait SubmissionService: Send + Sync {
    ///
    /// Records each requested quest as a pending submission, or rejects it
    /// with a reason and the next date it becomes eligible
    ///
    async fn submit(&self, user_id: i64, request: SubmissionRequest) -> Result<SubmissionResponse>;
    ///
    /// Lists each of the user's quests with its availability on `date` (default today)
    ///
    async fn availability(&self, user_id: i64, date: Option<NaiveDate>) -> Result<Vec<QuestAvailabilityModel>>;
}

#[derive(Constructor)]
pub struct CoreSubmissionService {
    data_layer: Arc<dyn SubmissionDataLayer>,
    game_tz: FixedOffset,
}

#[async_trait]
impl SubmissionService for CoreSubmissionService {
    async fn submit(&self, user_id: i64, request: SubmissionRequest) -> Result<SubmissionResponse> {
        let today = today_in(self.game_tz);
        let date = request.date.unwrap_or(today);
        if date > today {
            return Err(SubmissionServiceError::DateInFuture);
        }

        let instance = self.data_layer.get_instance(request.instance_id).await?
            .ok_or(SubmissionServiceError::InstanceNotFound(request.instance_id))?;

        if !instance.is_participant(user_id) {
            return Err(SubmissionServiceError::NotParticipant(instance.id));
        }
        if instance.status == CombatStatus::Completed {
            return Err(SubmissionServiceError::InstanceCompleted(instance.id));
        }
        if instance.last_settled_on.map_or(false, |settled| date <= settled) {
            return Err(SubmissionServiceError::DateAlreadySettled);
        }

        let (mut accepted, mut rejected) = (Vec::new(), Vec::new());
        for entry in &request.quests {
            match self.submit_one(&instance, user_id, date, entry).await? {
                Ok(a) => accepted.push(a),
                Err(r) => {
                    debug!("Rejected quest {} for user {}: {}", r.quest_id, user_id, r.reason);
                    rejected.push(r)
                }
            }
        }

        info!(
            "User {} submitted {} quest(s) to instance {} for {}: {} accepted, {} rejected",
            user_id, request.quests.len(), instance.id, date, accepted.len(), rejected.len()
        );

        let stats = self.data_layer.get_combatant(instance.id, user_id).await?;
        Ok(SubmissionResponse { accepted, rejected, stats })
    }

    async fn availability(&self, user_id: i64, date: Option<NaiveDate>) -> Result<Vec<QuestAvailabilityModel>> {
        let date = date.unwrap_or_else(|| today_in(self.game_tz));
        let quests = self.data_layer.get_user_quests(user_id).await?;

        let mut models = Vec::with_capacity(quests.len());
        for quest in quests {
            let event = match quest.recurrence {
                Recurrence::Sidequest => self.data_layer.get_sidequest_event(quest.id, date).await?,
                _ => None,
            };
            let gate = is_available(quest.recurrence, date, event.as_ref());
            models.push(QuestAvailabilityModel {
                quest_id: quest.id,
                title: quest.title,
                recurrence: quest.recurrence,
                available: gate.available,
                reason: gate.reason,
                next_available: gate.next_available,
            });
        }
        Ok(models)
    }
}

impl CoreSubmissionService {
    async fn submit_one(
        &self,
        instance: &CombatInstance,
        user_id: i64,
        date: NaiveDate,
        entry: &QuestEntry,
    ) -> Result<std::result::Result<AcceptedSubmission, RejectedSubmission>> {
        let reject = |reason: String, next_available: Option<NaiveDate>| {
            Ok(Err(RejectedSubmission { quest_id: entry.quest_id, reason, next_available }))
        };

        let quest = match self.data_layer.get_quest(entry.quest_id).await? {
            Some(quest) if quest.user_id == user_id => quest,
            _ => return reject("Quest not found".to_string(), None),
        };

        let event = match quest.recurrence {
            Recurrence::Sidequest => self.data_layer.get_sidequest_event(quest.id, date).await?,
            _ => None,
        };

        let gate = is_available(quest.recurrence, date, event.as_ref());
        if !gate.available {
            return reject(gate.reason, gate.next_available);
        }

        let period = period_bounds(quest.recurrence, date, event.as_ref());
        let already_taken_reason = format!("Quest already submitted for this {} period", quest.recurrence.as_str());
        let next_opening = match quest.recurrence {
            Recurrence::Sidequest => None,
            r => next_period_opening(r, date),
        };

        if self.data_layer.has_submission_in_period(instance.id, user_id, quest.id, period.start).await? {
            return reject(already_taken_reason, next_opening);
        }

        let new = NewSubmission {
            instance_id: instance.id,
            user_id,
            quest_id: quest.id,
            date,
            period_start: period.start,
            completed: entry.completed,
            value: entry.value,
        };

        match self.data_layer.insert_submission(&new).await? {
            Some((submission_id, seq)) => Ok(Ok(AcceptedSubmission {
                submission_id,
                quest_id: quest.id,
                seq,
                period_start: period.start,
            })),
            None => reject(already_taken_reason, next_opening),
        }
    }
}
