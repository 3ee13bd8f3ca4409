use crate::models::quest_models::{Quest, Submission};
use crate::resources::game_resources::DifficultyTable;
use crate::services::effects_service::failure_effects;

use super::models::{Outcome, Quality};

///
/// Deterministic outcome used whenever the scorer is unavailable or its
/// answer is unusable. Depends only on the quest's difficulty, categories
/// and the completion flag, and never fails.
///
pub fn fallback_outcome(quest: &Quest, submission: &Submission, table: &DifficultyTable) -> Outcome {
    if !submission.completed {
        return Outcome {
            quality: Quality::Failed,
            damage: 0,
            xp: 0,
            is_critical: false,
            effects: failure_effects(&quest.categories()),
            multiplier: 1.0,
            used_fallback: true,
        };
    }

    let base = table.base_for(quest.difficulty);
    Outcome {
        quality: Quality::Average,
        damage: base.damage,
        xp: base.xp,
        is_critical: false,
        effects: vec![],
        multiplier: 1.0,
        used_fallback: true,
    }
}
