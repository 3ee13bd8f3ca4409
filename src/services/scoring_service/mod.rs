pub mod cache;
pub mod fallback;
pub mod models;
pub mod settings;

use std::sync::Arc;

use axum::async_trait;
use derive_more::Constructor;
use lazy_static::lazy_static;
use log::{debug, warn};
use rand::{thread_rng, Rng};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::{strip_code_fences, LlmClient, LlmError, Message};
use crate::models::quest_models::{Quest, Submission};
use crate::resources::game_resources::Resources;

use self::cache::ScoreCache;
use self::fallback::fallback_outcome;
use self::models::{CachedScore, CombatantContext, Outcome, Quality};
use self::settings::ScoringSettings;

use super::effects_service::{crit_bonus_pct, excellence_effects, failure_effects};

#[async_trait]
pub trait ScoringService: Send + Sync {
    ///
    /// Scores a single submission. Never fails: when the external scorer
    /// cannot produce a usable verdict the deterministic fallback is used.
    ///
    async fn evaluate(&self, quest: &Quest, submission: &Submission, ctx: &CombatantContext) -> Outcome;
}

lazy_static! {
    static ref SCORE_RESPONSE_SCHEMA: Value = json!({
        "type": "object",
        "required": ["quality", "damage", "xp"],
        "properties": {
            "quality": { "enum": ["failed", "poor", "average", "good", "excellent"] },
            "damage": { "type": "integer", "minimum": 0 },
            "xp": { "type": "integer", "minimum": 0 },
            "reasoning": { "type": "string" }
        }
    });
    static ref SCORE_RESPONSE_VALIDATOR: jsonschema::Validator =
        jsonschema::validator_for(&SCORE_RESPONSE_SCHEMA).expect("score response schema must compile");
}

const SYSTEM_PROMPT: &str = r#"You are the referee of a habit-tracking duel. You grade one quest submission.

Respond with a single JSON object and nothing else:
{ "quality": "<failed|poor|average|good|excellent>", "damage": <integer>, "xp": <integer>, "reasoning": "<short>" }

Ranges per quality (inclusive):
- failed: damage 0, xp 0 (always use this when the quest was not completed)
- poor: damage 1-5, xp 1-5
- average: damage 6-12, xp 5-15
- good: damage 13-20, xp 15-25
- excellent: damage 21-30, xp 25-40

Weigh the submitted value against the quest's target and difficulty. The quest's base_damage and
base_xp are what a plain, on-target completion is worth; stay within the ranges above."#;

#[derive(Deserialize)]
struct ScoreResponse {
    quality: Quality,
    damage: i64,
    xp: i64,
}

///
/// Key under which equivalent submissions share a verdict
///
pub fn cache_key(quest: &Quest, submission: &Submission) -> String {
    let value = submission.value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string());
    format!(
        "{}|{}|{}|{}",
        quest.quest_type.to_lowercase(),
        quest.difficulty.as_str(),
        submission.completed,
        value
    )
}

///
/// Validates a raw scorer response against the response schema, the tier
/// ranges and the completion flag
///
pub fn parse_score_response(raw: &str, completed: bool) -> Result<CachedScore, LlmError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| LlmError::InvalidResponse(format!("not JSON: {e}")))?;

    let errors: Vec<String> = SCORE_RESPONSE_VALIDATOR.iter_errors(&value).map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        return Err(LlmError::InvalidResponse(errors.join("; ")));
    }

    let resp: ScoreResponse =
        serde_json::from_value(value).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    if !resp.quality.damage_range().contains(&resp.damage) || !resp.quality.xp_range().contains(&resp.xp) {
        return Err(LlmError::InvalidResponse(format!(
            "damage {} / xp {} out of range for {}",
            resp.damage, resp.xp, resp.quality.as_str()
        )));
    }
    if !completed && resp.quality != Quality::Failed {
        return Err(LlmError::InvalidResponse("incomplete quest graded above failed".to_string()));
    }

    Ok(CachedScore { quality: resp.quality, damage: resp.damage, xp: resp.xp })
}

#[derive(Constructor)]
pub struct CoreScoringService {
    client: Arc<dyn LlmClient>,
    cache: Arc<dyn ScoreCache>,
    res: Arc<Resources>,
    settings: ScoringSettings,
}

#[async_trait]
impl ScoringService for CoreScoringService {
    async fn evaluate(&self, quest: &Quest, submission: &Submission, ctx: &CombatantContext) -> Outcome {
        let key = cache_key(quest, submission);

        let cached = match self.cache.get(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Score cache read failed for `{key}`: {:?}", e);
                None
            }
        };

        let score = match cached {
            Some(score) => {
                debug!("Score cache hit for `{key}`");
                score
            }
            None => match self.request_score(quest, submission, ctx).await {
                Ok(score) => {
                    if let Err(e) = self.cache.put(&key, &score).await {
                        warn!("Score cache write failed for `{key}`: {:?}", e);
                    }
                    score
                }
                Err(e) => {
                    warn!("Scorer unavailable for submission {}: {e}. Using fallback", submission.id);
                    return fallback_outcome(quest, submission, &self.res.difficulty_table);
                }
            },
        };

        self.outcome_from_score(quest, score, ctx)
    }
}

impl CoreScoringService {
    async fn request_score(&self, quest: &Quest, submission: &Submission, ctx: &CombatantContext) -> Result<CachedScore, LlmError> {
        let description = json!({
            "quest": {
                "title": quest.title,
                "type": quest.quest_type,
                "recurrence": quest.recurrence.as_str(),
                "difficulty": quest.difficulty.as_str(),
                "target": quest.target_value,
                "base_damage": quest.base_damage,
                "base_xp": quest.base_xp,
                "tags": quest.tags,
            },
            "submission": {
                "completed": submission.completed,
                "value": submission.value,
            },
            "combatant": {
                "streak": ctx.streak,
                "hp": ctx.hp,
                "max_hp": ctx.max_hp,
                "active_effects": ctx.effects.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            }
        });

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(description.to_string())];
        let raw = self.client.complete(messages).await?;
        parse_score_response(&raw, submission.completed)
    }

    fn outcome_from_score(&self, quest: &Quest, score: CachedScore, ctx: &CombatantContext) -> Outcome {
        let is_critical = score.quality == Quality::Excellent && {
            let chance = self.settings.crit_chance + crit_bonus_pct(&ctx.effects) as f64 / 100.0;
            thread_rng().gen_bool(chance.clamp(0.0, 1.0))
        };

        let effects = match score.quality {
            Quality::Failed => failure_effects(&quest.categories()),
            Quality::Excellent => excellence_effects(&quest.categories()),
            _ => vec![],
        };

        Outcome {
            quality: score.quality,
            damage: if is_critical { score.damage * 2 } else { score.damage },
            xp: score.xp,
            is_critical,
            effects,
            multiplier: 1.0,
            used_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::ai::mock::MockLlmClient;
    use crate::models::quest_models::{Difficulty, Recurrence};
    use crate::resources::game_resources::DifficultyTable;
    use crate::services::scoring_service::cache::MemoryScoreCache;

    fn quest(quest_type: &str, difficulty: Difficulty) -> Quest {
        Quest {
            id: 1, user_id: 1, title: "Quest".to_string(), quest_type: quest_type.to_string(),
            recurrence: Recurrence::Daily, difficulty, target_value: Some(30.0),
            base_damage: 10, base_xp: 10, tags: vec![],
        }
    }

    fn submission(id: i64, completed: bool, value: Option<f64>) -> Submission {
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        Submission {
            id, instance_id: 1, user_id: 1, quest_id: 1, date, period_start: date,
            seq: id, completed, value, settled_at: None,
        }
    }

    fn ctx() -> CombatantContext {
        CombatantContext { streak: 0, hp: 100, max_hp: 100, effects: vec![] }
    }

    fn service(client: Arc<MockLlmClient>, crit_chance: f64) -> CoreScoringService {
        let res = Arc::new(Resources { bosses: vec![], difficulty_table: DifficultyTable::default() });
        CoreScoringService::new(client, Arc::new(MemoryScoreCache::default()), res, ScoringSettings { crit_chance })
    }

    #[test]
    fn parses_valid_response() {
        let score = parse_score_response(r#"{"quality":"good","damage":15,"xp":20,"reasoning":"solid"}"#, true).unwrap();
        assert_eq!(score, CachedScore { quality: Quality::Good, damage: 15, xp: 20 });
    }

    #[test]
    fn rejects_out_of_range_and_unknown_tiers() {
        assert!(parse_score_response(r#"{"quality":"poor","damage":25,"xp":2}"#, true).is_err());
        assert!(parse_score_response(r#"{"quality":"legendary","damage":25,"xp":2}"#, true).is_err());
        assert!(parse_score_response(r#"{"quality":"good"}"#, true).is_err());
        assert!(parse_score_response("the quest was great", true).is_err());
    }

    #[test]
    fn rejects_graded_incomplete_quest() {
        assert!(parse_score_response(r#"{"quality":"good","damage":15,"xp":20}"#, false).is_err());
        assert!(parse_score_response(r#"{"quality":"failed","damage":0,"xp":0}"#, false).is_ok());
    }

    #[tokio::test]
    async fn equivalent_submissions_share_a_cached_verdict() {
        let client = Arc::new(MockLlmClient::new(vec![
            Ok(r#"{"quality":"average","damage":9,"xp":10}"#.to_string()),
            Ok(r#"{"quality":"good","damage":18,"xp":20}"#.to_string()),
        ]));
        let svc = service(client.clone(), 0.0);
        let q = quest("fitness", Difficulty::Medium);

        let first = svc.evaluate(&q, &submission(1, true, Some(20.0)), &ctx()).await;
        let second = svc.evaluate(&q, &submission(2, true, Some(20.0)), &ctx()).await;

        assert_eq!(client.call_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first.damage, 9);
        assert!(!first.used_fallback);
    }

    #[tokio::test]
    async fn scorer_sees_the_quest_base_values() {
        let client = Arc::new(MockLlmClient::new(vec![Ok(r#"{"quality":"average","damage":9,"xp":10}"#.to_string())]));
        let svc = service(client.clone(), 0.0);
        let q = Quest { base_damage: 25, base_xp: 35, ..quest("reading", Difficulty::Heavy) };

        svc.evaluate(&q, &submission(1, true, Some(30.0)), &ctx()).await;

        let calls = client.calls.lock().unwrap();
        let sent: Value = serde_json::from_str(&calls[0][1].content).unwrap();
        assert_eq!(sent["quest"]["base_damage"], 25);
        assert_eq!(sent["quest"]["base_xp"], 35);
    }

    #[tokio::test]
    async fn scorer_error_falls_back() {
        let client = Arc::new(MockLlmClient::new(vec![Err(LlmError::Network("down".to_string()))]));
        let svc = service(client, 0.0);
        let out = svc.evaluate(&quest("reading", Difficulty::Heavy), &submission(1, true, None), &ctx()).await;
        assert!(out.used_fallback);
        assert_eq!(out.quality, Quality::Average);
        assert_eq!(out.damage, DifficultyTable::default().heavy.damage);
    }

    #[tokio::test]
    async fn malformed_response_falls_back_and_is_not_cached() {
        let client = Arc::new(MockLlmClient::new(vec![
            Ok("not json".to_string()),
            Ok(r#"{"quality":"good","damage":14,"xp":16}"#.to_string()),
        ]));
        let svc = service(client.clone(), 0.0);
        let q = quest("reading", Difficulty::Light);

        let first = svc.evaluate(&q, &submission(1, true, None), &ctx()).await;
        assert!(first.used_fallback);
        let second = svc.evaluate(&q, &submission(2, true, None), &ctx()).await;
        assert!(!second.used_fallback);
        assert_eq!(second.damage, 14);
    }

    #[tokio::test]
    async fn excellent_critical_doubles_damage_and_grants_buffs() {
        let client = Arc::new(MockLlmClient::new(vec![Ok(r#"{"quality":"excellent","damage":25,"xp":30}"#.to_string())]));
        let svc = service(client, 1.0);
        let out = svc.evaluate(&quest("fitness", Difficulty::Heavy), &submission(1, true, Some(60.0)), &ctx()).await;
        assert!(out.is_critical);
        assert_eq!(out.damage, 50);
        assert_eq!(out.xp, 30);
        assert_eq!(out.effects[0].name, "Adrenaline");
    }

    #[tokio::test]
    async fn no_critical_below_top_tier() {
        let client = Arc::new(MockLlmClient::new(vec![Ok(r#"{"quality":"good","damage":15,"xp":20}"#.to_string())]));
        let svc = service(client, 1.0);
        let out = svc.evaluate(&quest("fitness", Difficulty::Heavy), &submission(1, true, Some(60.0)), &ctx()).await;
        assert!(!out.is_critical);
        assert_eq!(out.damage, 15);
    }
}
