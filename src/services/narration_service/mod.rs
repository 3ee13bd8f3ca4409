pub mod models;

use std::sync::Arc;

use axum::async_trait;
use derive_more::Constructor;

use crate::ai::{LlmClient, LlmError, Message};

use self::models::{DaySummary, NarrativeInput, RewardPair, WeeklySummary};

///
/// Turns structured battle summaries into text
///
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn summarize(&self, input: &NarrativeInput) -> Result<String, LlmError>;
}

const DAILY_PROMPT: &str = "You narrate a friendly duel between two people who fight by completing real-life \
quests. Given the JSON summary of the day, write a short (3-5 sentence) fantasy battle report. Mention \
critical hits, who dealt more damage, and anyone who did not show up. Plain text only.";

const WEEKLY_PROMPT: &str = "Two friends finished a week-long quest duel. Given the JSON summary, invent a small, \
playful real-life reward for the winner and a harmless penalty for the loser. Respond with JSON only: \
{\"reward\": \"...\", \"penalty\": \"...\"}";

#[derive(Constructor)]
pub struct LlmNarrator {
    client: Arc<dyn LlmClient>,
}

#[async_trait]
impl Narrator for LlmNarrator {
    async fn summarize(&self, input: &NarrativeInput) -> Result<String, LlmError> {
        let prompt = match input {
            NarrativeInput::DailyBattle(_) => DAILY_PROMPT,
            NarrativeInput::WeeklyRewards(_) => WEEKLY_PROMPT,
        };
        let payload = serde_json::to_string(input).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = self.client.complete(vec![Message::system(prompt), Message::user(payload)]).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse("empty narrative".to_string()));
        }
        Ok(text.to_string())
    }
}

///
/// Deterministic narrator. Used directly in tests and as the fallback
/// whenever the language model cannot answer.
///
#[derive(Default, Clone, Copy)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(&self, input: &NarrativeInput) -> String {
        match input {
            NarrativeInput::DailyBattle(day) => render_day(day),
            NarrativeInput::WeeklyRewards(week) => render_week(week),
        }
    }
}

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn summarize(&self, input: &NarrativeInput) -> Result<String, LlmError> {
        Ok(self.render(input))
    }
}

fn render_day(day: &DaySummary) -> String {
    let mut lines = vec![format!("Battle report for {}.", day.date)];

    for p in &day.players {
        if !p.submitted {
            lines.push(format!("Player {} never showed up to the battlefield.", p.user_id));
            continue;
        }
        let mut line = format!(
            "Player {} dealt {} damage and gained {} XP (HP {} -> {}).",
            p.user_id, p.damage_dealt, p.xp_gained, p.before.hp, p.after.hp
        );
        if p.critical_hits > 0 {
            line.push_str(&format!(" {} critical hit(s) landed!", p.critical_hits));
        }
        if p.multiplier > 1.0 {
            line.push_str(&format!(" A x{:.1} combo fueled the assault.", p.multiplier));
        }
        lines.push(line);
    }

    lines.push(match day.winner_id {
        Some(id) => format!("Player {id} won the day."),
        None => "Neither side gained the upper hand.".to_string(),
    });

    lines.join(" ")
}

fn render_week(_week: &WeeklySummary) -> String {
    let pair = RewardPair::default();
    serde_json::json!({ "reward": pair.reward, "penalty": pair.penalty }).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::ai::mock::MockLlmClient;
    use crate::services::narration_service::models::{CombatantSnapshot, PlayerDay};

    fn snapshot(user_id: i64, hp: i64) -> CombatantSnapshot {
        CombatantSnapshot { user_id, hp, max_hp: 100, xp: 0, level: 1, streak: 0 }
    }

    fn day() -> DaySummary {
        DaySummary {
            instance_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
            players: vec![
                PlayerDay {
                    user_id: 1, submitted: true, damage_dealt: 20, xp_gained: 25, critical_hits: 1,
                    multiplier: 1.2, before: snapshot(1, 100), after: snapshot(1, 100),
                },
                PlayerDay {
                    user_id: 2, submitted: false, damage_dealt: 0, xp_gained: 0, critical_hits: 0,
                    multiplier: 1.0, before: snapshot(2, 100), after: snapshot(2, 80),
                },
            ],
            quests: vec![],
            both_submitted: false,
            winner_id: Some(1),
        }
    }

    #[test]
    fn template_mentions_absence_and_winner() {
        let text = TemplateNarrator.render(&NarrativeInput::DailyBattle(day()));
        assert!(text.contains("Player 2 never showed up"));
        assert!(text.contains("Player 1 won the day"));
        assert!(text.contains("critical"));
    }

    #[test]
    fn template_weekly_rewards_parse_as_pair() {
        let week = WeeklySummary {
            instance_id: 1, week_start: NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            winner_id: Some(1), loser_id: Some(2), winner_hp: 80, loser_hp: 60,
        };
        let text = TemplateNarrator.render(&NarrativeInput::WeeklyRewards(week));
        let pair: RewardPair = serde_json::from_str(&text).unwrap();
        assert_eq!(pair, RewardPair::default());
    }

    #[tokio::test]
    async fn llm_narrator_rejects_empty_text() {
        let client = Arc::new(MockLlmClient::new(vec![Ok("   ".to_string())]));
        let narrator = LlmNarrator::new(client);
        assert!(narrator.summarize(&NarrativeInput::DailyBattle(day())).await.is_err());
    }

    #[tokio::test]
    async fn llm_narrator_returns_trimmed_text() {
        let client = Arc::new(MockLlmClient::new(vec![Ok("  The knights clashed.  ".to_string())]));
        let narrator = LlmNarrator::new(client.clone());
        let text = narrator.summarize(&NarrativeInput::DailyBattle(day())).await.unwrap();
        assert_eq!(text, "The knights clashed.");
        assert_eq!(client.call_count(), 1);
    }
}
