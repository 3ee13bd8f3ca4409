use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

///
/// How often a quest may be submitted. Each class has its own
/// availability window and exclusivity period.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
    Sidequest,
}

impl Recurrence {
    ///
    /// Parses the stored recurrence class. Unknown classes fall back to `Daily`.
    ///
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Recurrence::Weekly,
            "monthly" => Recurrence::Monthly,
            "sidequest" => Recurrence::Sidequest,
            _ => Recurrence::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Sidequest => "sidequest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Light,
    Medium,
    Heavy,
}

impl Difficulty {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => Difficulty::Light,
            "heavy" => Difficulty::Heavy,
            _ => Difficulty::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Light => "light",
            Difficulty::Medium => "medium",
            Difficulty::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Quest {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    ///
    /// Primary category of the quest (eg. "fitness", "mindfulness")
    ///
    pub quest_type: String,
    pub recurrence: Recurrence,
    pub difficulty: Difficulty,
    pub target_value: Option<f64>,
    pub base_damage: i64,
    pub base_xp: i64,
    pub tags: Vec<String>,
}

impl Quest {
    ///
    /// The quest type followed by its tags, lowercased. Used for
    /// keyword matching when assigning status effects.
    ///
    pub fn categories(&self) -> Vec<String> {
        std::iter::once(&self.quest_type)
            .chain(self.tags.iter())
            .map(|t| t.to_lowercase())
            .collect()
    }
}

///
/// A time-boxed event which opens a sidequest for submission
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideQuestEvent {
    pub id: i64,
    pub quest_id: i64,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl SideQuestEvent {
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.starts_on <= date && date <= self.expires_on
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    pub instance_id: i64,
    pub user_id: i64,
    pub quest_id: i64,
    pub date: NaiveDate,
    pub period_start: NaiveDate,
    pub seq: i64,
    pub completed: bool,
    pub value: Option<f64>,
    ///
    /// Unset while pending; set exactly once by settlement
    ///
    pub settled_at: Option<NaiveDateTime>,
}
