use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::models::combat_models::{EffectTemplate, StatusEffect};

///
/// Categorical outcome of one submission, ordered worst to best
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Failed,
    Poor,
    Average,
    Good,
    Excellent,
}

impl Quality {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "failed" => Some(Quality::Failed),
            "poor" => Some(Quality::Poor),
            "average" => Some(Quality::Average),
            "good" => Some(Quality::Good),
            "excellent" => Some(Quality::Excellent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Failed => "failed",
            Quality::Poor => "poor",
            Quality::Average => "average",
            Quality::Good => "good",
            Quality::Excellent => "excellent",
        }
    }

    pub fn damage_range(&self) -> RangeInclusive<i64> {
        match self {
            Quality::Failed => 0..=0,
            Quality::Poor => 1..=5,
            Quality::Average => 6..=12,
            Quality::Good => 13..=20,
            Quality::Excellent => 21..=30,
        }
    }

    pub fn xp_range(&self) -> RangeInclusive<i64> {
        match self {
            Quality::Failed => 0..=0,
            Quality::Poor => 1..=5,
            Quality::Average => 5..=15,
            Quality::Good => 15..=25,
            Quality::Excellent => 25..=40,
        }
    }
}

///
/// The scorer's categorical verdict. This is what gets cached: equivalent
/// submissions always resolve to the same verdict.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedScore {
    pub quality: Quality,
    pub damage: i64,
    pub xp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub quality: Quality,
    ///
    /// Damage of this submission alone, doubled on a critical hit
    ///
    pub damage: i64,
    pub xp: i64,
    pub is_critical: bool,
    pub effects: Vec<EffectTemplate>,
    ///
    /// Scoring always yields 1.0; settlement records the day's combo multiplier here
    ///
    pub multiplier: f64,
    pub used_fallback: bool,
}

///
/// What the scorer knows about the submitter
///
#[derive(Debug, Clone, Serialize)]
pub struct CombatantContext {
    pub streak: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub effects: Vec<StatusEffect>,
}
