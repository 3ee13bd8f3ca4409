use chrono::{Duration, NaiveDate};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

pub const XP_PER_LEVEL: i64 = 100;

///
/// Level derived from total experience
///
pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Buff,
    Debuff,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Buff => "buff",
            Polarity::Debuff => "debuff",
        }
    }
}

///
/// What a status effect does while it is active. Percentages are
/// signed: negative values reduce, positive values amplify.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    ///
    /// Suppresses the combo multiplier entirely
    ///
    ComboBlock,
    ///
    /// Scales the damage the holder deals
    ///
    DamageDealt { percent: i64 },
    ///
    /// Scales the damage the holder takes
    ///
    DamageTaken { percent: i64 },
    ///
    /// Boosts damage, XP and critical chance of the holder
    ///
    Empower { damage_pct: i64, xp_pct: i64, crit_pct: i64 },
}

///
/// An effect produced by an outcome, not yet attached to a combatant
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct EffectTemplate {
    pub name: String,
    pub polarity: Polarity,
    pub kind: EffectKind,
    pub duration_days: i64,
}

impl EffectTemplate {
    pub fn instantiate(&self, today: NaiveDate) -> StatusEffect {
        StatusEffect {
            name: self.name.clone(),
            polarity: self.polarity,
            kind: self.kind,
            expires_on: today + Duration::days(self.duration_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    pub polarity: Polarity,
    pub kind: EffectKind,
    pub expires_on: NaiveDate,
}

impl StatusEffect {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on < today
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatantState {
    pub instance_id: i64,
    pub user_id: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
    pub effects: Vec<StatusEffect>,
    pub total_damage_dealt: i64,
    pub last_action_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatStatus {
    Active,
    Completed,
}

impl CombatStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => CombatStatus::Completed,
            _ => CombatStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatInstance {
    pub id: i64,
    pub user_a: i64,
    pub user_b: i64,
    pub status: CombatStatus,
    pub last_settled_on: Option<NaiveDate>,
}

impl CombatInstance {
    pub fn participants(&self) -> [i64; 2] {
        [self.user_a, self.user_b]
    }

    pub fn is_participant(&self, user_id: i64) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    pub fn opponent_of(&self, user_id: i64) -> Option<i64> {
        if user_id == self.user_a {
            Some(self.user_b)
        } else if user_id == self.user_b {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_derived_from_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(250), 3);
    }

    #[test]
    fn effect_kind_serializes_as_tagged_variant() {
        let kind = EffectKind::DamageTaken { percent: 25 };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"kind":"damage_taken","percent":25}"#);
        assert_eq!(serde_json::from_str::<EffectKind>(&json).unwrap(), kind);
    }

    #[test]
    fn opponent_lookup() {
        let inst = CombatInstance { id: 1, user_a: 3, user_b: 7, status: CombatStatus::Active, last_settled_on: None };
        assert_eq!(inst.opponent_of(3), Some(7));
        assert_eq!(inst.opponent_of(7), Some(3));
        assert_eq!(inst.opponent_of(1), None);
    }
}
