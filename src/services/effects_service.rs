use chrono::NaiveDate;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::models::combat_models::{EffectKind, EffectTemplate, Polarity, StatusEffect};

///
/// Combo multiplier, held as a whole percentage so bonus math stays exact
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComboMultiplier(pub i64);

impl ComboMultiplier {
    pub const NONE: ComboMultiplier = ComboMultiplier(100);

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    ///
    /// `floor(base * (multiplier - 1))`
    ///
    pub fn bonus(&self, base: i64) -> i64 {
        (base * (self.0 - 100)).div_euclid(100)
    }
}

///
/// Multiplier earned by completing several quests on the same day.
/// Any active combo-blocking effect suppresses it.
///
pub fn combo_multiplier(completed_count: usize, effects: &[StatusEffect]) -> ComboMultiplier {
    if effects.iter().any(|e| e.kind == EffectKind::ComboBlock) {
        return ComboMultiplier::NONE;
    }
    match completed_count {
        0 | 1 => ComboMultiplier::NONE,
        2 => ComboMultiplier(120),
        _ => ComboMultiplier(150),
    }
}

///
/// Drops every effect whose expiry date is before `today`
///
pub fn prune_expired(effects: Vec<StatusEffect>, today: NaiveDate) -> Vec<StatusEffect> {
    effects.into_iter().filter(|e| !e.is_expired(today)).collect()
}

///
/// Applies an effect, replacing any existing effect of the same name
///
pub fn apply_effect(effects: &mut Vec<StatusEffect>, template: &EffectTemplate, today: NaiveDate) {
    effects.retain(|e| e.name != template.name);
    effects.push(template.instantiate(today));
}

///
/// Builds the new effect list of a combatant: applies every produced effect
/// in order, then drops anything expired
///
pub fn resolve_effects(current: Vec<StatusEffect>, produced: &[EffectTemplate], today: NaiveDate) -> Vec<StatusEffect> {
    let mut effects = current;
    for template in produced {
        apply_effect(&mut effects, template, today);
    }
    prune_expired(effects, today)
}

fn scale(value: i64, percent: i64) -> i64 {
    ((value * (100 + percent)).div_euclid(100)).max(0)
}

///
/// Damage after the attacker's own modifiers
///
pub fn outgoing_damage(damage: i64, attacker: &[StatusEffect]) -> i64 {
    let percent: i64 = attacker
        .iter()
        .map(|e| match e.kind {
            EffectKind::DamageDealt { percent } => percent,
            EffectKind::Empower { damage_pct, .. } => damage_pct,
            EffectKind::ComboBlock | EffectKind::DamageTaken { .. } => 0,
        })
        .sum();
    scale(damage, percent)
}

///
/// Damage after the defender's modifiers
///
pub fn incoming_damage(damage: i64, defender: &[StatusEffect]) -> i64 {
    let percent: i64 = defender
        .iter()
        .map(|e| match e.kind {
            EffectKind::DamageTaken { percent } => percent,
            _ => 0,
        })
        .sum();
    scale(damage, percent)
}

pub fn boosted_xp(xp: i64, effects: &[StatusEffect]) -> i64 {
    let percent: i64 = effects
        .iter()
        .map(|e| match e.kind {
            EffectKind::Empower { xp_pct, .. } => xp_pct,
            _ => 0,
        })
        .sum();
    scale(xp, percent)
}

///
/// Extra critical chance (in percent) granted by active effects
///
pub fn crit_bonus_pct(effects: &[StatusEffect]) -> i64 {
    effects
        .iter()
        .map(|e| match e.kind {
            EffectKind::Empower { crit_pct, .. } => crit_pct,
            _ => 0,
        })
        .sum()
}

struct KeywordEffect {
    keywords: &'static [&'static str],
    effect: EffectTemplate,
}

lazy_static! {
    static ref FAILURE_EFFECTS: Vec<KeywordEffect> = vec![
        KeywordEffect {
            keywords: &["fitness", "exercise", "workout", "training"],
            effect: EffectTemplate::new("Fatigued".to_string(), Polarity::Debuff, EffectKind::ComboBlock, 1),
        },
        KeywordEffect {
            keywords: &["sleep", "rest"],
            effect: EffectTemplate::new("Drowsy".to_string(), Polarity::Debuff, EffectKind::DamageDealt { percent: -25 }, 1),
        },
        KeywordEffect {
            keywords: &["nutrition", "diet", "food", "hydration"],
            effect: EffectTemplate::new("Malnourished".to_string(), Polarity::Debuff, EffectKind::DamageTaken { percent: 25 }, 1),
        },
    ];

    static ref EXCELLENCE_EFFECTS: Vec<KeywordEffect> = vec![
        KeywordEffect {
            keywords: &["defense", "health", "recovery"],
            effect: EffectTemplate::new("Iron Guard".to_string(), Polarity::Buff, EffectKind::DamageTaken { percent: -25 }, 1),
        },
        KeywordEffect {
            keywords: &["mindfulness", "meditation", "focus"],
            effect: EffectTemplate::new(
                "Clarity".to_string(), Polarity::Buff,
                EffectKind::Empower { damage_pct: 10, xp_pct: 20, crit_pct: 0 }, 1
            ),
        },
        KeywordEffect {
            keywords: &["fitness", "exercise", "workout", "training"],
            effect: EffectTemplate::new(
                "Adrenaline".to_string(), Polarity::Buff,
                EffectKind::Empower { damage_pct: 20, xp_pct: 0, crit_pct: 10 }, 1
            ),
        },
    ];
}

fn matching(table: &[KeywordEffect], categories: &[String]) -> Vec<EffectTemplate> {
    table
        .iter()
        .filter(|entry| {
            categories.iter().any(|cat| entry.keywords.iter().any(|kw| cat.contains(kw)))
        })
        .map(|entry| entry.effect.clone())
        .collect()
}

///
/// Debuffs earned by failing a quest with the given categories
///
pub fn failure_effects(categories: &[String]) -> Vec<EffectTemplate> {
    matching(&FAILURE_EFFECTS, categories)
}

///
/// Buffs earned by an excellent-tier outcome on a quest with the given categories
///
pub fn excellence_effects(categories: &[String]) -> Vec<EffectTemplate> {
    matching(&EXCELLENCE_EFFECTS, categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn effect(name: &str, kind: EffectKind, expires_on: NaiveDate) -> StatusEffect {
        StatusEffect { name: name.to_string(), polarity: Polarity::Debuff, kind, expires_on }
    }

    #[test]
    fn combo_multiplier_by_count() {
        assert_eq!(combo_multiplier(0, &[]), ComboMultiplier(100));
        assert_eq!(combo_multiplier(1, &[]), ComboMultiplier(100));
        assert_eq!(combo_multiplier(2, &[]), ComboMultiplier(120));
        assert_eq!(combo_multiplier(3, &[]), ComboMultiplier(150));
        assert_eq!(combo_multiplier(7, &[]), ComboMultiplier(150));
    }

    #[test]
    fn combo_block_forces_no_multiplier() {
        let blocked = [effect("Fatigued", EffectKind::ComboBlock, d(20))];
        assert_eq!(combo_multiplier(3, &blocked), ComboMultiplier::NONE);
        assert_eq!(combo_multiplier(2, &blocked), ComboMultiplier::NONE);
    }

    #[test]
    fn combo_bonus_is_floored() {
        assert_eq!(ComboMultiplier(150).bonus(30), 15);
        assert_eq!(ComboMultiplier(120).bonus(30), 6);
        assert_eq!(ComboMultiplier(120).bonus(17), 3);
        assert_eq!(ComboMultiplier::NONE.bonus(17), 0);
    }

    #[test]
    fn applying_effect_replaces_same_name() {
        let mut effects = vec![effect("Drowsy", EffectKind::DamageDealt { percent: -25 }, d(10))];
        let template = EffectTemplate::new("Drowsy".to_string(), Polarity::Debuff, EffectKind::DamageDealt { percent: -25 }, 1);
        apply_effect(&mut effects, &template, d(15));
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].expires_on, d(16));
    }

    #[test]
    fn expired_effects_are_dropped() {
        let effects = vec![
            effect("Old", EffectKind::ComboBlock, d(14)),
            effect("Today", EffectKind::ComboBlock, d(15)),
        ];
        let kept = resolve_effects(effects, &[], d(15));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Today");
    }

    #[test]
    fn failure_effects_follow_category_keywords() {
        let fx = failure_effects(&["fitness".to_string()]);
        assert_eq!(fx.len(), 1);
        assert_eq!(fx[0].kind, EffectKind::ComboBlock);

        let fx = failure_effects(&["sleep hygiene".to_string()]);
        assert_eq!(fx[0].kind, EffectKind::DamageDealt { percent: -25 });

        let fx = failure_effects(&["nutrition".to_string()]);
        assert_eq!(fx[0].kind, EffectKind::DamageTaken { percent: 25 });

        assert!(failure_effects(&["reading".to_string()]).is_empty());
    }

    #[test]
    fn excellence_effects_follow_category_keywords() {
        assert_eq!(excellence_effects(&["defense".to_string()])[0].name, "Iron Guard");
        assert_eq!(excellence_effects(&["mindfulness".to_string()])[0].name, "Clarity");
        assert_eq!(excellence_effects(&["fitness".to_string()])[0].name, "Adrenaline");
    }

    #[test]
    fn damage_modifiers() {
        let drowsy = [effect("Drowsy", EffectKind::DamageDealt { percent: -25 }, d(20))];
        assert_eq!(outgoing_damage(40, &drowsy), 30);
        let exposed = [effect("Malnourished", EffectKind::DamageTaken { percent: 25 }, d(20))];
        assert_eq!(incoming_damage(40, &exposed), 50);
        assert_eq!(incoming_damage(40, &[]), 40);
        let guard = [effect("Iron Guard", EffectKind::DamageTaken { percent: -150 }, d(20))];
        assert_eq!(incoming_damage(40, &guard), 0);
    }
}
