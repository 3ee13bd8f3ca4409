use serde::Deserialize;

#[derive(Clone, Copy, Deserialize)]
pub struct ScoringSettings {
    ///
    /// Chance of a critical hit on an excellent-tier outcome (0.0 - 1.0)
    ///
    pub crit_chance: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self { crit_chance: 0.15 }
    }
}
