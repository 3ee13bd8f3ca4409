use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::Deserialize;

const HOUR_SECS: i32 = 3600;

#[derive(Clone, Debug, Deserialize)]
pub struct SettlementSettings {
    ///
    /// Cron expression (with seconds, in UTC) of the daily settlement job
    ///
    pub cron: String,
    ///
    /// Offset from UTC of the game day, eg. -9 for UTC-9
    ///
    pub utc_offset_hours: i32,
    ///
    /// A run-lock older than this is considered abandoned and may be taken over
    ///
    pub lock_stale_after_s: i64,
    pub max_hp: i64,
}

impl SettlementSettings {
    pub fn game_tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * HOUR_SECS).unwrap_or_else(|| Utc.fix())
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::seconds(self.lock_stale_after_s)
    }
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self { cron: "0 5 0 * * *".to_string(), utc_offset_hours: 0, lock_stale_after_s: 1800, max_hp: 100 }
    }
}
