pub mod data_layer;
pub mod error;
pub mod models;

use std::sync::Arc;

use axum::async_trait;
use chrono::NaiveDate;
use derive_more::Constructor;
use log::info;
use rand::{seq::SliceRandom, thread_rng};

use crate::calendar::{last_day_of_month, month_start};
use crate::models::combat_models::CombatStatus;
use crate::resources::game_resources::Resources;

use self::data_layer::BossDataLayer;
use self::error::{BossServiceError, Result};
use self::models::{remaining_hp, BossStatus};

#[async_trait]
pub trait BossService: Send + Sync {
    ///
    /// Retrieves the shared boss of the month containing `date`, summoning
    /// it on first use. Its HP is recomputed from the month's damage on every
    /// call, so calling this repeatedly is safe. The first call that finds
    /// the boss at 0 HP defeats it and hands out the rewards.
    ///
    async fn status(&self, date: NaiveDate) -> Result<BossStatus>;
}

#[derive(Constructor)]
pub struct CoreBossService {
    data_layer: Arc<dyn BossDataLayer>,
    res: Arc<Resources>,
}

#[async_trait]
impl BossService for CoreBossService {
    async fn status(&self, date: NaiveDate) -> Result<BossStatus> {
        let (from, to) = (month_start(date), last_day_of_month(date));

        let boss = match self.data_layer.get_boss(from).await? {
            Some(boss) => boss,
            None => {
                let template = self.res.bosses.choose(&mut thread_rng()).cloned().ok_or(BossServiceError::NoBossTemplates)?;
                let boss = self.data_layer.create_boss(from, &template).await?;
                info!("{} appears for {}", boss.name, from.format("%Y-%m"));
                boss
            }
        };

        if CombatStatus::parse(&boss.status) == CombatStatus::Active {
            let damage = self.data_layer.damage_between(from, to).await?;
            let hp = remaining_hp(boss.max_hp, damage);

            if hp == 0 {
                if let Some(users) = self.data_layer.defeat_boss(boss.id, from, to).await? {
                    info!("{} was defeated. Rewarded users: {:?}", boss.name, users);
                }
            } else if hp != boss.hp {
                self.data_layer.update_hp(boss.id, hp).await?;
            }
        }

        let boss = self.data_layer.get_boss(from).await?.unwrap_or(boss);
        let rewarded = self.data_layer.get_rewarded_users(boss.id).await?;
        Ok(BossStatus::from_entity(boss, rewarded))
    }
}

///
/// Parses a `YYYY-MM` month into its first day
///
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| BossServiceError::InvalidMonth(month.to_string()))
}
