//!
//! Wiring shared by the server and the `settle` binary
//!

use std::{fs, path::Path, sync::Arc};

use log::warn;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::ai::{DisabledLlmClient, HttpLlmClient, LlmClient, LlmSettings};
use crate::resources::game_resources::{ResourceError, Resources};
use crate::services::{
    boss_service::{data_layer::DbBossDataLayer, BossService, CoreBossService},
    narration_service::{LlmNarrator, Narrator},
    scoring_service::{
        cache::{DbScoreCache, TieredScoreCache},
        settings::ScoringSettings,
        CoreScoringService, ScoringService,
    },
    settlement_service::{data_layer::DbSettlementDataLayer, settings::SettlementSettings, CoreSettlementService, SettlementService},
    submission_service::{data_layer::DbSubmissionDataLayer, CoreSubmissionService, SubmissionService},
    tournament_service::{data_layer::DbTournamentDataLayer, CoreTournamentService, TournamentService},
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("Could not read settings file {0}: {1}")]
    SettingsIo(String, std::io::Error),
    #[error("Could not parse settings file {0}: {1}")]
    SettingsParse(String, serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Resources(#[from] ResourceError),
}

pub fn require_env(name: &'static str) -> Result<String, BootstrapError> {
    std::env::var(name).map_err(|_| BootstrapError::MissingEnv(name))
}

pub fn load_settings<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, BootstrapError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|e| BootstrapError::SettingsIo(name.clone(), e))?;
    serde_json::from_str(&contents).map_err(|e| BootstrapError::SettingsParse(name, e))
}

///
/// Opens the pool and brings the schema up to date
///
pub async fn connect(database_url: &str) -> Result<SqlitePool, BootstrapError> {
    let db = SqlitePool::connect(database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    Ok(db)
}

///
/// The configured language model client, or a disabled one when the model
/// is turned off or no API key is set
///
pub fn llm_client(api_key: Option<String>, settings: LlmSettings) -> Arc<dyn LlmClient> {
    match api_key.filter(|key| !key.is_empty()) {
        Some(key) if settings.enabled => Arc::new(HttpLlmClient::new(key, settings)),
        _ => {
            warn!("Language model disabled; scoring and narration use their fallbacks");
            Arc::new(DisabledLlmClient)
        }
    }
}

pub struct Services {
    pub submission_service: Arc<dyn SubmissionService>,
    pub settlement_service: Arc<dyn SettlementService>,
    pub tournament_service: Arc<dyn TournamentService>,
    pub boss_service: Arc<dyn BossService>,
}

impl Services {
    pub fn build(
        db: SqlitePool,
        res: Arc<Resources>,
        llm: Arc<dyn LlmClient>,
        scoring_settings: ScoringSettings,
        settlement_settings: SettlementSettings,
    ) -> Self {
        let max_hp = settlement_settings.max_hp;

        let submission_data_layer = Arc::new(DbSubmissionDataLayer::new(db.clone(), max_hp));
        let submission_service = Arc::new(CoreSubmissionService::new(submission_data_layer, settlement_settings.game_tz()));

        let cache = Arc::new(TieredScoreCache::new(Arc::new(DbScoreCache::new(db.clone()))));
        let scoring_service: Arc<dyn ScoringService> =
            Arc::new(CoreScoringService::new(llm.clone(), cache, res.clone(), scoring_settings));
        let narrator: Arc<dyn Narrator> = Arc::new(LlmNarrator::new(llm));

        let tournament_data_layer = Arc::new(DbTournamentDataLayer::new(db.clone(), max_hp));
        let tournament_service: Arc<dyn TournamentService> =
            Arc::new(CoreTournamentService::new(tournament_data_layer, narrator.clone()));

        let boss_service: Arc<dyn BossService> = Arc::new(CoreBossService::new(Arc::new(DbBossDataLayer::new(db.clone())), res));

        let settlement_data_layer = Arc::new(DbSettlementDataLayer::new(db, max_hp));
        let settlement_service = Arc::new(CoreSettlementService::new(
            settlement_data_layer,
            scoring_service,
            narrator,
            tournament_service.clone(),
            boss_service.clone(),
            settlement_settings,
        ));

        Self { submission_service, settlement_service, tournament_service, boss_service }
    }
}
