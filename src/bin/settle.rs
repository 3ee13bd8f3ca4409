//!
//! Runs one settlement pass and prints its report
//!

use std::{error::Error, path::PathBuf, process::ExitCode, sync::Arc};

use chrono::NaiveDate;
use clap::Parser;
use log::error;

use quest_duel::{
    ai::LlmSettings,
    bootstrap::{self, load_settings, Services},
    resources::game_resources::ResourceLoader,
    services::{
        scoring_service::settings::ScoringSettings,
        settlement_service::{models::SettlementReport, settings::SettlementSettings, SettlementService},
    },
};

#[derive(Parser, Debug)]
#[command(about = "Settle a day of quest duels")]
struct Args {
    /// Day to settle (YYYY-MM-DD). Defaults to yesterday in the game timezone
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Folder holding the settings files and `res/`
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).compact().init();

    let args = Args::parse();
    match settle(args).await {
        Ok(report) if report.has_failures() => {
            error!("{} instance(s) failed to settle; their submissions stay pending", report.instances_failed);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Settlement failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn settle(args: Args) -> Result<SettlementReport, Box<dyn Error + Send + Sync>> {
    let dir = args.config_dir;
    let llm_settings: LlmSettings = load_settings(dir.join("llm_settings.json"))?;
    let scoring_settings: ScoringSettings = load_settings(dir.join("scoring_settings.json"))?;
    let settlement_settings: SettlementSettings = load_settings(dir.join("settlement_settings.json"))?;
    let res = Arc::new(ResourceLoader::load(&dir.join("res").to_string_lossy())?);

    let db = bootstrap::connect(&args.database_url).await?;
    let llm = bootstrap::llm_client(std::env::var("LLM_API_KEY").ok(), llm_settings);
    let services = Services::build(db, res, llm, scoring_settings, settlement_settings);

    let report = services.settlement_service.run(args.date).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
