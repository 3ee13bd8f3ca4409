use std::{error::Error, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use lazy_static::lazy_static;
use log::{error, info};

use quest_duel::{
    ai::LlmSettings,
    background_svcs::settlement_background_svc::create_settlement_job,
    bootstrap::{self, load_settings, require_env, Services},
    middleware::auth_middleware::AuthState,
    resources::game_resources::ResourceLoader,
    routes::{boss_routes, combat_routes, settlement_routes, submission_routes},
    services::{
        scoring_service::settings::ScoringSettings,
        settlement_service::settings::SettlementSettings,
        token_service::{settings::TokenSettings, CoreTokenService},
    },
};
use tokio_cron_scheduler::JobScheduler;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

lazy_static! {
    static ref DOTENV_LOADED: bool = dotenv().is_ok();
}

#[tokio::main]
async fn main() {
    // Setup tracing_subscriber
    tracing_subscriber::fmt().with_target(false).compact().init();

    if let Err(e) = run().await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    if !*DOTENV_LOADED {
        info!("No .env file found. Reading configuration from the environment");
    }

    // Setup state
    let db = bootstrap::connect(&require_env("DATABASE_URL")?).await?;
    let token_settings: TokenSettings = load_settings("./token_settings.json")?;
    let llm_settings: LlmSettings = load_settings("./llm_settings.json")?;
    let scoring_settings: ScoringSettings = load_settings("./scoring_settings.json")?;
    let settlement_settings: SettlementSettings = load_settings("./settlement_settings.json")?;
    let res = Arc::new(ResourceLoader::load("./res")?);

    let token_service = Arc::new(CoreTokenService::new(require_env("JWT_SECRET")?, token_settings));
    let admin_secret: Arc<str> = std::env::var("ADMIN_SECRET").unwrap_or_default().into();
    let auth = AuthState::new(token_service, admin_secret);

    let llm = bootstrap::llm_client(std::env::var("LLM_API_KEY").ok(), llm_settings);
    let game_tz = settlement_settings.game_tz();

    // Settlement background job
    let sched = JobScheduler::new().await?;
    let services = Services::build(db, res, llm, scoring_settings, settlement_settings.clone());
    sched.add(create_settlement_job(services.settlement_service.clone(), &settlement_settings)?).await?;
    sched.start().await?;

    let app = Router::new()
        // Routes
        .nest("/api/v1", submission_routes::routes(services.submission_service, auth.clone()))
        .nest(
            "/api/v1/combat",
            combat_routes::routes(services.settlement_service.clone(), services.tournament_service, auth.clone()),
        )
        .nest("/api/v1/boss", boss_routes::routes(services.boss_service, game_tz, auth.clone()))
        .nest("/api/v1/settlement", settlement_routes::routes(services.settlement_service, auth))
        // Logging
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO))
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], 3005));
    info!("Listening on {addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service()).await?;
    Ok(())
}
