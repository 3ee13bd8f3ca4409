pub mod ai;
pub mod bootstrap;
pub mod calendar;
pub mod data_layer_error;
pub mod entities;

pub mod background_svcs {
    pub mod settlement_background_svc;
}

pub mod middleware {
    pub mod auth_middleware;
}

pub mod models {
    pub mod combat_models;
    pub mod quest_models;
}

pub mod resources {
    pub mod game_resources;
}

pub mod routes {
    pub mod boss_routes;
    pub mod combat_routes;
    pub mod settlement_routes;
    pub mod submission_routes;
}

pub mod services {
    pub mod availability;
    pub mod boss_service;
    pub mod effects_service;
    pub mod narration_service;
    pub mod scoring_service;
    pub mod settlement_service;
    pub mod submission_service;
    pub mod token_service;
    pub mod tournament_service;
}
