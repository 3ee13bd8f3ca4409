mod common;

use std::sync::Arc;

use axum::{
    http::{header, Request, StatusCode},
    Router,
};
use hyper::Body;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use quest_duel::{
    bootstrap::Services,
    middleware::auth_middleware::AuthState,
    routes::{combat_routes, settlement_routes, submission_routes},
    services::token_service::{settings::TokenSettings, CoreTokenService, TokenService},
};

const ADMIN_SECRET: &str = "let-me-settle";

fn app(services: Services, tokens: Arc<CoreTokenService>) -> Router {
    let auth = AuthState::new(tokens, ADMIN_SECRET.into());
    Router::new()
        .nest("/api/v1", submission_routes::routes(services.submission_service, auth.clone()))
        .nest(
            "/api/v1/combat",
            combat_routes::routes(services.settlement_service.clone(), services.tournament_service, auth.clone()),
        )
        .nest("/api/v1/settlement", settlement_routes::routes(services.settlement_service, auth))
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_settle_and_read_the_narrative() {
    let db = pool().await;
    let instance = create_instance(&db, ALICE, BOB).await;
    let quest = create_quest(&db, ALICE, "Read", "reading", "daily", "heavy").await;

    let tokens = Arc::new(CoreTokenService::new("jwt-secret".to_string(), TokenSettings { jwt_lifetime_s: 3600 }));
    let alice = tokens.generate_access_token(ALICE).unwrap();
    let app = app(services(&db), tokens);

    let submission = json!({
        "instanceId": instance,
        "date": "2024-05-15",
        "quests": [{ "questId": quest, "completed": true }]
    });

    let response = app.clone().oneshot(request("POST", "/api/v1/submissions", None, Some(submission.clone()))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(request("POST", "/api/v1/submissions", Some(&alice), Some(submission))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accepted"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["hp"], 100);

    // Players cannot trigger settlement
    let settle = json!({ "date": "2024-05-15" });
    let response = app.clone().oneshot(request("POST", "/api/v1/settlement", Some(&alice), Some(settle.clone()))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(request("POST", "/api/v1/settlement", Some(ADMIN_SECRET), Some(settle))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["submissionsSettled"], 1);
    assert_eq!(report["narrativesCreated"], 1);

    let uri = format!("/api/v1/combat/{instance}/narratives");
    let response = app.clone().oneshot(request("GET", &uri, Some(&alice), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let db = pool().await;
    let instance = create_instance(&db, ALICE, BOB).await;

    let tokens = Arc::new(CoreTokenService::new("jwt-secret".to_string(), TokenSettings { jwt_lifetime_s: 3600 }));
    let outsider = tokens.generate_access_token(42).unwrap();
    let app = app(services(&db), tokens);

    let uri = format!("/api/v1/combat/{instance}/narratives");
    let response = app.clone().oneshot(request("GET", &uri, Some(&outsider), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(request("GET", "/api/v1/combat/999/tournaments", Some(&outsider), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let future = json!({ "instanceId": instance, "date": "2999-01-01", "quests": [] });
    let response = app.clone().oneshot(request("POST", "/api/v1/submissions", Some(&outsider), Some(future))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.clone().oneshot(request("POST", "/api/v1/settlement/reset/999", Some(ADMIN_SECRET), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
