use std::sync::Arc;

use axum::{async_trait, extract::{FromRequestParts, State}, http::{request::Parts, StatusCode, Request}, TypedHeader, headers::{Authorization, authorization::Bearer}, middleware::Next, response::Response};
use derive_more::Constructor;
use log::debug;

use crate::services::token_service::TokenService;

#[derive(Clone)]
pub struct AuthContext { pub user_id: i64 }

#[derive(Clone)]
pub struct AdminContext;

///
/// What the auth middleware needs to recognize callers
///
#[derive(Clone, Constructor)]
pub struct AuthState {
    token_service: Arc<dyn TokenService>,
    admin_secret: Arc<str>,
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        return if let Some(info) = parts.extensions.get::<AuthContext>() {
            Ok(info.clone())
        } else {
            Err((StatusCode::UNAUTHORIZED, "Unauthorized. Please sign in".to_string()))
        };
    }
}

#[async_trait]
impl <S : Send + Sync> FromRequestParts<S> for AdminContext {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        return if let Some(info) = parts.extensions.get::<AdminContext>() {
            Ok(info.clone())
        } else {
            Err((StatusCode::UNAUTHORIZED, "Unauthorized. Admin only".to_string()))
        }
    }
}

///
/// Inserts `AdminContext` for the operator secret, or `AuthContext` for a
/// valid access token. Requests without either pass through unmarked and are
/// rejected by the extractors of the routes that need them.
///
pub async fn auth_middleware<B : Send> (
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    State(auth): State<AuthState>,
    mut request: Request<B>,
    next: Next<B>
) -> Response {
    if let Some(bearer) = bearer {
        let access_token = bearer.token();

        if !auth.admin_secret.is_empty() && access_token == &*auth.admin_secret {
            request.extensions_mut().insert(AdminContext);
        } else {
            match auth.token_service.verify_access_token(access_token) {
                Ok(user_id) => { request.extensions_mut().insert(AuthContext { user_id }); }
                Err(e) => debug!("Rejected access token: {e}"),
            }
        }
    }
    next.run(request).await
}
