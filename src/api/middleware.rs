//! Middleware Components
//!
//! CORS, request tracking and caller identity.

use super::errors::ApiError;
use crate::common::types::PlayerIdentity;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::HeaderValue, request::Parts, HeaderName},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer, ExposeHeaders};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Set by the upstream identity provider
pub const PLAYER_ID_HEADER: &str = "x-player-id";
pub const PLAYER_NAME_HEADER: &str = "x-player-name";

/// CORS with configurable origins; empty or `*` allows everything
pub fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let expose = ExposeHeaders::list([HeaderName::from_static(REQUEST_ID_HEADER)]);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(expose)
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .into_iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers(Any)
            .expose_headers(expose)
    }
}

/// Attach a request id to every request and response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string())))
    }
}

/// Authenticated caller taken from identity headers
#[derive(Debug, Clone)]
pub struct Player(pub PlayerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for Player
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestId(request_id) = match RequestId::from_request_parts(parts, state).await {
            Ok(id) => id,
            Err(never) => match never {},
        };
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let id = header(PLAYER_ID_HEADER).ok_or_else(|| {
            ApiError::unauthorized(request_id, format!("missing {} header", PLAYER_ID_HEADER))
        })?;
        let display_name = header(PLAYER_NAME_HEADER).unwrap_or_else(|| id.clone());
        Ok(Player(PlayerIdentity::new(id, display_name)))
    }
}
