//! Bearer-token authorization for the per-user notes scope.
//!
//! Runs before any notes handler: parses the `{id}` path segment, checks the
//! `Authorization` header shape, verifies the token, and finally requires the
//! token's subject to match the path identity. Handlers downstream can rely
//! on `AuthenticatedUser` being present in request extensions.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorInternalServerError;
use actix_web::middleware::Next;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, web};
use std::future::{Ready, ready};

use crate::auth::token::TokenError;
use crate::context::RequestContext;
use crate::AppState;

/// The user id proven by the bearer token, inserted by [`authorize`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i64);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        // Only reachable through the authorize middleware; absence is a wiring bug.
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or_else(|| ErrorInternalServerError("authorization context missing")),
        )
    }
}

pub async fn authorize(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let path_user_id: i64 = match req.match_info().get("id").and_then(|id| id.parse().ok()) {
        Some(id) => id,
        None => {
            log::info!("[AUTH] {request_id} rejected: non-numeric user id in path");
            return Ok(reject(
                req,
                HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "user id must be a number"})),
            ));
        }
    };

    let header_value = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let parts: Vec<&str> = header_value.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        log::info!("[AUTH] {request_id} rejected: malformed Authorization header");
        return Ok(reject(
            req,
            HttpResponse::Unauthorized()
                .json(serde_json::json!({"error": "invalid Authorization header value format"})),
        ));
    }
    let token = parts[1];
    if token.is_empty() {
        log::info!("[AUTH] {request_id} rejected: empty bearer token");
        return Ok(reject(
            req,
            HttpResponse::Unauthorized()
                .json(serde_json::json!({"error": "bearer token is missing"})),
        ));
    }

    let state = match req.app_data::<web::Data<AppState>>() {
        Some(state) => state,
        None => return Err(ErrorInternalServerError("application state missing")),
    };

    let token_user_id = match state.tokens.verify(token) {
        Ok(user_id) => user_id,
        Err(TokenError::Expired) => {
            log::info!("[AUTH] {request_id} rejected: expired token");
            return Ok(reject(
                req,
                HttpResponse::Unauthorized()
                    .json(serde_json::json!({"error": "token is expired"})),
            ));
        }
        Err(err) => {
            log::info!("[AUTH] {request_id} rejected: {err}");
            return Ok(reject(
                req,
                HttpResponse::Unauthorized().json(serde_json::json!({"error": "invalid token"})),
            ));
        }
    };

    if token_user_id != path_user_id {
        log::info!(
            "[AUTH] {request_id} rejected: token subject {token_user_id} does not own path user {path_user_id}"
        );
        return Ok(reject(
            req,
            HttpResponse::Forbidden()
                .json(serde_json::json!({"error": "you have no access to this user's notes"})),
        ));
    }

    req.extensions_mut().insert(AuthenticatedUser(token_user_id));
    Ok(next.call(req).await?.map_into_boxed_body())
}

fn reject(req: ServiceRequest, response: HttpResponse) -> ServiceResponse<BoxBody> {
    req.into_response(response)
}
