//! User registration. Creating a user also issues the access token the
//! client will use for every notes request.

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::context::RequestContext;
use crate::controllers::storage_failure_response;
use crate::db::StorageError;

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterUserResponse {
    pub success: bool,
    pub id: i64,
    pub token: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/users").route("", web::post().to(register_user)));
}

async fn register_user(
    state: web::Data<AppState>,
    ctx: RequestContext,
    body: web::Json<RegisterUserRequest>,
) -> impl Responder {
    let username = match body.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "username is a required field"}));
        }
    };

    let user_id = match state.db.save_user(&ctx, &username).await {
        Ok(id) => id,
        Err(StorageError::UserExists) => {
            log::info!("[USERS] {} username {username:?} already taken", ctx.request_id);
            return HttpResponse::Conflict()
                .json(serde_json::json!({"error": "user with this username already exists"}));
        }
        Err(err) => return storage_failure_response(&ctx, "USERS", &err),
    };

    let token = match state.tokens.issue(user_id, state.config.access_token_ttl) {
        Ok(token) => token,
        Err(err) => {
            log::error!("[USERS] {} failed to issue token: {err}", ctx.request_id);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "internal error"}));
        }
    };

    log::info!("[USERS] {} registered {username:?} as user {user_id}", ctx.request_id);

    HttpResponse::Created().json(RegisterUserResponse {
        success: true,
        id: user_id,
        token,
    })
}
