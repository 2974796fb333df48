//! Note CRUD under `/api/users/{id}/notes`. The whole scope sits behind the
//! authorization middleware, so every handler receives a proven
//! `AuthenticatedUser` that matches the path.

use actix_web::middleware::from_fn;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{AuthenticatedUser, guard};
use crate::context::RequestContext;
use crate::controllers::storage_failure_response;
use crate::db::StorageError;
use crate::models::SortDirection;

const DEFAULT_LIST_LIMIT: i64 = 10;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct NoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ListNotesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Serialize)]
pub struct NoteMutationResponse {
    pub success: bool,
    pub id: i64,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users/{id}/notes")
            .wrap(from_fn(guard::authorize))
            .route("", web::post().to(create_note))
            .route("", web::get().to(list_notes))
            .route("/{note_id}", web::get().to(get_note))
            .route("/{note_id}", web::put().to(update_note))
            .route("/{note_id}", web::delete().to(delete_note)),
    );
}

fn validated_title(body: &NoteRequest) -> Option<&str> {
    body.title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

fn title_required() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"error": "title is a required field"}))
}

async fn create_note(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    body: web::Json<NoteRequest>,
) -> impl Responder {
    let Some(title) = validated_title(&body) else {
        return title_required();
    };

    match state
        .db
        .save_note(&ctx, user.0, title, body.content.as_deref())
        .await
    {
        Ok(id) => {
            log::info!("[NOTES] {} user {} created note {id}", ctx.request_id, user.0);
            HttpResponse::Created().json(NoteMutationResponse { success: true, id })
        }
        Err(err) => storage_failure_response(&ctx, "NOTES", &err),
    }
}

async fn list_notes(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    query: web::Query<ListNotesQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit < 0 {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "limit must be a non-negative number"}));
    }
    let limit = limit.min(MAX_LIST_LIMIT);

    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "offset must be a non-negative number"}));
    }

    let sort = match query.sort.as_deref() {
        None => SortDirection::Ascending,
        Some(raw) => match raw.parse() {
            Ok(sort) => sort,
            Err(_) => {
                log::info!("[NOTES] {} rejected sort value {raw:?}", ctx.request_id);
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "sort must be either \"ascending\" or \"descending\""
                }));
            }
        },
    };

    match state.db.get_notes(&ctx, user.0, limit, offset, sort).await {
        Ok(notes) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "notes": notes,
        })),
        Err(StorageError::NoNotes) => {
            HttpResponse::NotFound().json(serde_json::json!({"error": "user has no notes"}))
        }
        Err(err) => storage_failure_response(&ctx, "NOTES", &err),
    }
}

async fn get_note(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let note_id = path.1;

    match state.db.get_note(&ctx, user.0, note_id).await {
        Ok(note) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "note": note,
        })),
        Err(StorageError::NoteNotFound) => {
            HttpResponse::NotFound().json(serde_json::json!({"error": "no note with this id"}))
        }
        Err(err) => storage_failure_response(&ctx, "NOTES", &err),
    }
}

async fn update_note(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    path: web::Path<(i64, i64)>,
    body: web::Json<NoteRequest>,
) -> impl Responder {
    let note_id = path.1;
    let Some(title) = validated_title(&body) else {
        return title_required();
    };

    match state
        .db
        .update_note(&ctx, user.0, note_id, title, body.content.as_deref())
        .await
    {
        Ok(id) => {
            log::info!("[NOTES] {} user {} updated note {id}", ctx.request_id, user.0);
            HttpResponse::Ok().json(NoteMutationResponse { success: true, id })
        }
        Err(StorageError::NoteNotFound) => {
            HttpResponse::NotFound().json(serde_json::json!({"error": "no note with this id"}))
        }
        Err(err) => storage_failure_response(&ctx, "NOTES", &err),
    }
}

async fn delete_note(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let note_id = path.1;

    match state.db.delete_note(&ctx, user.0, note_id).await {
        Ok(id) => {
            log::info!("[NOTES] {} user {} deleted note {id}", ctx.request_id, user.0);
            HttpResponse::Ok().json(NoteMutationResponse { success: true, id })
        }
        Err(StorageError::NoteNotFound) => {
            HttpResponse::NotFound().json(serde_json::json!({"error": "no note with this id"}))
        }
        Err(err) => storage_failure_response(&ctx, "NOTES", &err),
    }
}
