use actix_web::{HttpResponse, Responder, web};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    // plain routes, not a scope: a bare "/api" scope would claim every
    // /api/... path and stop sibling scopes from being tried
    cfg.route("/api/health", web::get().to(health))
        .route("/api/version", web::get().to(version));
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION,
    }))
}

async fn version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "version": VERSION }))
}
