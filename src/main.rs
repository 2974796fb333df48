mod auth;
mod config;
mod context;
mod controllers;
mod db;
mod models;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Logger, from_fn};
use actix_web::{App, HttpResponse, HttpServer, web};
use dotenv::dotenv;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::db::Database;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub tokens: TokenManager,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let tokens = TokenManager::new(&config.jwt_secret)
        .expect("JWT_SECRET must be set to a non-empty value");

    let db = Arc::new(
        Database::new(&config.database_url, config.query_timeout)
            .expect("Failed to initialize database"),
    );

    let port = config.port;
    log::info!("[SERVER] listening on 0.0.0.0:{port}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                tokens: tokens.clone(),
            }))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest()
                        .json(serde_json::json!({"error": "invalid request body"})),
                )
                .into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest()
                        .json(serde_json::json!({"error": "invalid path parameter"})),
                )
                .into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest()
                        .json(serde_json::json!({"error": "invalid query parameter"})),
                )
                .into()
            }))
            .wrap(Logger::default())
            .wrap(from_fn(context::request_context))
            .wrap(cors)
            // most specific scope first: once a scope prefix matches,
            // siblings registered after it are never tried
            .configure(controllers::notes::config)
            .configure(controllers::users::config)
            .configure(controllers::health::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
