use actix_web::HttpResponse;
use actix_web::http::StatusCode;

use crate::context::RequestContext;
use crate::db::StorageError;

pub mod health;
pub mod notes;
pub mod users;

/// Map storage failures every controller can hit the same way: cancellation
/// gets no body (the client is gone), deadlines become 504, and anything
/// else is a 500 that never leaks internals.
pub(crate) fn storage_failure_response(
    ctx: &RequestContext,
    operation: &str,
    err: &StorageError,
) -> HttpResponse {
    match err {
        StorageError::Cancelled => {
            log::debug!("[{operation}] {} abandoned by client", ctx.request_id);
            HttpResponse::new(StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        }
        StorageError::DeadlineExceeded => {
            log::warn!("[{operation}] {} storage deadline exceeded", ctx.request_id);
            HttpResponse::GatewayTimeout().json(serde_json::json!({
                "error": "request took too long to process, try again later"
            }))
        }
        other => {
            log::error!("[{operation}] {} storage failure: {other}", ctx.request_id);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "internal error"}))
        }
    }
}
