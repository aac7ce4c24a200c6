//! `GET /?q=<text>&model=<optional>`: resolve the place mentions in `q`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use locitorium_core::Error;
use locitorium_runtime::Runner;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "detail": message.into() }))).into_response()
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let text = params.q.unwrap_or_default();
    if text.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "query parameter 'q' is required");
    }

    let config = state.request_config(params.model.as_deref());
    if text.chars().count() > config.max_chars {
        return detail(StatusCode::BAD_REQUEST, "input too long");
    }

    let doc_id = Uuid::new_v4().to_string();
    let runner = match Runner::from_config(config) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Failed to build runner: {}", e);
            return detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    match runner.run_doc(&text, &doc_id).await {
        Ok(pred) => {
            info!(
                "Resolved {} ({} results, {:.2}s)",
                doc_id,
                pred.results.len(),
                pred.metrics.total_s
            );
            (StatusCode::OK, Json(pred)).into_response()
        }
        Err(Error::PreconditionFailed(message)) => detail(StatusCode::BAD_REQUEST, message),
        Err(e) => {
            error!("Request {} failed: {}", doc_id, e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
