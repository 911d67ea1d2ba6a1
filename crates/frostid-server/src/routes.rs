use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use frostid::IdGenerator;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Response envelope shared by every id endpoint.
///
/// The HTTP status is always 200; `code` carries the outcome so callers
/// only need one decoding path.
#[derive(Debug, Serialize)]
pub struct RespBase<T> {
    pub code: i32,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> RespBase<T> {
    fn success(data: T) -> Self {
        Self {
            code: 200,
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    fn invalid_param(name: &str) -> Self {
        Self {
            code: 400,
            msg: format!("invalid parameter: {name}"),
            data: None,
        }
    }

    fn failed(msg: String) -> Self {
        Self {
            code: 500,
            msg,
            data: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<IdGenerator>,
    pub max_batch_ids: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/id/get", get(get_one))
        .route("/id/batch", get(get_batch))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn get_one(State(state): State<AppState>) -> Json<RespBase<String>> {
    match state.generator.get_id() {
        // Ids travel as decimal strings: i64 does not survive a JS number.
        Ok(id) => Json(RespBase::success(id.to_string())),
        Err(err) => {
            error!(error = %err, "id generation failed");
            Json(RespBase::failed(err.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchParams {
    count: Option<String>,
}

async fn get_batch(
    State(state): State<AppState>,
    Query(params): Query<BatchParams>,
) -> Json<RespBase<Vec<String>>> {
    let Some(count) = parse_count(params.count.as_deref(), state.max_batch_ids) else {
        return Json(RespBase::invalid_param("count"));
    };
    match state.generator.get_ids(count) {
        Ok(ids) => Json(RespBase::success(
            ids.iter().map(ToString::to_string).collect(),
        )),
        Err(err) => {
            error!(error = %err, count, "batch id generation failed");
            Json(RespBase::failed(err.to_string()))
        }
    }
}

/// A missing `count` means one id; a non-numeric one is a caller error;
/// anything above the configured cap is clamped, not rejected.
fn parse_count(raw: Option<&str>, max_batch_ids: usize) -> Option<usize> {
    let count = match raw {
        None => 1,
        Some(raw) => raw.parse::<usize>().ok()?,
    };
    Some(count.min(max_batch_ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_defaults_to_one_and_clamps_to_the_cap() {
        assert_eq!(parse_count(None, 10_000), Some(1));
        assert_eq!(parse_count(Some("5"), 10_000), Some(5));
        assert_eq!(parse_count(Some("10001"), 10_000), Some(10_000));
        assert_eq!(parse_count(Some("abc"), 10_000), None);
        assert_eq!(parse_count(Some("-1"), 10_000), None);
    }

    #[test]
    fn envelope_serializes_with_code_msg_and_data() {
        let ok = RespBase::success("123".to_string());
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"code":200,"msg":"success","data":"123"}"#
        );

        let bad: RespBase<String> = RespBase::invalid_param("count");
        assert_eq!(
            serde_json::to_string(&bad).unwrap(),
            r#"{"code":400,"msg":"invalid parameter: count","data":null}"#
        );
    }
}
