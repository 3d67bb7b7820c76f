// Webhook receiver: authenticate, classify, acknowledge, then route in the
// background. The sender never waits for the sync chain; the chain runs on a
// shared `TaskTracker` so shutdown can wait for it to finish.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use subsync_common::event::EventKind;
use subsync_common::protocol::push::decode_push;
use tokio_util::task::TaskTracker;
use tracing::{info, info_span, warn, Instrument};

use crate::error::{ApiError, ErrorCode};
use crate::router::EventRouter;
use crate::signature::{self, SignatureError, SIGNATURE_HEADER};

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

#[derive(Clone)]
pub struct WebhookState {
    secret: Arc<[u8]>,
    router: Arc<EventRouter>,
    chains: TaskTracker,
}

impl WebhookState {
    pub fn new(secret: impl AsRef<[u8]>, router: Arc<EventRouter>, chains: TaskTracker) -> Self {
        Self { secret: Arc::from(secret.as_ref()), router, chains }
    }
}

pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new().route(path, post(receive)).with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let delivery_id = header(&headers, DELIVERY_HEADER).unwrap_or("-").to_owned();
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::from_code(ErrorCode::PayloadTooLarge),
        _ => ApiError::new(ErrorCode::ValidationFailed, rejection.body_text()),
    })?;

    signature::verify(&state.secret, &body, header(&headers, SIGNATURE_HEADER)).map_err(
        |error| {
            warn!(delivery_id = %delivery_id, %error, "rejected webhook delivery");
            match error {
                SignatureError::Missing => ApiError::from_code(ErrorCode::SignatureMissing),
                SignatureError::Malformed | SignatureError::Mismatch => {
                    ApiError::new(ErrorCode::SignatureInvalid, error.to_string())
                }
                SignatureError::InvalidKey => ApiError::from_code(ErrorCode::InternalError),
            }
        },
    )?;

    let kind = header(&headers, EVENT_HEADER).map(EventKind::parse).ok_or_else(|| {
        ApiError::new(ErrorCode::ValidationFailed, "missing x-github-event header")
    })?;

    if kind == EventKind::Ping {
        info!(delivery_id = %delivery_id, "webhook ping received");
        let ack = Json(json!({ "ok": true, "event": "ping" }));
        return Ok((StatusCode::OK, ack).into_response());
    }

    let notification = if kind.is_push() {
        let push = decode_push(&body).map_err(|error| {
            warn!(delivery_id = %delivery_id, %error, "undecodable push payload");
            ApiError::new(ErrorCode::ValidationFailed, error.to_string())
        })?;
        Some(push)
    } else {
        None
    };

    let span = info_span!("subsync.delivery", delivery_id = %delivery_id, event = %kind);
    let router = Arc::clone(&state.router);
    state.chains.spawn(async move { router.handle(&kind, notification).await }.instrument(span));

    Ok((StatusCode::ACCEPTED, Json(json!({ "ok": true }))).into_response())
}
