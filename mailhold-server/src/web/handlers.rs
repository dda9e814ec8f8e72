//! HTTP endpoint handlers.
//!
//! Handlers are thin: they parse the request, call into the message or relay
//! layer and translate the outcome into a status code and body.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lettre::Address;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{ForwardError, MessageError, ResolveError, StoreError};
use crate::message::{
    DecompositionCache, MessageDetail, MessageList, MessageService, PartResolver,
};
use crate::relay::{ForwardAck, ForwardingAgent, Relay};
use crate::store::{MessageId, MessageStore};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub messages: MessageService,
    pub resolver: PartResolver,
    pub forwarder: ForwardingAgent,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MessageStore>, relay: Arc<dyn Relay>) -> Self {
        let fallback_sender = config.forward_sender.as_deref().and_then(|sender| {
            sender
                .parse::<Address>()
                .map_err(|e| warn!(sender = sender, error = %e, "forward_sender_invalid"))
                .ok()
        });

        let messages = MessageService::new(
            store.clone(),
            DecompositionCache::new(config.decompose_cache_size),
        );
        let resolver = PartResolver::new(messages.clone());
        let forwarder = ForwardingAgent::new(store, relay).with_fallback_sender(fallback_sender);

        Self {
            config: Arc::new(config),
            messages,
            resolver,
            forwarder,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

/// An error already mapped to its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, label: &'static str, error: impl ToString) -> Self {
        Self {
            status,
            body: ErrorResponse {
                status: label,
                error: error.to_string(),
            },
        }
    }

    fn not_found(error: impl ToString) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", error)
    }

    fn internal(error: impl ToString) -> Self {
        let error = error.to_string();
        error!(error = %error, "request_failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "error", error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::not_found(e),
            other => Self::internal(other),
        }
    }
}

impl From<MessageError> for ApiError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::NotFound(_) => Self::not_found(e),
            MessageError::Malformed(_) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "malformed", e),
            MessageError::Store(e) => e.into(),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound => Self::not_found(e),
            ResolveError::Malformed(_) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "malformed", e),
            ResolveError::Store(e) => e.into(),
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(e: ForwardError) -> Self {
        match e {
            ForwardError::MessageNotFound(_) => Self::not_found(e),
            ForwardError::InvalidRecipient(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_recipient", e)
            }
            ForwardError::RelayUnavailable(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "relay_unavailable", e)
            }
            ForwardError::Store(e) => e.into(),
        }
    }
}

/// Identifiers that are not numbers cannot name a stored message.
fn parse_id(id: &str) -> Result<MessageId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::not_found(format!("message {id} not found")))
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Message Views
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub recipient: Option<String>,
}

/// List captured messages, newest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MessageList>, ApiError> {
    let recipient = query
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let list = state.messages.list(recipient, state.config.list_limit).await?;
    Ok(Json(list))
}

/// Message detail with the rewritten HTML body and the part listing.
pub async fn message_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageDetail>, ApiError> {
    let id = parse_id(&id)?;
    let summary = state.messages.summary(id).await?;
    Ok(Json(summary.detail()))
}

/// The HTML body, with `cid:` references rewritten to content paths.
pub async fn message_html(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let summary = state.messages.summary(id).await?;

    let html = summary
        .html_body()
        .ok_or_else(|| ApiError::not_found(format!("message {id} has no HTML body")))?;

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html.to_string(),
    )
        .into_response())
}

pub async fn message_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let summary = state.messages.summary(id).await?;

    let text = summary
        .text_body()
        .ok_or_else(|| ApiError::not_found(format!("message {id} has no text body")))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text.to_string(),
    )
        .into_response())
}

/// The message exactly as captured. Never parses, so malformed messages
/// are still served.
pub async fn message_raw(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let message = state.messages.raw(id).await?;

    Ok(([(header::CONTENT_TYPE, "text/plain")], message.raw).into_response())
}

/// Stream one part, addressed by content-id or positional index.
pub async fn message_content(
    State(state): State<AppState>,
    Path((id, part_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let part = state.resolver.resolve(id, &part_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, part.content_type),
            (header::CONTENT_LENGTH, part.size.to_string()),
        ],
        Body::from_stream(part.stream),
    )
        .into_response())
}

// =============================================================================
// Forwarding
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub recipient: String,
}

/// Forward a stored message to a new recipient through the relay.
pub async fn forward_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ForwardRequest>,
) -> Result<(StatusCode, Json<ForwardAck>), ApiError> {
    let id = parse_id(&id)?;

    info!(message_id = %id, recipient = %request.recipient, "forward_requested");

    let ack = state.forwarder.forward(id, &request.recipient).await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}
