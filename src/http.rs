//! HTTP surface of the bridge.

use crate::command::{parse_source, parse_volume, LogicalCommand};
use crate::error::{BridgeError, Result};
use crate::processor::{CommandOutcome, CommandProcessor};
use crate::types::StateSnapshot;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct HttpState {
    processor: Arc<CommandProcessor>,
    amplifier: Arc<str>,
}

impl HttpState {
    pub fn new(processor: Arc<CommandProcessor>, amplifier: impl Into<Arc<str>>) -> Self {
        Self {
            processor,
            amplifier: amplifier.into(),
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Serialize)]
pub struct Status {
    #[serde(flatten)]
    pub state: StateSnapshot,
    pub amplifier: String,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/volume/set/{value}", get(volume_set))
        .route("/volume/{action}", get(volume_action))
        .route("/source/{id}", get(source_set))
        .with_state(state)
}

/// Serve the router until the listener fails
pub async fn serve(listener: TcpListener, state: HttpState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("http server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn status(State(state): State<HttpState>) -> Json<Status> {
    Json(Status {
        state: state.processor.snapshot(),
        amplifier: state.amplifier.to_string(),
    })
}

async fn volume_action(
    State(state): State<HttpState>,
    Path(action): Path<String>,
) -> Result<String> {
    let command = LogicalCommand::from_volume_action(&action)?;
    let outcome = state.processor.execute(command).await?;
    Ok(format!(
        "Volume action {} executed. Current volume: {}",
        action,
        outcome.snapshot().volume
    ))
}

async fn volume_set(State(state): State<HttpState>, Path(value): Path<String>) -> Result<String> {
    let volume = parse_volume(&value)?;
    let message = match state.processor.execute(LogicalCommand::VolumeSet(volume)).await? {
        CommandOutcome::AlreadySet(snapshot) => {
            format!("Volume already at {}", snapshot.volume)
        }
        outcome => format!("Volume set to {}", outcome.snapshot().volume),
    };
    Ok(message)
}

async fn source_set(State(state): State<HttpState>, Path(id): Path<String>) -> Result<String> {
    let id = parse_source(&id)?;
    let message = match state.processor.execute(LogicalCommand::SourceSet(id)).await? {
        CommandOutcome::AlreadySet(snapshot) => format!("Source already set to {}", snapshot.source),
        outcome => format!("Source changed to {}", outcome.snapshot().source),
    };
    Ok(message)
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.is_transmission() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
