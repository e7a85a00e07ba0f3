//! Demultiplexing of inbound socket frames.

use std::{collections::BTreeMap, fmt};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tribe_war_core::{
    protocol::{Inspection, StatsUpdate, TribeProfile},
    GridError,
};

/// Raw frame received from the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// Full grid snapshot, one byte per cell.
    Binary(Vec<u8>),
    /// Structured JSON event.
    Text(String),
}

/// Discriminant of a decoded [`ServerEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerEventKind {
    /// `inspect_response`.
    InspectResponse,
    /// `custom_map_initialized`.
    CustomMapInitialized,
    /// `custom_map_error`.
    CustomMapError,
    /// `stats_update`, or any frame carrying `tribes` without a known action.
    StatsUpdate,
}

impl fmt::Display for ServerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InspectResponse => "inspect_response",
            Self::CustomMapInitialized => "custom_map_initialized",
            Self::CustomMapError => "custom_map_error",
            Self::StatsUpdate => "stats_update",
        })
    }
}

/// Text events the server pushes to the client.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    /// Answer to the last `inspect` request.
    InspectResponse(Inspection),
    /// The submitted map was accepted.
    CustomMapInitialized {
        /// Tribes the server created, keyed by tribe identifier.
        tribes: BTreeMap<String, TribeProfile>,
    },
    /// The submitted map was refused.
    CustomMapError {
        /// Server supplied reason.
        error: String,
    },
    /// Periodic simulation statistics.
    Stats(StatsUpdate),
}

impl ServerEvent {
    /// Discriminant of the event.
    #[must_use]
    pub const fn kind(&self) -> ServerEventKind {
        match self {
            Self::InspectResponse(_) => ServerEventKind::InspectResponse,
            Self::CustomMapInitialized { .. } => ServerEventKind::CustomMapInitialized,
            Self::CustomMapError { .. } => ServerEventKind::CustomMapError,
            Self::Stats(_) => ServerEventKind::StatsUpdate,
        }
    }
}

/// Reasons an inbound frame was dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The binary snapshot had the wrong size.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// The text frame was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// A known event carried fields of the wrong shape.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        /// Event whose payload failed to decode.
        kind: ServerEventKind,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The action tag names no event this client understands.
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// The frame carried neither an action tag nor a `tribes` field.
    #[error("frame carries no action")]
    MissingAction,
}

#[derive(Deserialize)]
struct InitializedPayload {
    #[serde(default)]
    tribes: BTreeMap<String, TribeProfile>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

const DEFAULT_MAP_ERROR: &str = "Failed to initialize map";

/// Decodes a text frame into a server event.
///
/// Frames are dispatched on their `action` tag. A frame without a recognised
/// tag that carries a `tribes` field is treated as a statistics update, which
/// is how the server sends its periodic stats.
pub fn decode_text(text: &str) -> Result<ServerEvent, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
    let action = value.get("action").and_then(Value::as_str).map(str::to_owned);
    let has_tribes = value.get("tribes").is_some();

    match action.as_deref() {
        Some("inspect_response") => {
            payload(value, ServerEventKind::InspectResponse).map(ServerEvent::InspectResponse)
        }
        Some("custom_map_initialized") => {
            payload::<InitializedPayload>(value, ServerEventKind::CustomMapInitialized)
                .map(|payload| ServerEvent::CustomMapInitialized {
                    tribes: payload.tribes,
                })
        }
        Some("custom_map_error") => {
            payload::<ErrorPayload>(value, ServerEventKind::CustomMapError).map(|payload| {
                ServerEvent::CustomMapError {
                    error: payload
                        .error
                        .unwrap_or_else(|| DEFAULT_MAP_ERROR.to_owned()),
                }
            })
        }
        Some("stats_update") => payload(value, ServerEventKind::StatsUpdate).map(ServerEvent::Stats),
        _ if has_tribes => payload(value, ServerEventKind::StatsUpdate).map(ServerEvent::Stats),
        Some(other) => Err(DecodeError::UnknownAction(other.to_owned())),
        None => Err(DecodeError::MissingAction),
    }
}

fn payload<T: DeserializeOwned>(value: Value, kind: ServerEventKind) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Payload { kind, source })
}
