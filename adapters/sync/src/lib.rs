#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Synchronisation between the Tribe War client and the simulation server.
//!
//! Inbound socket frames are either raw grid snapshots (binary) or JSON
//! events (text). The [`Session`] is the only place client state changes:
//! it decodes frames, applies user actions, redraws once per frame and queues
//! [`Outgoing`] traffic. [`run`] wires a session to a tokio WebSocket
//! connection and releases paced batches through a [`BatchPacer`].

mod action;
mod client;
mod decode;
mod pacer;
mod session;

pub use action::UserAction;
pub use client::run;
pub use decode::{decode_text, DecodeError, InboundFrame, ServerEvent, ServerEventKind};
pub use pacer::BatchPacer;
pub use session::{ActionError, FrameOutcome, Notice, Outgoing, Session};
