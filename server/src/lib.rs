//! # Beauty Contest Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! beauty-contest game. Players join a named hub, each submit a whole number
//! between 0 and 100, and the player closest to 0.8 times the average wins
//! the round. Everyone else loses a point until only one player is left.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rounds
//! Each hub decides when a round is complete, resolves it, applies scores
//! and eliminations, and schedules the next round. Clients only ever see
//! snapshots the hub has produced.
//!
//! ### Connection Management
//! Handles the lifecycle of player connections:
//! - Join admission (unknown hub, missing name, duplicate name, full hub)
//! - Registration with the hub once the WebSocket is up
//! - Unregistration on disconnect, ignoring stale disconnects after a rejoin
//! - Eviction of players whose outbound queue fills up
//!
//! ### State Broadcasting
//! After every change the hub builds one snapshot of the session, encodes it
//! once, and offers it to every connected player without waiting on any of
//! them.
//!
//! ## Architecture Design
//!
//! ### One Task Per Hub
//! A hub is a single task reading commands off an mpsc channel. All session
//! state lives inside it and is never shared, which removes any need for
//! locks around the game rules. The round reset is a deadline in the same
//! event loop, so it can never interleave with a submission.
//!
//! ### Bounded Outbound Queues
//! Every connection owns a bounded queue drained by its own pump task. A
//! slow reader can only ever hurt itself: once its queue is full it is
//! dropped from the hub.
//!
//! ## Module Organization
//!
//! ### Hub Module (`hub`)
//! The per-session event loop and its command handle.
//!
//! ### Roster Module (`roster`)
//! Participant records, live connections, and scoring.
//!
//! ### Broadcast Module (`broadcast`)
//! Snapshot construction and non-blocking fan-out.
//!
//! ### Registry Module (`registry`)
//! Hub creation, lookup, join admission through seats, and idle cleanup.
//!
//! ### Network Module (`network`)
//! The axum router: hub creation, WebSocket upgrade, health check.
//!
//! ### Error Module (`error`)
//! Join rejections and their HTTP status codes.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::hub::HubConfig;
//! use server::network;
//! use server::registry::SessionRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Up to 7 players per hub, default round timing
//!     let registry = Arc::new(SessionRegistry::new(HubConfig::default(), 7));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, network::router(registry)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod error;
pub mod hub;
pub mod network;
pub mod registry;
pub mod roster;
