//! # Beauty Contest Client Library
//!
//! This library provides a terminal client for the beauty-contest server. It
//! joins a hub over WebSocket, forwards the numbers typed on stdin, and
//! prints every snapshot the server sends back.
//!
//! ## Architecture Overview
//!
//! The client holds no game state of its own. The server is authoritative and
//! sends a full snapshot after every change, so the client only has to render
//! the latest message it received.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Manages the connection to the server:
//! - Join URL construction with the hub id and player name
//! - WebSocket connection via tokio-tungstenite
//! - Forwarding stdin lines as text frames
//! - Shutdown when the server closes or input ends
//!
//! ### Rendering Module (`rendering`)
//! Turns server messages into text:
//! - Round progress with responded and pending players
//! - Round results with target and winners, or the hand game note
//! - Final leaderboard, highest score first
//! - Rejection messages for invalid input
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", "0a1b2c3d", "alice")?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod rendering;
