//! arena-relay - A WebSocket relay for two-player sessions with spectators
//!
//! This crate provides the core functionality for arena-relay, including:
//! - Session state and move history
//! - Join/watch token registry
//! - Per-connection dispatch, broadcast and replay
//! - Configuration management
//!
//! # Architecture
//!
//! A host connection starts a session and receives two tokens. The join token
//! lets a second player attach; the watch token lets any number of spectators
//! follow along. Every move a player sends is recorded and broadcast to all
//! connections subscribed to the session. Late arrivals are replayed the
//! history first. The session ends when its host disconnects.

pub mod config;
pub mod protocol;
pub mod server;
