//! # Liar's Dice Room Server Library
//!
//! This library provides the authoritative server for multiplayer Liar's Dice.
//! Clients create, join and leave password-optional rooms; once a room is full
//! the server deals the dice, referees every bid and doubt, and tells each
//! member what happened.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! Dice are rolled and kept on the server. Turn order, bid legality, doubt
//! resolution, elimination and the winner are all decided here; clients only
//! render the events they receive.
//!
//! ### Reconnection Grace
//! A player whose connection drops is marked waiting and keeps their seat for
//! a grace period. Re-joining within that window rebinds the new connection
//! and carries on; otherwise the player is removed from the room as if they
//! had left.
//!
//! ### Lobby Broadcasting
//! Every connection that asked to watch the lobby receives the room list
//! whenever a room is created, filled, emptied, started or finished.
//!
//! ## Architecture Design
//!
//! ### Single Owner, Sequential Mutations
//! All state lives in one [`coordinator::Coordinator`]. Inbound packets,
//! closed connections and fired timers become calls on it, one at a time, from
//! the main server loop. Coordinator calls never touch the socket: outbound
//! events are queued in the [`broadcast::BroadcastGateway`] and deferred work
//! in the [`timers::TimerQueue`], and the loop drains both afterwards.
//!
//! ### Token-Guarded Timers
//! Every scheduled timer carries a fresh [`timers::TimerToken`], and the room
//! or grace entry it belongs to stores the same token. A timer whose token no
//! longer matches was superseded or cancelled and does nothing when it fires.
//!
//! ### UDP-Based Communication
//! Clients talk to the server over UDP with bincode-encoded packets from the
//! `shared` crate. Heartbeats keep a connection alive; silence longer than the
//! client timeout closes it.
//!
//! ## Module Organization
//!
//! - `connections`: socket addresses, connection ids, heartbeat timeouts
//! - `directory`: which connection speaks for which player, lobby watchers
//! - `grace`: pending reconnection windows
//! - `room`: rooms and the registry that owns them
//! - `game`: dice, bids and doubt resolution for one table
//! - `coordinator` and `engine`: the actions clients can take
//! - `broadcast`: outbound event queue
//! - `timers`: deferred work
//! - `network`: the UDP server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!
//!     // Runs until a shutdown message arrives:
//!     // - receives client packets and applies them to the coordinator
//!     // - sends the resulting events back to the affected connections
//!     // - fires grace, prestart and restart timers
//!     // - closes connections whose heartbeats stopped
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connections;
pub mod coordinator;
pub mod directory;
pub mod engine;
pub mod error;
pub mod game;
pub mod grace;
pub mod network;
pub mod room;
pub mod timers;
