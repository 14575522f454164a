//! Routing table from logical players to live connections.
//!
//! Player ids are chosen by clients and survive reconnects, connection ids are
//! handed out by the transport and die with the socket. The directory keeps the
//! two in step (one connection per player, latest binding wins) and also holds
//! the set of connections watching the lobby list.

use log::debug;
use shared::PlayerId;
use std::collections::{BTreeSet, HashMap};

/// Transport-assigned connection handle.
pub type ConnectionId = u32;

#[derive(Debug, Default)]
pub struct PlayerDirectory {
    connections: HashMap<PlayerId, ConnectionId>,
    players: HashMap<ConnectionId, PlayerId>,
    watchers: BTreeSet<ConnectionId>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes traffic for `player_id` to `connection`, replacing any earlier
    /// binding on either side.
    ///
    /// Returns the player `connection` served before, when that was someone
    /// else. That player is left without a route, same as a disconnect.
    pub fn bind(&mut self, player_id: &str, connection: ConnectionId) -> Option<PlayerId> {
        if let Some(previous) = self.connections.insert(player_id.to_string(), connection) {
            if previous != connection {
                self.players.remove(&previous);
            }
        }
        let displaced = self
            .players
            .insert(connection, player_id.to_string())
            .filter(|other| other != player_id);
        if let Some(other) = &displaced {
            self.connections.remove(other);
            debug!("Player {} displaced from connection {}", other, connection);
        }
        debug!("Player {} bound to connection {}", player_id, connection);
        displaced
    }

    pub fn connection_of(&self, player_id: &str) -> Option<ConnectionId> {
        self.connections.get(player_id).copied()
    }

    pub fn player_of(&self, connection: ConnectionId) -> Option<&PlayerId> {
        self.players.get(&connection)
    }

    pub fn watch(&mut self, connection: ConnectionId) {
        self.watchers.insert(connection);
    }

    pub fn watchers(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.watchers.iter().copied()
    }

    /// Forgets everything about a closed connection and returns the player it
    /// was serving, if any.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<PlayerId> {
        self.watchers.remove(&connection);
        let player_id = self.players.remove(&connection)?;
        self.connections.remove(&player_id);
        Some(player_id)
    }
}
