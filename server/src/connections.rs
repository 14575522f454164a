//! Transport-level connection table.
//!
//! Knows sockets, not players. Which player a connection speaks for is the
//! `PlayerDirectory`'s business; when a connection closes here the network
//! loop tells the coordinator so it can hold that player's seat.

use crate::directory::ConnectionId;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    /// Refreshed by every heartbeat or action.
    pub last_seen: Instant,
}

impl Connection {
    fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_silent_for(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Open connections, indexed both ways.
///
/// Ids start at 1 and are never handed out twice in one run, so a late packet
/// or timer naming a closed connection cannot reach a newer one.
pub struct ConnectionTable {
    by_id: HashMap<ConnectionId, Connection>,
    by_addr: HashMap<SocketAddr, ConnectionId>,
    next_id: ConnectionId,
    limit: usize,
}

impl ConnectionTable {
    pub fn new(limit: usize) -> Self {
        Self {
            by_id: HashMap::new(),
            by_addr: HashMap::new(),
            next_id: 1,
            limit,
        }
    }

    /// Opens a connection for `addr`, or returns None when the table is full.
    pub fn open(&mut self, addr: SocketAddr) -> Option<ConnectionId> {
        if self.by_id.len() >= self.limit {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.by_addr.insert(addr, id);
        self.by_id.insert(id, Connection::new(id, addr));
        info!("Connection {} opened from {}", id, addr);
        Some(id)
    }

    /// Closes a connection. False if it was already closed.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.by_id.remove(&id) else {
            return false;
        };
        if self.by_addr.get(&connection.addr) == Some(&id) {
            self.by_addr.remove(&connection.addr);
        }
        info!("Connection {} closed", id);
        true
    }

    pub fn by_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.by_addr.get(&addr).copied()
    }

    pub fn addr_of(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.by_id.get(&id).map(|c| c.addr)
    }

    /// Records activity. False for unknown ids.
    pub fn touch(&mut self, id: ConnectionId) -> bool {
        match self.by_id.get_mut(&id) {
            Some(connection) => {
                connection.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Closes and returns every connection silent for longer than `timeout`.
    pub fn reap_silent(&mut self, timeout: Duration) -> Vec<ConnectionId> {
        let silent: Vec<ConnectionId> = self
            .by_id
            .values()
            .filter(|c| c.is_silent_for(timeout))
            .map(|c| c.id)
            .collect();

        for id in &silent {
            self.close(*id);
        }
        silent
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
