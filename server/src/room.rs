//! Rooms and the registry that owns them.

use crate::game::Game;
use crate::timers::TimerToken;
use shared::{Player, RoomSnapshot, RoomSummary};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Room {
    pub name: String,
    password: Option<String>,
    pub capacity: u8,
    /// Members in join order.
    pub players: Vec<Player>,
    pub game: Option<Game>,
    /// Countdown that will deal the first hand once the room is full.
    pub pending_start: Option<TimerToken>,
    /// Post-win pause and rematch; both timers share this token.
    pub pending_restart: Option<TimerToken>,
}

impl Room {
    pub fn new(name: &str, password: Option<String>, capacity: u8, creator: Player) -> Self {
        Self {
            name: name.to_string(),
            password: password.filter(|p| !p.is_empty()),
            capacity,
            players: vec![creator],
            game: None,
            pending_start: None,
            pending_restart: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.password.is_some()
    }

    pub fn accepts_password(&self, given: Option<&str>) -> bool {
        match &self.password {
            Some(expected) => given == Some(expected.as_str()),
            None => true,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= usize::from(self.capacity)
    }

    /// Membership exactly at capacity, the precondition for dealing.
    pub fn at_capacity(&self) -> bool {
        self.players.len() == usize::from(self.capacity)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        Some(self.players.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            name: self.name.clone(),
            locked: self.is_locked(),
            capacity: self.capacity,
            players: self.players.clone(),
            game: self.game.as_ref().map(Game::snapshot),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            locked: self.is_locked(),
            capacity: self.capacity,
            players: self.players.clone(),
            in_game: self.game.is_some(),
        }
    }
}

/// All live rooms keyed by name. Listing order is by name.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    pub fn insert(&mut self, room: Room) {
        self.rooms.insert(room.name.clone(), room);
    }

    pub fn remove(&mut self, name: &str) -> Option<Room> {
        self.rooms.remove(name)
    }

    /// Names of the rooms `player_id` sits in. The coordinator keeps this
    /// to at most one.
    pub fn rooms_of_player(&self, player_id: &str) -> Vec<String> {
        self.rooms
            .values()
            .filter(|room| room.contains(player_id))
            .map(|room| room.name.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms.values().map(Room::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
