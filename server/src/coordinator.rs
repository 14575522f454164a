//! Single owner of all room, player and grace state.
//!
//! Every inbound action, disconnect and fired timer goes through one
//! `&mut Coordinator` call, so there is never more than one mutation in
//! flight. Calls do no I/O: outbound events pile up in the broadcast gateway
//! and deferred work in the timer queue, and the caller drains both.
//!
//! Room lifecycle lives here; dealing, bidding, doubting and winning are in
//! `engine.rs`.

use crate::broadcast::{BroadcastGateway, Outgoing};
use crate::config::ServerConfig;
use crate::directory::{ConnectionId, PlayerDirectory};
use crate::error::GameError;
use crate::grace::GraceRegistry;
use crate::room::{Room, RoomRegistry};
use crate::timers::{ScheduledTimer, Timer, TimerQueue};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientAction, PlayerId, PlayerInfo, ServerEvent, MIN_ROOM_CAPACITY};

pub struct Coordinator {
    pub(crate) config: ServerConfig,
    pub(crate) rooms: RoomRegistry,
    pub(crate) directory: PlayerDirectory,
    pub(crate) grace: GraceRegistry,
    pub(crate) gateway: BroadcastGateway,
    pub(crate) timers: TimerQueue,
    pub(crate) rng: StdRng,
}

impl Coordinator {
    pub fn new(config: ServerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rooms: RoomRegistry::new(),
            directory: PlayerDirectory::new(),
            grace: GraceRegistry::new(),
            gateway: BroadcastGateway::new(),
            timers: TimerQueue::new(),
            rng,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn directory(&self) -> &PlayerDirectory {
        &self.directory
    }

    pub fn grace(&self) -> &GraceRegistry {
        &self.grace
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self, room: &str) -> Option<&mut crate::game::Game> {
        self.rooms.get_mut(room)?.game.as_mut()
    }

    /// Events queued since the last drain, in emission order.
    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        self.gateway.drain()
    }

    /// Timers requested since the last drain.
    pub fn drain_timers(&mut self) -> Vec<ScheduledTimer> {
        self.timers.drain()
    }

    /// Applies one client action. A rejected action changes nothing and is
    /// reported to `connection` alone.
    pub fn handle_action(&mut self, connection: ConnectionId, action: ClientAction) {
        let result = match action {
            ClientAction::CreateRoom {
                name,
                password,
                player,
                capacity,
            } => self.create_room(connection, &name, password, player, capacity),
            ClientAction::JoinRoom {
                name,
                password,
                player,
            } => self.join_room(connection, &name, password.as_deref(), player),
            ClientAction::LeaveDelay { name, id } => {
                self.leave_delay(&name, &id);
                Ok(())
            }
            ClientAction::LeaveImmediate { name, id } => self.leave_room(&name, &id),
            ClientAction::RaiseBid { room_name, bid } => self.raise_bid(connection, &room_name, bid),
            ClientAction::Doubt { room_name } => self.doubt(connection, &room_name),
            ClientAction::Watch { id } => {
                self.watch(connection, &id);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.reject(connection, err);
        }
    }

    fn reject(&mut self, connection: ConnectionId, err: GameError) {
        warn!("Rejected action from connection {}: {}", connection, err);
        let event = match err {
            GameError::Forbidden => ServerEvent::Forbidden,
            other => ServerEvent::Error {
                message: other.to_string(),
            },
        };
        self.gateway.to_connection(connection, event);
    }

    /// Subscribes `connection` to the lobby list as player `player_id`.
    pub fn watch(&mut self, connection: ConnectionId, player_id: &str) {
        let displaced = self.directory.bind(player_id, connection);
        self.release_displaced(displaced);
        self.directory.watch(connection);
        self.broadcast_room_list();
    }

    pub fn create_room(
        &mut self,
        connection: ConnectionId,
        name: &str,
        password: Option<String>,
        player: PlayerInfo,
        capacity: u8,
    ) -> Result<(), GameError> {
        if self.rooms.contains(name) {
            return Err(GameError::RoomAlreadyExists);
        }
        if name.trim().is_empty() {
            return Err(GameError::InvalidRoom("name must not be empty".to_string()));
        }
        if !(MIN_ROOM_CAPACITY..=self.config.max_capacity).contains(&capacity) {
            return Err(GameError::InvalidRoom(format!(
                "capacity must be between {} and {}",
                MIN_ROOM_CAPACITY, self.config.max_capacity
            )));
        }

        self.leave_other_rooms(&player.id, name);
        let displaced = self.directory.bind(&player.id, connection);
        self.release_displaced(displaced);
        info!(
            "Room {} created by {} for {} players",
            name, player.id, capacity
        );
        self.rooms
            .insert(Room::new(name, password, capacity, player.into()));

        self.broadcast_room_state(name);
        self.broadcast_room_list();
        Ok(())
    }

    pub fn join_room(
        &mut self,
        connection: ConnectionId,
        name: &str,
        password: Option<&str>,
        player: PlayerInfo,
    ) -> Result<(), GameError> {
        let room = self.rooms.get(name).ok_or(GameError::RoomNotFound)?;
        if !room.accepts_password(password) {
            return Err(GameError::Forbidden);
        }
        let seated = room.contains(&player.id);
        if !seated && room.is_full() {
            return Err(GameError::RoomFull);
        }

        self.leave_other_rooms(&player.id, name);
        let displaced = self.directory.bind(&player.id, connection);
        self.release_displaced(displaced);

        if seated {
            if self.grace.clear(&player.id).is_some() {
                info!("Player {} reclaimed their seat in {}", player.id, name);
            }
            if let Some(room) = self.rooms.get_mut(name) {
                if let Some(member) = room.player_mut(&player.id) {
                    member.waiting = false;
                    member.name = player.name;
                }
            }
            self.broadcast_room_state(name);
            return Ok(());
        }

        let Some(room) = self.rooms.get_mut(name) else {
            return Err(GameError::RoomNotFound);
        };
        info!("Player {} joined room {}", player.id, name);
        room.add_player(player.into());
        let ready = room.at_capacity() && room.game.is_none();

        self.broadcast_room_list();
        self.broadcast_room_state(name);
        if ready {
            self.schedule_prestart(name);
        }
        Ok(())
    }

    /// Removes a player from a room at once, ending the game if a single
    /// seat is left and closing the room if nobody is.
    pub fn leave_room(&mut self, name: &str, player_id: &str) -> Result<(), GameError> {
        let room = self.rooms.get_mut(name).ok_or(GameError::RoomNotFound)?;

        if self.grace.get(player_id).is_some_and(|e| e.room == name) {
            self.grace.clear(player_id);
        }
        if room.remove_player(player_id).is_some() {
            info!("Player {} left room {}", player_id, name);
        }
        if !room.at_capacity() {
            room.pending_start = None;
            room.pending_restart = None;
        }

        let mut winner = None;
        let mut abandoned = false;
        if let Some(game) = room.game.as_mut() {
            if game.remove_player(player_id).is_some() {
                if game.players.len() == 1 {
                    winner = game.players.first().cloned();
                }
                abandoned = game.players.is_empty();
            }
        }
        if abandoned {
            room.game = None;
        }

        self.broadcast_room_state(name);

        if self.rooms.get(name).is_some_and(Room::is_empty) {
            self.rooms.remove(name);
            info!("Room {} closed", name);
        } else if let Some(winner) = winner {
            self.end_game(name, winner, None);
            return Ok(());
        }

        self.broadcast_room_list();
        Ok(())
    }

    /// Marks a player as away and holds their seat for the grace period.
    /// Unknown rooms and non-members are ignored.
    pub fn leave_delay(&mut self, name: &str, player_id: &str) {
        let Some(member) = self
            .rooms
            .get_mut(name)
            .and_then(|room| room.player_mut(player_id))
        else {
            debug!("Ignoring delayed leave of {} from {}", player_id, name);
            return;
        };
        member.waiting = true;

        let token = self.timers.next_token();
        if let Some(previous) = self.grace.arm(player_id, name, token) {
            debug!(
                "Grace for {} in {} superseded by {}",
                player_id, previous.room, name
            );
        }
        self.timers.schedule(
            self.config.grace_period,
            Timer::GraceExpired {
                player_id: player_id.to_string(),
                room: name.to_string(),
                token,
            },
        );
        info!(
            "Holding seat of {} in {} for {:?}",
            player_id, name, self.config.grace_period
        );

        self.broadcast_room_state(name);
    }

    /// Connection closed: stop sending it the lobby and start the grace
    /// period for the player it was serving.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(player_id) = self.directory.disconnect(connection) else {
            return;
        };
        for name in self.rooms.rooms_of_player(&player_id) {
            self.leave_delay(&name, &player_id);
        }
    }

    /// A connection that now speaks for someone else no longer reaches the
    /// player it used to serve, so that player's seats are held as if the
    /// connection had closed.
    fn release_displaced(&mut self, displaced: Option<PlayerId>) {
        let Some(player_id) = displaced else {
            return;
        };
        for name in self.rooms.rooms_of_player(&player_id) {
            self.leave_delay(&name, &player_id);
        }
    }

    /// Runs a fired timer if the state it was armed for still exists.
    pub fn handle_timer(&mut self, timer: Timer) {
        match timer {
            Timer::GraceExpired {
                player_id,
                room,
                token,
            } => {
                if self.grace.take_if_current(&player_id, token).is_none() {
                    debug!("Stale grace timer for {} in {}", player_id, room);
                    return;
                }
                info!("Grace period of {} in {} expired", player_id, room);
                if self.leave_room(&room, &player_id).is_err() {
                    debug!("Room {} vanished before grace expiry", room);
                }
            }
            Timer::Prestart { room, token } => {
                let Some(entry) = self.rooms.get_mut(&room) else {
                    return;
                };
                if entry.pending_start != Some(token) {
                    debug!("Stale prestart timer for {}", room);
                    return;
                }
                entry.pending_start = None;
                self.start_game(&room, false);
            }
            Timer::WinPause { room, token } => {
                let Some(entry) = self.rooms.get(&room) else {
                    return;
                };
                if entry.pending_restart != Some(token) {
                    debug!("Stale win pause timer for {}", room);
                    return;
                }
                self.broadcast_room_state(&room);
                if let Some(entry) = self.rooms.get(&room) {
                    self.gateway
                        .to_room(&self.directory, entry, ServerEvent::Prestart);
                }
            }
            Timer::Restart { room, token } => {
                let Some(entry) = self.rooms.get_mut(&room) else {
                    return;
                };
                if entry.pending_restart != Some(token) {
                    debug!("Stale restart timer for {}", room);
                    return;
                }
                entry.pending_restart = None;
                self.start_game(&room, true);
            }
        }
    }

    /// Keeps each player seated in one room at most: leaving for `keep`
    /// releases any seat or held seat elsewhere.
    fn leave_other_rooms(&mut self, player_id: &str, keep: &str) {
        for name in self.rooms.rooms_of_player(player_id) {
            if name != keep {
                info!("Player {} moves from {} to {}", player_id, name, keep);
                if self.leave_room(&name, player_id).is_err() {
                    debug!("Room {} vanished while {} moved", name, player_id);
                }
            }
        }
        if self.grace.get(player_id).is_some_and(|e| e.room != keep) {
            self.grace.clear(player_id);
        }
    }

    fn schedule_prestart(&mut self, name: &str) {
        let token = self.timers.next_token();
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        room.pending_start = Some(token);
        room.pending_restart = None;
        info!(
            "Room {} is full, dealing in {:?}",
            name, self.config.prestart_delay
        );

        self.gateway
            .to_room(&self.directory, room, ServerEvent::Prestart);
        self.timers.schedule(
            self.config.prestart_delay,
            Timer::Prestart {
                room: name.to_string(),
                token,
            },
        );
    }

    pub(crate) fn broadcast_room_state(&mut self, name: &str) {
        if let Some(room) = self.rooms.get(name) {
            self.gateway.room_state(&self.directory, room);
        }
    }

    pub(crate) fn broadcast_room_list(&mut self) {
        if self.directory.watchers().next().is_none() {
            return;
        }
        let rooms = self.rooms.summaries();
        self.gateway
            .to_watchers(&self.directory, ServerEvent::RoomList { rooms });
    }
}
