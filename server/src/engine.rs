//! Turn flow for a room's game: dealing, raising, doubting and the end of a
//! game with its automatic rematch.

use crate::coordinator::Coordinator;
use crate::directory::ConnectionId;
use crate::error::GameError;
use crate::game::Game;
use crate::timers::Timer;
use log::{debug, info};
use shared::{Bid, GamePlayer, PlayerId, ServerEvent};

impl Coordinator {
    /// Deals a fresh game if the room is exactly full and idle; otherwise
    /// does nothing.
    pub fn start_game(&mut self, name: &str, restart: bool) {
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        if !room.at_capacity() || room.game.is_some() {
            debug!(
                "Not dealing in {}: {}/{} seated, game running: {}",
                name,
                room.players.len(),
                room.capacity,
                room.game.is_some()
            );
            return;
        }

        room.pending_start = None;
        room.pending_restart = None;
        room.game = Some(Game::deal(&room.players, &mut self.rng));
        info!(
            "Dealt {} in room {} for {} players",
            if restart { "rematch" } else { "game" },
            name,
            room.players.len()
        );

        if restart {
            let event = ServerEvent::Restart {
                room: room.snapshot(),
            };
            self.gateway.to_room(&self.directory, room, event);
        } else {
            self.gateway.room_state(&self.directory, room);
        }
        self.broadcast_room_list();
    }

    /// Places `bid` on behalf of the player bound to `connection`, who must
    /// be the player to act.
    pub fn raise_bid(
        &mut self,
        connection: ConnectionId,
        name: &str,
        bid: Bid,
    ) -> Result<(), GameError> {
        let actor = self.acting_player(connection)?;
        let strict = !self.config.lenient_bids;
        let room = self.rooms.get_mut(name).ok_or(GameError::RoomNotFound)?;
        let game = room.game.as_mut().ok_or(GameError::NoActiveGame)?;
        if !game.is_turn_of(&actor) {
            return Err(GameError::NotYourTurn);
        }

        let next_player = game.raise(bid, strict)?.clone();

        self.gateway.to_room(
            &self.directory,
            room,
            ServerEvent::Raised { bid, next_player },
        );
        self.gateway.room_state(&self.directory, room);
        Ok(())
    }

    /// Challenges the standing bid on behalf of the player to act.
    pub fn doubt(&mut self, connection: ConnectionId, name: &str) -> Result<(), GameError> {
        let actor = self.acting_player(connection)?;
        let room = self.rooms.get_mut(name).ok_or(GameError::RoomNotFound)?;
        let game = room.game.as_mut().ok_or(GameError::NoActiveGame)?;
        if !game.is_turn_of(&actor) {
            return Err(GameError::NotYourTurn);
        }

        let settlement = game.settle_doubt(&mut self.rng)?;
        info!(
            "{} doubted in {}: {} matching, bid {}, {} loses a die",
            actor,
            name,
            settlement.outcome.total_count,
            if settlement.bid_held { "held" } else { "failed" },
            settlement.outcome.user.id
        );

        let total_count = settlement.outcome.total_count;
        let event = if settlement.eliminated {
            ServerEvent::Eliminated(settlement.outcome)
        } else {
            ServerEvent::EndRound(settlement.outcome)
        };
        self.gateway.to_room(&self.directory, room, event);

        if let Some(winner) = settlement.winner {
            self.end_game(name, winner, Some(total_count));
            return Ok(());
        }

        self.broadcast_room_state(name);
        Ok(())
    }

    /// Closes the room's game. A room that is still full gets the win
    /// announcement and a rematch after the pause; a short-handed room just
    /// returns to waiting.
    pub fn end_game(&mut self, name: &str, winner: GamePlayer, total_count: Option<u32>) {
        let token = self.timers.next_token();
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        room.game = None;

        if room.at_capacity() {
            info!("{} won in room {}, rematch scheduled", winner.id, name);
            room.pending_restart = Some(token);
            self.gateway.to_room(
                &self.directory,
                room,
                ServerEvent::Win {
                    user: winner,
                    total_count,
                },
            );
            self.timers.schedule(
                self.config.win_pause,
                Timer::WinPause {
                    room: name.to_string(),
                    token,
                },
            );
            self.timers.schedule(
                self.config.restart_delay,
                Timer::Restart {
                    room: name.to_string(),
                    token,
                },
            );
        } else {
            info!("{} won in short-handed room {}", winner.id, name);
            self.gateway.room_state(&self.directory, room);
        }

        self.broadcast_room_list();
    }

    fn acting_player(&self, connection: ConnectionId) -> Result<PlayerId, GameError> {
        self.directory
            .player_of(connection)
            .cloned()
            .ok_or(GameError::UnknownPlayer)
    }
}
