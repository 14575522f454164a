//! Fan-out of server events to connections.
//!
//! The gateway only queues; the network layer drains the outbox after every
//! coordinator call and does the actual sending. Players without a live
//! connection (mid-grace, or never bound) are skipped.

use crate::directory::{ConnectionId, PlayerDirectory};
use crate::room::Room;
use shared::ServerEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub connection: ConnectionId,
    pub event: ServerEvent,
}

#[derive(Debug, Default)]
pub struct BroadcastGateway {
    outbox: Vec<Outgoing>,
}

impl BroadcastGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_connection(&mut self, connection: ConnectionId, event: ServerEvent) {
        self.outbox.push(Outgoing { connection, event });
    }

    /// Every member of `room` that currently has a connection.
    pub fn to_room(&mut self, directory: &PlayerDirectory, room: &Room, event: ServerEvent) {
        for player in &room.players {
            if let Some(connection) = directory.connection_of(&player.id) {
                self.to_connection(connection, event.clone());
            }
        }
    }

    /// The full room snapshot, to every connected member.
    pub fn room_state(&mut self, directory: &PlayerDirectory, room: &Room) {
        let event = ServerEvent::Room {
            room: room.snapshot(),
        };
        self.to_room(directory, room, event);
    }

    pub fn to_watchers(&mut self, directory: &PlayerDirectory, event: ServerEvent) {
        for connection in directory.watchers() {
            self.to_connection(connection, event.clone());
        }
    }

    pub fn drain(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerInfo;

    #[test]
    fn test_room_broadcast_skips_unbound_members() {
        let mut directory = PlayerDirectory::new();
        directory.bind("a", 1);
        let mut room = Room::new("table", None, 3, PlayerInfo::new("a", "A").into());
        room.add_player(PlayerInfo::new("b", "B").into());

        let mut gateway = BroadcastGateway::new();
        gateway.to_room(&directory, &room, ServerEvent::Prestart);

        let sent = gateway.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].connection, 1);
        assert_eq!(sent[0].event, ServerEvent::Prestart);
        assert!(gateway.drain().is_empty());
    }

    #[test]
    fn test_watchers_receive_each_event_once() {
        let mut directory = PlayerDirectory::new();
        directory.watch(4);
        directory.watch(9);
        directory.watch(4);

        let mut gateway = BroadcastGateway::new();
        gateway.to_watchers(&directory, ServerEvent::RoomList { rooms: vec![] });

        let targets: Vec<_> = gateway.drain().into_iter().map(|o| o.connection).collect();
        assert_eq!(targets, vec![4, 9]);
    }

    #[test]
    fn test_room_state_carries_snapshot() {
        let mut directory = PlayerDirectory::new();
        directory.bind("a", 2);
        let room = Room::new("table", None, 2, PlayerInfo::new("a", "A").into());

        let mut gateway = BroadcastGateway::new();
        gateway.room_state(&directory, &room);

        match &gateway.drain()[0].event {
            ServerEvent::Room { room: snapshot } => assert_eq!(snapshot.name, "table"),
            other => panic!("Unexpected event {:?}", other),
        }
    }
}
