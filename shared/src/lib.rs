//! Wire protocol and dice rules shared by the server and its clients.
//!
//! Everything that crosses the network lives here: the `Packet` envelope, the
//! client actions, the server events and the room/game views they carry. The
//! pure dice rules (`Bid`, `count_matches`) live here too so that a client can
//! show the same tally the server uses to settle a doubt.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const STARTING_DICE: u8 = 5;
pub const DIE_FACES: u8 = 6;
pub const WILD_FACE: u8 = 1;
pub const MIN_ROOM_CAPACITY: u8 = 2;

/// Client-generated player id, stable across reconnects.
pub type PlayerId = String;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect { client_version: u32 },
    Heartbeat,
    Disconnect,
    Action(ClientAction),

    Connected { connection_id: u32 },
    Disconnected { reason: String },
    Event(ServerEvent),
}

/// Encodes a packet into a single datagram payload.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(packet)
}

/// Decodes a datagram payload produced by `encode_packet`.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Player identity as sent by a client when creating or joining a room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerInfo {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A room member. `waiting` is set while the player is inside the
/// disconnect grace period.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub waiting: bool,
}

impl From<PlayerInfo> for Player {
    fn from(info: PlayerInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            waiting: false,
        }
    }
}

/// A claim that at least `count` dice on the table show `value` or a wild.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Bid {
    pub value: u8,
    pub count: u32,
}

impl Bid {
    pub fn new(value: u8, count: u32) -> Self {
        Self { value, count }
    }

    /// Face within 1..=6 and a non-zero count.
    pub fn is_valid(&self) -> bool {
        (1..=DIE_FACES).contains(&self.value) && self.count >= 1
    }

    /// True if this bid is a legal raise over `previous`: more dice, or the
    /// same number of dice on a higher face.
    pub fn outranks(&self, previous: &Bid) -> bool {
        self.count > previous.count || (self.count == previous.count && self.value > previous.value)
    }

    /// Whether a single die counts toward this bid.
    pub fn matches(&self, die: u8) -> bool {
        die == self.value || die == WILD_FACE
    }

    /// True if the tally on the table satisfies the bid.
    pub fn holds(&self, match_count: u32) -> bool {
        match_count >= self.count
    }
}

/// Counts dice showing `value` or the wild face.
pub fn count_matches<'a, I>(dice: I, value: u8) -> u32
where
    I: IntoIterator<Item = &'a u8>,
{
    let bid = Bid::new(value, 1);
    dice.into_iter().filter(|&&die| bid.matches(die)).count() as u32
}

/// One seat in a running game.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub dice: Vec<u8>,
    pub dice_count: u8,
}

impl GamePlayer {
    pub fn is_eliminated(&self) -> bool {
        self.dice_count == 0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub current_player: usize,
    pub current_bid: Option<Bid>,
    pub players: Vec<GamePlayer>,
}

/// Full room view pushed to every member. Carries every seat's dice; the
/// password never leaves the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub name: String,
    pub locked: bool,
    pub capacity: u8,
    pub players: Vec<Player>,
    pub game: Option<GameSnapshot>,
}

/// Lobby list entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: String,
    pub locked: bool,
    pub capacity: u8,
    pub players: Vec<Player>,
    pub in_game: bool,
}

/// Result of a settled doubt: who lost a die, who acts next, and how many
/// dice matched the bid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub user: GamePlayer,
    pub next_player: GamePlayer,
    pub total_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientAction {
    CreateRoom {
        name: String,
        password: Option<String>,
        player: PlayerInfo,
        capacity: u8,
    },
    JoinRoom {
        name: String,
        password: Option<String>,
        player: PlayerInfo,
    },
    LeaveDelay {
        name: String,
        id: PlayerId,
    },
    LeaveImmediate {
        name: String,
        id: PlayerId,
    },
    RaiseBid {
        room_name: String,
        bid: Bid,
    },
    Doubt {
        room_name: String,
    },
    Watch {
        id: PlayerId,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    RoomList { rooms: Vec<RoomSummary> },
    Room { room: RoomSnapshot },
    Error { message: String },
    Forbidden,
    Prestart,
    Restart { room: RoomSnapshot },
    Raised { bid: Bid, next_player: GamePlayer },
    EndRound(RoundOutcome),
    Eliminated(RoundOutcome),
    Win { user: GamePlayer, total_count: Option<u32> },
}
