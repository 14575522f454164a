use thiserror::Error;

/// Reasons a player action is rejected. A rejected action never mutates
/// room or game state; the requester is told why and nobody else hears of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room already exists")]
    RoomAlreadyExists,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Wrong room password")]
    Forbidden,
    #[error("Room is full")]
    RoomFull,
    #[error("Invalid room: {0}")]
    InvalidRoom(String),
    #[error("No game is running in this room")]
    NoActiveGame,
    #[error("There is no bid to doubt")]
    NoActiveBid,
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Invalid bid: {0}")]
    InvalidBid(String),
    #[error("Connection is not bound to a player")]
    UnknownPlayer,
}
