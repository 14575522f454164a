//! Authoritative dice table for one room.
//!
//! `Game` holds the seats, the turn pointer and the standing bid. It knows the
//! rules (dealing, raising, settling a doubt, dropping a seat) but nothing
//! about rooms or connections; the engine in `engine.rs` decides what to tell
//! whom.

use crate::error::GameError;
use log::{debug, info};
use rand::Rng;
use shared::{
    count_matches, Bid, GamePlayer, GameSnapshot, Player, RoundOutcome, DIE_FACES, STARTING_DICE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub current_player: usize,
    pub current_bid: Option<Bid>,
    pub players: Vec<GamePlayer>,
}

/// What happened when a doubt was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: RoundOutcome,
    pub bid_held: bool,
    pub eliminated: bool,
    /// Set when only one seat is left; the game is over and was not re-rolled.
    pub winner: Option<GamePlayer>,
}

fn roll_dice<R: Rng>(rng: &mut R, count: u8) -> Vec<u8> {
    (0..count).map(|_| rng.gen_range(1..=DIE_FACES)).collect()
}

impl Game {
    /// Seats every member in join order with a fresh hand.
    pub fn deal<R: Rng>(members: &[Player], rng: &mut R) -> Self {
        let players = members
            .iter()
            .map(|member| GamePlayer {
                id: member.id.clone(),
                name: member.name.clone(),
                dice: roll_dice(rng, STARTING_DICE),
                dice_count: STARTING_DICE,
            })
            .collect();

        Self {
            current_player: 0,
            current_bid: None,
            players,
        }
    }

    /// Re-rolls every hand, keeping each seat's dice count.
    pub fn roll<R: Rng>(&mut self, rng: &mut R) {
        for player in &mut self.players {
            player.dice = roll_dice(rng, player.dice_count);
        }
    }

    pub fn current(&self) -> Option<&GamePlayer> {
        self.players.get(self.current_player)
    }

    pub fn is_turn_of(&self, player_id: &str) -> bool {
        self.current().is_some_and(|p| p.id == player_id)
    }

    pub fn position_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    /// Dice on the table that count toward `bid`.
    pub fn match_count(&self, bid: &Bid) -> u32 {
        self.players
            .iter()
            .map(|p| count_matches(&p.dice, bid.value))
            .sum()
    }

    pub fn total_dice(&self) -> u32 {
        self.players.iter().map(|p| u32::from(p.dice_count)).sum()
    }

    /// Replaces the standing bid and passes the turn. With `strict` set the
    /// new bid must outrank the standing one.
    pub fn raise(&mut self, bid: Bid, strict: bool) -> Result<&GamePlayer, GameError> {
        if self.players.is_empty() {
            return Err(GameError::NoActiveGame);
        }
        if !bid.is_valid() {
            return Err(GameError::InvalidBid(format!(
                "face must be 1-{} and count at least 1",
                DIE_FACES
            )));
        }
        let on_table = self.total_dice();
        if bid.count > on_table {
            return Err(GameError::InvalidBid(format!(
                "only {} dice on the table",
                on_table
            )));
        }
        if strict {
            if let Some(previous) = self.current_bid {
                if !bid.outranks(&previous) {
                    return Err(GameError::InvalidBid(format!(
                        "must raise {} x {}",
                        previous.count, previous.value
                    )));
                }
            }
        }

        self.current_bid = Some(bid);
        self.current_player = (self.current_player + 1) % self.players.len();
        debug!(
            "Bid {} x {} placed, {} to act",
            bid.count, bid.value, self.players[self.current_player].id
        );
        Ok(&self.players[self.current_player])
    }

    /// Settles a doubt raised by the current player against the standing bid.
    ///
    /// If the bid holds the challenger loses a die and the seat after them
    /// opens the next round; otherwise the bidder loses a die and the
    /// challenger opens. A seat at zero dice leaves the table. Unless a single
    /// seat remains, every hand is re-rolled and the bid cleared.
    pub fn settle_doubt<R: Rng>(&mut self, rng: &mut R) -> Result<Settlement, GameError> {
        let bid = self.current_bid.ok_or(GameError::NoActiveBid)?;
        let seats = self.players.len();
        if seats == 0 {
            return Err(GameError::NoActiveGame);
        }

        let total_count = self.match_count(&bid);
        let bid_held = bid.holds(total_count);
        let current = self.current_player % seats;
        let (loser, next) = if bid_held {
            (current, (current + 1) % seats)
        } else {
            ((current + seats - 1) % seats, current)
        };

        let seat = &mut self.players[loser];
        seat.dice_count = seat.dice_count.saturating_sub(1);
        let eliminated = seat.is_eliminated();

        let outcome = RoundOutcome {
            user: self.players[loser].clone(),
            next_player: self.players[next].clone(),
            total_count,
        };
        let next_id = outcome.next_player.id.clone();

        if eliminated {
            let removed = self.players.remove(loser);
            info!("Player {} is out of dice", removed.id);
        }

        if self.players.len() == 1 {
            return Ok(Settlement {
                outcome,
                bid_held,
                eliminated,
                winner: self.players.first().cloned(),
            });
        }

        self.roll(rng);
        self.current_player = self.position_of(&next_id).unwrap_or(0);
        self.current_bid = None;

        Ok(Settlement {
            outcome,
            bid_held,
            eliminated,
            winner: None,
        })
    }

    /// Drops a seat and keeps the turn pointer on the same logical player
    /// (or on the seat that slid into a removed current player's place). The
    /// standing bid is voided.
    pub fn remove_player(&mut self, player_id: &str) -> Option<GamePlayer> {
        let index = self.position_of(player_id)?;
        let removed = self.players.remove(index);

        if index < self.current_player {
            self.current_player -= 1;
        }
        if self.current_player >= self.players.len() {
            self.current_player = 0;
        }
        self.current_bid = None;

        Some(removed)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            current_player: self.current_player,
            current_bid: self.current_bid,
            players: self.players.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::PlayerInfo;

    fn members(ids: &[&str]) -> Vec<Player> {
        ids.iter()
            .map(|id| PlayerInfo::new(*id, id.to_uppercase()).into())
            .collect()
    }

    fn rigged(hands: &[(&str, Vec<u8>)]) -> Game {
        Game {
            current_player: 0,
            current_bid: None,
            players: hands
                .iter()
                .map(|(id, dice)| GamePlayer {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    dice_count: dice.len() as u8,
                    dice: dice.clone(),
                })
                .collect(),
        }
    }

    fn assert_hands_consistent(game: &Game) {
        for player in &game.players {
            assert_eq!(player.dice.len(), player.dice_count as usize);
            assert!(player.dice.iter().all(|d| (1..=6).contains(d)));
        }
    }

    #[test]
    fn test_deal_seats_members_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let game = Game::deal(&members(&["a", "b", "c"]), &mut rng);

        assert_eq!(game.current_player, 0);
        assert_eq!(game.current_bid, None);
        let ids: Vec<_> = game.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(game.players.iter().all(|p| p.dice_count == STARTING_DICE));
        assert_hands_consistent(&game);
    }

    #[test]
    fn test_raise_passes_turn() {
        let mut game = rigged(&[("a", vec![2; 5]), ("b", vec![3; 5])]);

        let next = game.raise(Bid::new(3, 4), true).unwrap().id.clone();
        assert_eq!(next, "b");
        assert_eq!(game.current_player, 1);
        assert_eq!(game.current_bid, Some(Bid::new(3, 4)));

        game.raise(Bid::new(3, 5), true).unwrap();
        assert_eq!(game.current_player, 0);
    }

    #[test]
    fn test_raise_rejects_lower_bid_when_strict() {
        let mut game = rigged(&[("a", vec![2; 5]), ("b", vec![3; 5])]);
        game.raise(Bid::new(4, 4), true).unwrap();

        let err = game.raise(Bid::new(3, 4), true).unwrap_err();
        assert!(matches!(err, GameError::InvalidBid(_)));
        assert_eq!(game.current_bid, Some(Bid::new(4, 4)));
        assert_eq!(game.current_player, 1);

        game.raise(Bid::new(3, 4), false).unwrap();
        assert_eq!(game.current_bid, Some(Bid::new(3, 4)));
    }

    #[test]
    fn test_raise_rejects_malformed_bid() {
        let mut game = rigged(&[("a", vec![2; 5]), ("b", vec![3; 5])]);
        assert!(game.raise(Bid::new(7, 2), false).is_err());
        assert!(game.raise(Bid::new(2, 0), false).is_err());
        assert_eq!(game.current_player, 0);
    }

    #[test]
    fn test_raise_rejects_count_above_dice_on_table() {
        let mut game = rigged(&[("a", vec![2; 5]), ("b", vec![3])]);

        let err = game.raise(Bid::new(6, u32::MAX), false).unwrap_err();
        assert!(matches!(err, GameError::InvalidBid(_)));
        assert!(game.raise(Bid::new(6, 7), false).is_err());
        assert_eq!(game.current_bid, None);
        assert_eq!(game.current_player, 0);

        game.raise(Bid::new(6, 6), true).unwrap();
        assert_eq!(game.current_bid, Some(Bid::new(6, 6)));
    }

    #[test]
    fn test_doubt_without_bid_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = rigged(&[("a", vec![2; 5]), ("b", vec![3; 5])]);
        assert_eq!(game.settle_doubt(&mut rng), Err(GameError::NoActiveBid));
    }

    #[test]
    fn test_true_bid_costs_challenger_a_die() {
        let mut rng = StdRng::seed_from_u64(1);
        // Exactly four threes-or-ones on the table.
        let mut game = rigged(&[("a", vec![3, 3, 2, 5, 6]), ("b", vec![1, 3, 4, 4, 6])]);
        game.raise(Bid::new(3, 4), true).unwrap();

        let settlement = game.settle_doubt(&mut rng).unwrap();

        assert!(settlement.bid_held);
        assert!(!settlement.eliminated);
        assert_eq!(settlement.outcome.total_count, 4);
        assert_eq!(settlement.outcome.user.id, "b");
        assert_eq!(settlement.outcome.user.dice_count, 4);
        assert_eq!(settlement.outcome.next_player.id, "a");
        assert_eq!(game.players[1].dice_count, 4);
        assert_eq!(game.players[0].dice_count, 5);
        assert_eq!(game.current_player, 0);
        assert_eq!(game.current_bid, None);
        assert_hands_consistent(&game);
    }

    #[test]
    fn test_false_bid_costs_bidder_a_die() {
        let mut rng = StdRng::seed_from_u64(1);
        // Only three threes-or-ones.
        let mut game = rigged(&[("a", vec![3, 3, 2, 5, 6]), ("b", vec![1, 2, 4, 4, 6])]);
        game.raise(Bid::new(3, 4), true).unwrap();

        let settlement = game.settle_doubt(&mut rng).unwrap();

        assert!(!settlement.bid_held);
        assert_eq!(settlement.outcome.total_count, 3);
        assert_eq!(settlement.outcome.user.id, "a");
        assert_eq!(settlement.outcome.next_player.id, "b");
        assert_eq!(game.players[0].dice_count, 4);
        assert_eq!(game.players[1].dice_count, 5);
        assert_eq!(game.current_player, 1);
        assert_hands_consistent(&game);
    }

    #[test]
    fn test_last_die_lost_leaves_sole_winner() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = rigged(&[("a", vec![6]), ("b", vec![2, 2])]);
        game.raise(Bid::new(6, 3), true).unwrap();

        let settlement = game.settle_doubt(&mut rng).unwrap();

        assert!(settlement.eliminated);
        assert_eq!(settlement.outcome.user.id, "a");
        assert_eq!(settlement.outcome.user.dice_count, 0);
        assert_eq!(settlement.winner.map(|w| w.id), Some("b".to_string()));
        assert_eq!(game.players.len(), 1);
    }

    #[test]
    fn test_elimination_keeps_turn_on_next_player() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = rigged(&[("a", vec![4, 4]), ("b", vec![5]), ("c", vec![2, 2, 2])]);
        // b bid three fives, c doubts; only one five is on the table.
        game.current_player = 2;
        game.current_bid = Some(Bid::new(5, 3));

        let settlement = game.settle_doubt(&mut rng).unwrap();

        assert!(!settlement.bid_held);
        assert!(settlement.eliminated);
        assert_eq!(settlement.winner, None);
        assert_eq!(settlement.outcome.user.id, "b");
        assert_eq!(settlement.outcome.next_player.id, "c");
        let ids: Vec<_> = game.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(game.current().map(|p| p.id.as_str()), Some("c"));
        assert_hands_consistent(&game);
    }

    #[test]
    fn test_each_doubt_removes_exactly_one_die() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = Game::deal(&members(&["a", "b", "c"]), &mut rng);

        for _ in 0..10 {
            let before = game.total_dice();
            game.raise(Bid::new(6, 2), false).unwrap();
            let settlement = game.settle_doubt(&mut rng).unwrap();

            assert_eq!(game.total_dice(), before - 1);
            assert!(game.players.iter().all(|p| p.dice_count <= STARTING_DICE));
            if settlement.winner.is_some() {
                break;
            }
            assert_hands_consistent(&game);
        }
    }

    #[test]
    fn test_remove_player_before_pointer_shifts_it() {
        let mut game = rigged(&[("a", vec![1]), ("b", vec![2]), ("c", vec![3])]);
        game.current_player = 2;
        game.current_bid = Some(Bid::new(2, 1));

        let removed = game.remove_player("a").unwrap();

        assert_eq!(removed.id, "a");
        assert_eq!(game.current_player, 1);
        assert_eq!(game.current().map(|p| p.id.as_str()), Some("c"));
        assert_eq!(game.current_bid, None);
    }

    #[test]
    fn test_remove_current_last_player_wraps() {
        let mut game = rigged(&[("a", vec![1]), ("b", vec![2]), ("c", vec![3])]);
        game.current_player = 2;

        game.remove_player("c");

        assert_eq!(game.current_player, 0);
        assert_eq!(game.current().map(|p| p.id.as_str()), Some("a"));
    }

    #[test]
    fn test_remove_player_after_pointer_keeps_it() {
        let mut game = rigged(&[("a", vec![1]), ("b", vec![2]), ("c", vec![3])]);
        game.current_player = 1;

        game.remove_player("c");
        assert_eq!(game.current().map(|p| p.id.as_str()), Some("b"));
        assert!(game.remove_player("zz").is_none());
    }
}
