//! Match Logic for Tic-Tac-Toe Arena
//!
//! Core rules for staked best-of-N tic-tac-toe matches between two players.
//! This crate is compiled to:
//! - Native (for the on-chain program and the off-chain registry)
//! - WASM (for frontend board and settlement previews)

mod board;
mod config;
mod deposit;
mod error;
mod escrow;
mod game;
mod oracle;
mod random;
mod registry;
mod relay;
mod rules;
mod types;

#[cfg(feature = "wasm")]
mod wasm;

pub use board::{has_line, Board, Mark, BOARD_SIZE, CELL_COUNT, LINES};
pub use config::{
    validate_rules, ArenaConfig, DEFAULT_HOUSE_FEE_BPS, DEFAULT_MAX_PRICE_AGE_SECS,
    DEFAULT_MAX_ROUNDS, DEFAULT_MAX_SLIPPAGE_BPS, DEFAULT_MOVE_TIMEOUT_SECS,
    DEFAULT_REFUND_WINDOW_SECS, DEFAULT_RELAY_FEE,
};
pub use deposit::{
    min_output, DepositRouter, PriceFeed, PriceFeedNormalizer, SwapExecutor, ValueNormalizer,
};
pub use error::{ArenaError, ErrorKind};
pub use escrow::{split_fee, EscrowLedger, Settlement, BPS_DENOMINATOR};
pub use game::{
    Disbursement, DisbursementKind, Match, MatchRules, MatchState, MoveOutcome, Player,
    RoundAdvance, MAX_PLAYERS,
};
pub use oracle::{word_from_randomness, RandomnessOracle, SeededOracle};
pub use random::SeededRng;
pub use registry::MatchRegistry;
pub use relay::{BatchReport, GasSponsorship};
pub use rules::{next_starter, other_seat, select_winner, RoundResult};
pub use types::{AssetId, Identity, MatchId, RequestId};

/// Seat (0 or 1) that opens round 1 for a randomness word
pub fn starter_from_word(word: u64) -> usize {
    (word % MAX_PLAYERS as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_from_word() {
        assert_eq!(starter_from_word(0), 0);
        assert_eq!(starter_from_word(7), 1);
        assert_eq!(starter_from_word(u64::MAX), 1);
    }

    #[test]
    fn test_registry_and_ledger_agree_after_random_play() {
        let config = ArenaConfig {
            owner: Identity([1; 32]),
            oracle: Identity([2; 32]),
            relay: Identity([3; 32]),
            max_rounds: 1,
            ..ArenaConfig::default()
        };
        let a = Identity([0xA; 32]);
        let b = Identity([0xB; 32]);
        let mut reg = MatchRegistry::new(config, SeededOracle::new([11; 32])).unwrap();
        let id = reg.create_match(0);
        reg.join(id, a, 10_000).unwrap();
        reg.join(id, b, 30_000).unwrap();
        reg.start(id).unwrap();
        let (request_id, word) = reg.oracle_mut().next_delivery().unwrap();
        reg.fulfill_randomness(Identity([2; 32]), request_id, word, 0).unwrap();

        // each mover picks a random empty cell until the round ends
        let mut rng = SeededRng::new(&[4; 32], 0);
        while reg.get_match(id).unwrap().state == MatchState::InProgress {
            let mover = reg.get_current_player(id).unwrap();
            let board = reg.get_board(id);
            let empty: Vec<(usize, usize)> = (0..BOARD_SIZE)
                .flat_map(|x| (0..BOARD_SIZE).map(move |y| (x, y)))
                .filter(|(x, y)| board.get(*x, *y) == Some(Mark::Empty))
                .collect();
            let (x, y) = empty[(rng.next_u64() % empty.len() as u64) as usize];
            reg.make_move(id, mover, x, y, 1).unwrap();
        }

        let m = reg.get_match(id).unwrap();
        match m.state {
            MatchState::Finished => {
                let winner = m.winner.unwrap();
                let s = reg.withdraw_prize(id, winner).unwrap();
                assert_eq!(s.gross, 40_000);
            }
            MatchState::Cancelled => {
                assert_eq!(reg.ledger().settled_balance(&a), 10_000);
                assert_eq!(reg.ledger().settled_balance(&b), 30_000);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(reg.ledger().balance_of(id), 0);
        assert!(reg.ledger().is_conserved());
    }
}
