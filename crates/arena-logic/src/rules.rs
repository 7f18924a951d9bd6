//! Round-to-round business rules
//!
//! Starter rotation and final winner selection are pinned rules: they are
//! kept here as pure functions so the chain program and the off-chain
//! registry resolve matches identically.

use crate::game::Player;

/// Outcome of a finished round, by roster seat
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundResult {
    Won(usize),
    Draw,
}

pub fn other_seat(seat: usize) -> usize {
    (seat + 1) % 2
}

/// Seat that starts the round after `finished_round`.
///
/// * draw: alternate from the starter of the finished round
/// * round 1 -> 2: if the original match starter won, alternate; else the winner starts
/// * later rounds: if the finished round's starter won, alternate; else the winner starts
///
/// With two seats every branch hands the next round to the other seat.
pub fn next_starter(
    finished_round: u8,
    result: RoundResult,
    match_starter: usize,
    last_round_starter: usize,
) -> usize {
    match result {
        RoundResult::Draw => other_seat(last_round_starter),
        RoundResult::Won(winner) if finished_round == 1 => {
            if winner == match_starter {
                other_seat(match_starter)
            } else {
                winner
            }
        }
        RoundResult::Won(winner) => {
            if winner == last_round_starter {
                other_seat(last_round_starter)
            } else {
                winner
            }
        }
    }
}

/// Seat of the match winner, or `None` when nobody won a single round.
///
/// Most round wins first, then the larger deposit, then the earlier roster
/// slot (first to join).
pub fn select_winner(players: &[Player]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (seat, player) in players.iter().enumerate() {
        best = match best {
            None => Some(seat),
            Some(current) => {
                let leader = &players[current];
                let ahead = (player.wins, player.deposited) > (leader.wins, leader.deposited);
                if ahead {
                    Some(seat)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.filter(|&seat| players[seat].wins > 0)
}
