//! WASM bindings for frontend board and settlement previews

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::{next_starter, split_fee, Board, Mark, Match, RoundResult, CELL_COUNT};

#[derive(serde::Serialize)]
struct BoardStatus {
    x_wins: bool,
    o_wins: bool,
    full: bool,
    move_count: u8,
}

/// Evaluate a row-major board (0 empty, 1 X, 2 O)
///
/// Returns `{x_wins, o_wins, full, move_count}`.
#[wasm_bindgen]
pub fn board_status(cells: &[u8]) -> Result<JsValue, JsError> {
    let cells: [u8; CELL_COUNT] = cells
        .try_into()
        .map_err(|_| JsError::new("Board must be exactly 9 cells"))?;
    let move_count = cells.iter().filter(|c| **c != 0).count() as u8;
    let board = Board::from_bytes(&cells, move_count)
        .ok_or_else(|| JsError::new("Cells must be 0, 1 or 2"))?;

    let status = BoardStatus {
        x_wins: board.has_line(Mark::P1),
        o_wins: board.has_line(Mark::P2),
        full: board.is_full(),
        move_count,
    };
    serde_wasm_bindgen::to_value(&status)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Seat that starts the next round
///
/// `round_winner` is the winning seat, or any negative value for a draw.
#[wasm_bindgen]
pub fn next_round_starter(
    finished_round: u8,
    round_winner: i32,
    match_starter: u8,
    last_round_starter: u8,
) -> u8 {
    let result = if round_winner < 0 {
        RoundResult::Draw
    } else {
        RoundResult::Won(round_winner as usize)
    };
    next_starter(
        finished_round,
        result,
        match_starter as usize,
        last_round_starter as usize,
    ) as u8
}

#[derive(serde::Serialize)]
struct SettlementPreview {
    payout: u64,
    fee: u64,
}

/// Winner payout and protocol fee for a pot
#[wasm_bindgen]
pub fn settlement_preview(amount: u64, fee_bps: u16) -> Result<JsValue, JsError> {
    let (payout, fee) = split_fee(amount, fee_bps);
    serde_wasm_bindgen::to_value(&SettlementPreview { payout, fee })
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Seconds left in the current move window of a JSON serialized Match
#[wasm_bindgen]
pub fn match_time_remaining(match_json: &str, now: i64) -> Result<i64, JsError> {
    let m: Match = serde_json::from_str(match_json)
        .map_err(|e| JsError::new(&format!("Invalid match: {}", e)))?;
    Ok(m.time_remaining(now))
}
