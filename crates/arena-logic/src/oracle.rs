//! Randomness oracle boundary
//!
//! `start` issues a request and returns; the word arrives later through
//! `MatchRegistry::fulfill_randomness`, possibly after the match has already
//! been resolved some other way.

use std::collections::VecDeque;

use crate::error::ArenaError;
use crate::random::SeededRng;
use crate::types::{MatchId, RequestId};

pub trait RandomnessOracle {
    /// Queue a randomness request for `match_id`
    fn request(&mut self, match_id: MatchId) -> Result<RequestId, ArenaError>;
}

/// Randomness word taken from the first 8 bytes of a 32-byte VRF output
pub fn word_from_randomness(randomness: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&randomness[..8]);
    u64::from_le_bytes(bytes)
}

/// Deterministic in-process oracle for simulations and tests.
///
/// Requests are queued in order; `next_delivery` produces the word for the
/// oldest one. Nothing is delivered automatically.
#[derive(Clone, Debug)]
pub struct SeededOracle {
    rng: SeededRng,
    next_request_id: RequestId,
    pending: VecDeque<(RequestId, MatchId)>,
}

impl SeededOracle {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: SeededRng::new(&seed, 0),
            next_request_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &(RequestId, MatchId)> {
        self.pending.iter()
    }

    /// Pop the oldest request and produce its word
    pub fn next_delivery(&mut self) -> Option<(RequestId, u64)> {
        let (request_id, _) = self.pending.pop_front()?;
        let word = word_from_randomness(&self.rng.next_bytes32());
        Some((request_id, word))
    }
}

impl RandomnessOracle for SeededOracle {
    fn request(&mut self, match_id: MatchId) -> Result<RequestId, ArenaError> {
        let request_id = self.next_request_id;
        self.next_request_id = request_id.checked_add(1).ok_or(ArenaError::Overflow)?;
        self.pending.push_back((request_id, match_id));
        Ok(request_id)
    }
}
