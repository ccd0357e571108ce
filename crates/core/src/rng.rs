//! RNG module - shared 7-bag piece sequence
//!
//! One sequence per room. It is append-only and grows one shuffled bag of seven at a
//! time; every player reads it through their own cursor (`piece_index`), so two
//! players at the same index always see the same piece.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::player::PlayerState;
use crate::types::PieceKind;

/// RNG used for bag shuffling; injectable so tests can pin exact bag orders
pub type GameRng = StdRng;

const BAG_SIZE: usize = 7;

#[derive(Debug, Clone)]
pub struct PieceSequence {
    pieces: Vec<PieceKind>,
    rng: GameRng,
}

impl PieceSequence {
    /// Empty sequence drawing from `rng`. Bags are added lazily.
    pub fn new(rng: GameRng) -> Self {
        Self {
            pieces: Vec::with_capacity(BAG_SIZE * 4),
            rng,
        }
    }

    /// Deterministic sequence for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::new(GameRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(GameRng::from_entropy())
    }

    /// Append one Fisher-Yates shuffled permutation of the seven kinds
    pub fn push_bag(&mut self) {
        let mut bag = PieceKind::ALL;
        for i in (1..bag.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            bag.swap(i, j);
        }
        self.pieces.extend_from_slice(&bag);
    }

    /// Forget every piece and start over with two fresh bags
    pub fn reset(&mut self) {
        self.pieces.clear();
        self.push_bag();
        self.push_bag();
    }

    fn ensure(&mut self, index: usize) {
        while index >= self.pieces.len() {
            self.push_bag();
        }
    }

    /// Piece at the player's cursor; advances the cursor
    pub fn next_for(&mut self, player: &mut PlayerState) -> PieceKind {
        let kind = self.peek(player.piece_index);
        player.piece_index += 1;
        kind
    }

    /// Lookahead without moving any cursor; extends the sequence if needed
    pub fn peek(&mut self, index: usize) -> PieceKind {
        self.ensure(index);
        self.pieces[index]
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Generated pieces so far, oldest first
    pub fn as_slice(&self) -> &[PieceKind] {
        &self.pieces
    }
}
