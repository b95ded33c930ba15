//! Dynamic Time Warping.
//!
//! Compares two landmark sequences of possibly different lengths by finding the monotonic
//! alignment between their frames that minimizes the summed Euclidean frame distance. Lower
//! distances mean more similar motion; identical sequences have a distance of 0.
//!
//! The result is the absolute cumulative cost of the best path. It is *not* normalized by the path
//! length, so longer references tend to produce larger distances.

use crate::{
    landmark::{Hand, LandmarkFrame},
    sequence::GestureSequence,
};

/// A DTW sequence aligner.
///
/// Keeps its cost matrix around between invocations, since a single scoring pass aligns the
/// recorded window against every reference in the corpus.
#[derive(Debug, Default, Clone)]
pub struct Aligner {
    cost: Vec<f32>,
}

impl Aligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the DTW distance between two frame sequences.
    ///
    /// If exactly one of the sequences is empty, no alignment exists and the distance is infinite.
    /// Two empty sequences have a distance of 0.
    pub fn align(&mut self, a: &[LandmarkFrame], b: &[LandmarkFrame]) -> f32 {
        let rows = a.len() + 1;
        let cols = b.len() + 1;

        // Cell (i, j) holds the cost of the best path aligning `a[..i]` with `b[..j]`.
        self.cost.clear();
        self.cost.resize(rows * cols, f32::INFINITY);
        self.cost[0] = 0.0;

        for i in 1..rows {
            for j in 1..cols {
                let frame_cost = a[i - 1].distance(&b[j - 1]);
                let insertion = self.cost[(i - 1) * cols + j];
                let deletion = self.cost[i * cols + j - 1];
                let matched = self.cost[(i - 1) * cols + j - 1];
                self.cost[i * cols + j] = frame_cost + insertion.min(deletion).min(matched);
            }
        }

        self.cost[rows * cols - 1]
    }

    /// Computes the distance of a single hand between two gestures.
    pub fn align_hand(
        &mut self,
        recorded: &GestureSequence,
        reference: &GestureSequence,
        hand: Hand,
    ) -> f32 {
        self.align(recorded.hand(hand), reference.hand(hand))
    }

    /// Computes the combined distance between two gestures.
    ///
    /// This is the sum of the left-hand and the right-hand distance. Both hands are weighted
    /// equally, regardless of how often each was detected.
    pub fn distance(&mut self, recorded: &GestureSequence, reference: &GestureSequence) -> f32 {
        self.align_hand(recorded, reference, Hand::Left)
            + self.align_hand(recorded, reference, Hand::Right)
    }
}

/// Computes the DTW distance between two frame sequences.
///
/// This allocates a fresh cost matrix. Use an [`Aligner`] when aligning many sequences.
pub fn dtw(a: &[LandmarkFrame], b: &[LandmarkFrame]) -> f32 {
    Aligner::new().align(a, b)
}
