//! Gesture sequences: time-ordered landmark frames for both hands.

use std::{error::Error, fmt};

use crate::landmark::{FramePair, Hand, LandmarkFrame};

/// A recorded or reference gesture.
///
/// Holds one frame sequence per hand. Both sequences always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSequence {
    left: Vec<LandmarkFrame>,
    right: Vec<LandmarkFrame>,
}

impl GestureSequence {
    /// Creates a gesture from per-hand frame sequences.
    ///
    /// Returns an error if the two hands have a different number of frames.
    pub fn new(
        left: Vec<LandmarkFrame>,
        right: Vec<LandmarkFrame>,
    ) -> Result<Self, SequenceError> {
        if left.len() != right.len() {
            return Err(SequenceError {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(Self { left, right })
    }

    /// Creates a gesture from a sequence of per-tick frame pairs.
    pub fn from_pairs<I: IntoIterator<Item = FramePair>>(pairs: I) -> Self {
        let (left, right) = pairs.into_iter().map(|p| (p.left, p.right)).unzip();
        Self { left, right }
    }

    /// Returns the number of frames (per hand).
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn hand(&self, hand: Hand) -> &[LandmarkFrame] {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    #[inline]
    pub fn left(&self) -> &[LandmarkFrame] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[LandmarkFrame] {
        &self.right
    }

    /// Counts the frames in which `hand` was not detected.
    pub fn absent_count(&self, hand: Hand) -> usize {
        self.hand(hand).iter().filter(|f| f.is_absent()).count()
    }
}

/// Error returned when the two hands of a [`GestureSequence`] have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceError {
    left: usize,
    right: usize,
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hand sequences differ in length (left: {}, right: {})",
            self.left, self.right
        )
    }
}

impl Error for SequenceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unequal_hands() {
        let err = GestureSequence::new(vec![LandmarkFrame::ABSENT; 3], vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "hand sequences differ in length (left: 3, right: 0)"
        );
    }

    #[test]
    fn counts_absent_frames() {
        let present = LandmarkFrame::new([1.0; 63]);
        let seq = GestureSequence::from_pairs([
            FramePair::new(LandmarkFrame::ABSENT, present),
            FramePair::new(LandmarkFrame::ABSENT, LandmarkFrame::ABSENT),
            FramePair::new(present, present),
        ]);
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.absent_count(Hand::Left), 2);
        assert_eq!(seq.absent_count(Hand::Right), 1);
    }
}
