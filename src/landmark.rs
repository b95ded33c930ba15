//! Hand landmark frames.
//!
//! Both sensing modalities deliver hands in the same shape: 21 keypoints with 3 coordinates each,
//! flattened into a single vector of 63 values. A hand that was not detected at some instant is
//! encoded as a frame in which every component is exactly `0.0`.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

/// Number of keypoints per hand.
pub const KEYPOINT_COUNT: usize = 21;

/// Number of values in one [`LandmarkFrame`].
pub const FRAME_LEN: usize = KEYPOINT_COUNT * 3;

/// The keypoints of one hand at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct LandmarkFrame {
    values: [f32; FRAME_LEN],
}

impl LandmarkFrame {
    /// The frame used to denote an undetected hand.
    pub const ABSENT: Self = Self {
        values: [0.0; FRAME_LEN],
    };

    #[inline]
    pub fn new(values: [f32; FRAME_LEN]) -> Self {
        Self { values }
    }

    /// Creates a frame from a slice, which must contain exactly [`FRAME_LEN`] values.
    ///
    /// Pose estimators report NaN for keypoints they could not place. Non-finite components are
    /// replaced with `0.0`.
    pub fn from_slice(values: &[f32]) -> Result<Self, FrameError> {
        let mut values: [f32; FRAME_LEN] = values
            .try_into()
            .map_err(|_| FrameError { len: values.len() })?;
        for v in &mut values {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        Ok(Self { values })
    }

    #[inline]
    pub fn values(&self) -> &[f32; FRAME_LEN] {
        &self.values
    }

    /// Returns the position of keypoint `index` as `[x, y, z]`.
    ///
    /// # Panics
    ///
    /// This method panics if `index` is not less than [`KEYPOINT_COUNT`].
    pub fn keypoint(&self, index: usize) -> [f32; 3] {
        let i = index * 3;
        [self.values[i], self.values[i + 1], self.values[i + 2]]
    }

    /// Returns whether this frame is the all-zero "hand absent" sentinel.
    ///
    /// This is an exact comparison. A frame with tiny non-zero components counts as present.
    pub fn is_absent(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Computes the Euclidean distance between two frames.
    pub fn distance(&self, other: &Self) -> f32 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self::ABSENT
    }
}

impl TryFrom<Vec<f32>> for LandmarkFrame {
    type Error = FrameError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<LandmarkFrame> for Vec<f32> {
    fn from(frame: LandmarkFrame) -> Self {
        frame.values.to_vec()
    }
}

/// Error returned when a frame does not have exactly [`FRAME_LEN`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameError {
    len: usize,
}

impl FrameError {
    /// The number of values the rejected frame had.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "landmark frame has {} values, expected {}",
            self.len, FRAME_LEN
        )
    }
}

impl Error for FrameError {}

/// Selects one of the two hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Returns the other hand.
    pub fn other(self) -> Self {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }
}

/// The left and right hand frames delivered by one sensor in one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePair {
    pub left: LandmarkFrame,
    pub right: LandmarkFrame,
}

impl FramePair {
    /// A pair in which neither hand was detected.
    pub const ABSENT: Self = Self {
        left: LandmarkFrame::ABSENT,
        right: LandmarkFrame::ABSENT,
    };

    #[inline]
    pub fn new(left: LandmarkFrame, right: LandmarkFrame) -> Self {
        Self { left, right }
    }

    /// Builds a pair from raw slices, validating both lengths.
    ///
    /// Non-finite components are replaced as by [`LandmarkFrame::from_slice`].
    pub fn from_slices(left: &[f32], right: &[f32]) -> Result<Self, FrameError> {
        Ok(Self {
            left: LandmarkFrame::from_slice(left)?,
            right: LandmarkFrame::from_slice(right)?,
        })
    }

    /// Builds a pair from a flat buffer holding the left hand followed by the right hand.
    ///
    /// Hand-tracking sensors commonly expose both hands as one contiguous array of 126 values.
    pub fn from_flat(values: &[f32]) -> Result<Self, FrameError> {
        if values.len() != FRAME_LEN * 2 {
            return Err(FrameError { len: values.len() });
        }
        let (left, right) = values.split_at(FRAME_LEN);
        Self::from_slices(left, right)
    }

    pub fn get(&self, hand: Hand) -> &LandmarkFrame {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}
