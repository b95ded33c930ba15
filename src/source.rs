//! Frame sources and edge-triggered polling.
//!
//! The camera pipeline produces one frame pair per tick, but a dedicated hand-tracking sensor runs
//! at its own rate. The sensor exposes a monotonically increasing frame index, and its landmarks
//! must only be read when that index has advanced. Otherwise the same reading would be consumed
//! twice.

use crate::landmark::FramePair;

/// A source of hand landmark frames.
pub trait FrameSource {
    /// Returns the index of the most recent frame the source has produced.
    ///
    /// The index must never decrease.
    fn frame_index(&self) -> u64;

    /// Reads the landmarks of the most recent frame.
    fn read(&mut self) -> anyhow::Result<FramePair>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_index(&self) -> u64 {
        (**self).frame_index()
    }

    fn read(&mut self) -> anyhow::Result<FramePair> {
        (**self).read()
    }
}

/// Wraps a [`FrameSource`] and only reads from it when its frame index advances.
///
/// Between new frames, the last reading is repeated.
pub struct EdgeTriggered<S> {
    source: S,
    last_index: Option<u64>,
    latest: FramePair,
}

impl<S: FrameSource> EdgeTriggered<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_index: None,
            latest: FramePair::ABSENT,
        }
    }

    /// Reads from the source if it has produced a frame since the last read.
    ///
    /// Returns whether a new frame was consumed.
    pub fn poll(&mut self) -> anyhow::Result<bool> {
        let index = self.source.frame_index();
        if self.last_index.map_or(false, |last| index <= last) {
            return Ok(false);
        }

        self.latest = self.source.read()?;
        self.last_index = Some(index);
        Ok(true)
    }

    /// Returns the most recently consumed frame pair.
    ///
    /// Before the first frame is consumed, or after [`EdgeTriggered::reset`], this is
    /// [`FramePair::ABSENT`].
    pub fn latest(&self) -> &FramePair {
        &self.latest
    }

    /// Polls the source and returns the latest frame pair.
    pub fn next_pair(&mut self) -> anyhow::Result<FramePair> {
        self.poll()?;
        Ok(self.latest)
    }

    /// Forgets the latest reading.
    ///
    /// The frame index is kept, so a stale frame is not read again after a reset.
    pub fn reset(&mut self) {
        self.latest = FramePair::ABSENT;
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
