//! The reference corpus and per-cycle distance scores.
//!
//! A [`ReferenceCorpus`] holds two parallel collections of named reference gestures, one per
//! [`Modality`]. It is built once (usually by [`crate::dataset`]) and never changes afterwards.
//!
//! Distances between a recording and the references are not stored in the corpus. Instead, each
//! scoring pass produces a [`CorpusScores`] record with one distance per entry, which is then
//! ranked and handed to [`crate::fusion`].

use std::fmt;

use itertools::Itertools;

use crate::{dtw::Aligner, num::TotalF32, sequence::GestureSequence};

/// One of the two independent sensing sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Landmarks estimated from a camera image by a pose estimator.
    Camera,
    /// Landmarks reported by a dedicated hand-tracking sensor.
    Sensor,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Camera, Modality::Sensor];

    /// Returns the lowercase name of the modality, as used in dataset paths.
    pub fn name(self) -> &'static str {
        match self {
            Modality::Camera => "camera",
            Modality::Sensor => "sensor",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named reference gesture.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    name: String,
    sequence: GestureSequence,
}

impl ReferenceEntry {
    pub fn new(name: impl Into<String>, sequence: GestureSequence) -> Self {
        Self {
            name: name.into(),
            sequence,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sequence(&self) -> &GestureSequence {
        &self.sequence
    }
}

/// The library of reference gestures for both modalities.
///
/// Both collections should contain the same gesture names, but this is not enforced: a gesture that
/// only exists for one modality simply contributes to that modality's ranking alone.
#[derive(Debug, Default, Clone)]
pub struct ReferenceCorpus {
    camera: Vec<ReferenceEntry>,
    sensor: Vec<ReferenceEntry>,
}

impl ReferenceCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference gesture to the collection of `modality`.
    ///
    /// Insertion order is significant: it breaks ties between equal distances when ranking.
    pub fn push(&mut self, modality: Modality, entry: ReferenceEntry) {
        self.entries_mut(modality).push(entry);
    }

    pub fn entries(&self, modality: Modality) -> &[ReferenceEntry] {
        match modality {
            Modality::Camera => &self.camera,
            Modality::Sensor => &self.sensor,
        }
    }

    fn entries_mut(&mut self, modality: Modality) -> &mut Vec<ReferenceEntry> {
        match modality {
            Modality::Camera => &mut self.camera,
            Modality::Sensor => &mut self.sensor,
        }
    }

    /// Returns the total number of entries across both modalities.
    pub fn len(&self) -> usize {
        self.camera.len() + self.sensor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.camera.is_empty() && self.sensor.is_empty()
    }

    /// Returns every gesture name of `modality` along with its number of reference instances.
    ///
    /// Names are returned in order of first insertion.
    pub fn name_counts(&self, modality: Modality) -> Vec<(&str, usize)> {
        let counts = self.entries(modality).iter().map(|e| e.name()).counts();
        self.entries(modality)
            .iter()
            .map(|e| e.name())
            .unique()
            .map(|name| (name, counts[name]))
            .collect()
    }
}

/// Distances between one recording and every entry of a [`ReferenceCorpus`].
///
/// Distances are stored in the same order as the corpus entries they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusScores {
    camera: Vec<f32>,
    sensor: Vec<f32>,
}

impl CorpusScores {
    /// Creates a score record for `corpus` with every distance set to 0.
    pub fn zeroed(corpus: &ReferenceCorpus) -> Self {
        Self {
            camera: vec![0.0; corpus.camera.len()],
            sensor: vec![0.0; corpus.sensor.len()],
        }
    }

    /// Aligns a recording against every reference in `corpus`.
    ///
    /// `camera` is compared against the camera references, `sensor` against the sensor references.
    pub fn compute(
        aligner: &mut Aligner,
        corpus: &ReferenceCorpus,
        camera: &GestureSequence,
        sensor: &GestureSequence,
    ) -> Self {
        let mut scores = Self::zeroed(corpus);
        scores.assign(aligner, corpus, Modality::Camera, camera);
        scores.assign(aligner, corpus, Modality::Sensor, sensor);
        scores
    }

    fn assign(
        &mut self,
        aligner: &mut Aligner,
        corpus: &ReferenceCorpus,
        modality: Modality,
        recorded: &GestureSequence,
    ) {
        let distances = self.distances_mut(modality);
        for (entry, distance) in corpus.entries(modality).iter().zip(distances.iter_mut()) {
            *distance = aligner.distance(recorded, entry.sequence());
            log::trace!("{modality} '{}': {}", entry.name(), *distance);
        }
    }

    pub fn distances(&self, modality: Modality) -> &[f32] {
        match modality {
            Modality::Camera => &self.camera,
            Modality::Sensor => &self.sensor,
        }
    }

    fn distances_mut(&mut self, modality: Modality) -> &mut [f32] {
        match modality {
            Modality::Camera => &mut self.camera,
            Modality::Sensor => &mut self.sensor,
        }
    }

    /// Sets every distance of both modalities to 0.
    pub fn reset_distances(&mut self) {
        self.camera.fill(0.0);
        self.sensor.fill(0.0);
    }

    /// Returns the sum of all distances of `modality`.
    pub fn total(&self, modality: Modality) -> f32 {
        self.distances(modality).iter().sum()
    }

    /// Returns the `top_k` best-matching entries of `modality`, best match first.
    ///
    /// Entries are sorted by ascending distance. Entries with equal distance keep their insertion
    /// order.
    pub fn rank<'a>(
        &self,
        corpus: &'a ReferenceCorpus,
        modality: Modality,
        top_k: usize,
    ) -> Vec<Ranked<'a>> {
        let entries = corpus.entries(modality);
        let distances = self.distances(modality);
        debug_assert_eq!(entries.len(), distances.len(), "scores belong to another corpus");

        let mut ranked = entries
            .iter()
            .zip(distances)
            .enumerate()
            .map(|(index, (entry, &distance))| Ranked {
                name: entry.name(),
                distance,
                index,
            })
            .collect::<Vec<_>>();
        // `sort_by_key` is stable.
        ranked.sort_by_key(|r| TotalF32(r.distance));
        ranked.truncate(top_k);
        if let Some(best) = ranked.first() {
            log::trace!(
                "best {modality} match: '{}' (entry #{}) at {}",
                best.name,
                best.index,
                best.distance,
            );
        }
        ranked
    }
}

/// A corpus entry's position in a ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    /// Gesture name of the entry.
    pub name: &'a str,
    /// Distance between the recording and the entry.
    pub distance: f32,
    /// Index of the entry in its corpus collection.
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{FramePair, LandmarkFrame, FRAME_LEN};

    fn constant(x: f32, len: usize) -> GestureSequence {
        let frame = LandmarkFrame::new([x; FRAME_LEN]);
        GestureSequence::from_pairs(std::iter::repeat(FramePair::new(frame, frame)).take(len))
    }

    fn corpus() -> ReferenceCorpus {
        let mut corpus = ReferenceCorpus::new();
        for (name, x) in [("b", 2.0), ("a", 1.0), ("c", 1.0), ("a", 3.0)] {
            corpus.push(Modality::Camera, ReferenceEntry::new(name, constant(x, 4)));
            corpus.push(Modality::Sensor, ReferenceEntry::new(name, constant(-x, 4)));
        }
        corpus
    }

    #[test]
    fn rank_is_stable() {
        let corpus = corpus();
        let recorded = constant(0.0, 4);
        let scores = CorpusScores::compute(&mut Aligner::new(), &corpus, &recorded, &recorded);

        let ranked = scores.rank(&corpus, Modality::Camera, 30);
        let names = ranked.iter().map(|r| r.name).collect::<Vec<_>>();
        // "a" and "c" are equally far away; "a" was inserted first
        assert_eq!(names, ["a", "c", "b", "a"]);
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[1].index, 2);
        assert_eq!(ranked[0].distance, ranked[1].distance);

        let top2 = scores.rank(&corpus, Modality::Sensor, 2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].name, "a");
    }

    #[test]
    fn reset_zeroes_both_modalities() {
        let corpus = corpus();
        let recorded = constant(0.5, 4);
        let mut scores = CorpusScores::compute(&mut Aligner::new(), &corpus, &recorded, &recorded);
        assert!(scores.total(Modality::Camera) > 0.0);
        assert!(scores.total(Modality::Sensor) > 0.0);

        scores.reset_distances();
        for modality in Modality::ALL {
            assert_eq!(scores.distances(modality).len(), 4);
            assert!(scores.distances(modality).iter().all(|&d| d == 0.0));
        }
        assert_eq!(scores, CorpusScores::zeroed(&corpus));
    }

    #[test]
    fn name_counts_in_insertion_order() {
        let corpus = corpus();
        assert_eq!(
            corpus.name_counts(Modality::Camera),
            [("b", 1), ("a", 2), ("c", 1)]
        );
        assert_eq!(corpus.len(), 8);
    }

    #[test]
    fn empty_corpus_ranks_nothing() {
        let corpus = ReferenceCorpus::new();
        let scores = CorpusScores::zeroed(&corpus);
        assert!(corpus.is_empty());
        assert!(scores.rank(&corpus, Modality::Camera, 30).is_empty());
    }
}
