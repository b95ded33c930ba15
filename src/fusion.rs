//! Fusion of the per-modality rankings into a single predicted gesture.
//!
//! Two heuristics are applied in order, and the first one that produces a label wins:
//!
//! 1. [`fast_path`]: if one gesture name clearly dominates the best camera matches and the sensor
//!    barely saw any hands during the recording, the camera's majority vote is trusted outright.
//! 2. [`fallback`]: the best candidates of each modality are scored by their mean distance, the
//!    scores of both modalities are weighted by how much hand data the modality recorded, and the
//!    gesture with the highest combined score wins.
//!
//! Raw DTW distances of the two modalities are not comparable (the sensors use different units), so
//! [`fallback`] rescales each modality's candidate distances to the unit interval first.

use itertools::Itertools;

use crate::{
    corpus::Ranked,
    landmark::Hand,
    num::TotalF32,
    sequence::GestureSequence,
};

/// Parameters of the fusion heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    /// Number of best-ranked entries per modality that are considered.
    pub batch_size: usize,
    /// Number of lowest-mean gesture names per modality that enter the fallback scoring.
    pub candidates: usize,
    /// How much more frequent the most common camera name has to be than the runner-up for the fast
    /// path to fire.
    pub dominance_ratio: f32,
    /// The fast path only fires when the sensor presence score is below this value.
    pub sensor_presence_threshold: f32,
}

impl FusionParams {
    pub const DEFAULT_BATCH_SIZE: usize = 30;
    pub const DEFAULT_CANDIDATES: usize = 4;
    pub const DEFAULT_DOMINANCE_RATIO: f32 = 1.5;
    pub const DEFAULT_SENSOR_PRESENCE_THRESHOLD: f32 = 0.2;
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            candidates: Self::DEFAULT_CANDIDATES,
            dominance_ratio: Self::DEFAULT_DOMINANCE_RATIO,
            sensor_presence_threshold: Self::DEFAULT_SENSOR_PRESENCE_THRESHOLD,
        }
    }
}

/// Presence scores of both modalities for one recording.
///
/// A presence score approximates the fraction of the recording window in which real hand data was
/// available. It is 1.0 when every expected hand was detected in every frame and 0.0 when none was.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presence {
    pub camera: f32,
    pub sensor: f32,
}

impl Presence {
    /// Computes the presence scores of a recorded window of `window_len` frames.
    ///
    /// If either modality never saw the `non_dominant` hand during the whole window, the gesture is
    /// treated as one-handed and both scores only consider the dominant hand. Otherwise both hands
    /// contribute half of the score each.
    pub fn compute(
        camera: &GestureSequence,
        sensor: &GestureSequence,
        window_len: usize,
        non_dominant: Hand,
    ) -> Self {
        if window_len == 0 {
            return Self {
                camera: 0.0,
                sensor: 0.0,
            };
        }

        let absent = |seq: &GestureSequence, hand: Hand| {
            debug_assert!(
                seq.len() <= window_len,
                "recorded {} frames in a window of {}",
                seq.len(),
                window_len,
            );
            seq.absent_count(hand).min(window_len)
        };
        let n = window_len as f32;
        let dominant = non_dominant.other();

        let one_handed = absent(camera, non_dominant) == window_len
            || absent(sensor, non_dominant) == window_len;
        let score = |seq: &GestureSequence| {
            if one_handed {
                1.0 - absent(seq, dominant) as f32 / n
            } else {
                (0.5 - absent(seq, dominant) as f32 / (2.0 * n))
                    + (0.5 - absent(seq, non_dominant) as f32 / (2.0 * n))
            }
        };

        Self {
            camera: score(camera),
            sensor: score(sensor),
        }
    }
}

/// Which heuristic produced a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPath {
    FastPath,
    Fallback,
}

/// The predicted gesture of one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub label: String,
    pub path: DecisionPath,
}

/// Runs both heuristics on the ranked entries and returns the first label produced.
///
/// `camera` and `sensor` are the rankings of the two modalities, best match first. Only the first
/// [`FusionParams::batch_size`] entries of each are considered.
///
/// Returns [`None`] only if both rankings are empty.
pub fn decide(
    camera: &[Ranked<'_>],
    sensor: &[Ranked<'_>],
    presence: Presence,
    params: &FusionParams,
) -> Option<Decision> {
    let camera = &camera[..camera.len().min(params.batch_size)];
    let sensor = &sensor[..sensor.len().min(params.batch_size)];

    if let Some(label) = fast_path(camera, presence.sensor, params) {
        return Some(Decision {
            label,
            path: DecisionPath::FastPath,
        });
    }

    fallback(camera, sensor, presence, params.candidates).map(|label| Decision {
        label,
        path: DecisionPath::Fallback,
    })
}

/// Returns the camera modality's majority vote if it is decisive and the sensor is unreliable.
///
/// The vote is decisive if the most frequent name in `camera` occurs more than
/// [`FusionParams::dominance_ratio`] times as often as the second most frequent one. If there is no
/// second name, its count is 0.
pub fn fast_path(camera: &[Ranked<'_>], sensor_presence: f32, params: &FusionParams) -> Option<String> {
    let frequencies = name_frequencies(camera);
    let &(first, first_count) = frequencies.first()?;
    let second_count = frequencies.get(1).map_or(0, |&(_, count)| count);

    log::trace!(
        "fast path: '{first}' x{first_count} vs. x{second_count}, sensor presence {sensor_presence}"
    );
    if first_count as f32 > second_count as f32 * params.dominance_ratio
        && sensor_presence < params.sensor_presence_threshold
    {
        Some(first.to_string())
    } else {
        None
    }
}

/// Combines the candidate scores of both modalities, weighted by presence.
///
/// Returns the name with the highest combined score. A name that is only a candidate in one
/// modality receives 0 from the other. Ties are resolved in favor of the name seen first, with
/// camera candidates coming before sensor-only candidates.
pub fn fallback(
    camera: &[Ranked<'_>],
    sensor: &[Ranked<'_>],
    presence: Presence,
    candidates: usize,
) -> Option<String> {
    let camera = rescale_reversed(&grouped_means(camera, candidates));
    let sensor = rescale_reversed(&grouped_means(sensor, candidates));

    let mut combined: Vec<(&str, f32)> = Vec::new();
    for (scores, weight) in [(camera, presence.camera), (sensor, presence.sensor)] {
        for (name, score) in scores {
            let weighted = score * weight;
            match combined.iter_mut().find(|(n, _)| *n == name) {
                Some((_, acc)) => *acc += weighted,
                None => combined.push((name, weighted)),
            }
        }
    }
    log::debug!("fused scores: {combined:?}");

    combined
        .into_iter()
        .fold(None, |best: Option<(&str, f32)>, (name, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((name, score)),
        })
        .map(|(name, _)| name.to_string())
}

/// Returns the names in `ranked` with their number of occurrences, most frequent first.
///
/// Names with equal counts are ordered by their first occurrence.
pub fn name_frequencies<'a>(ranked: &[Ranked<'a>]) -> Vec<(&'a str, usize)> {
    let counts = ranked.iter().map(|r| r.name).counts();
    let mut frequencies = ranked
        .iter()
        .map(|r| r.name)
        .unique()
        .map(|name| (name, counts[name]))
        .collect::<Vec<_>>();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1));
    frequencies
}

/// Groups `ranked` by name and returns the `limit` names with the lowest mean distance.
///
/// The result is sorted by ascending mean. Names with equal means are ordered by their first
/// occurrence. Names whose mean is not finite are skipped.
pub fn grouped_means<'a>(ranked: &[Ranked<'a>], limit: usize) -> Vec<(&'a str, f32)> {
    let mut means = ranked
        .iter()
        .map(|r| r.name)
        .unique()
        .map(|name| {
            let (sum, count) = ranked
                .iter()
                .filter(|r| r.name == name)
                .fold((0.0, 0), |(sum, count), r| (sum + r.distance, count + 1));
            (name, sum / count as f32)
        })
        .filter(|(_, mean)| mean.is_finite())
        .collect::<Vec<_>>();
    means.sort_by_key(|&(_, mean)| TotalF32(mean));
    means.truncate(limit);
    means
}

/// Maps distances to scores in `0.0..=1.0`, where the smallest distance scores 1.0 and the largest
/// scores 0.0.
///
/// If all distances are equal (including when there is only one), every entry scores 1.0.
pub fn rescale_reversed<'a>(distances: &[(&'a str, f32)]) -> Vec<(&'a str, f32)> {
    let Some((min, max)) = distances
        .iter()
        .map(|&(_, d)| d)
        .minmax()
        .into_option()
    else {
        return Vec::new();
    };

    let spread = max - min;
    distances
        .iter()
        .map(|&(name, d)| {
            let score = if spread > 0.0 { (max - d) / spread } else { 1.0 };
            (name, score)
        })
        .collect()
}
