//! The recognition engine.
//!
//! A [`Recognizer`] is driven by an external loop that calls [`Recognizer::process`] once per tick
//! with the latest frames of both modalities. Nothing happens until [`Recognizer::record`] is
//! called. The recognizer then buffers one frame pair per modality and tick until the recording
//! window is full, aligns the window against every reference gesture, and fuses both modalities'
//! rankings into a single predicted label.
//!
//! The alignment pass runs synchronously on the tick that completes the window. Its cost is
//! proportional to the size of the reference corpus.

use std::{env, str::FromStr};

use crate::{
    corpus::{CorpusScores, Modality, ReferenceCorpus},
    dtw::Aligner,
    fusion::{self, DecisionPath, FusionParams, Presence},
    landmark::{FrameError, FramePair, Hand},
    sequence::GestureSequence,
    timer::Timer,
};

const ENV_VAR_SEQ_LEN: &str = "SIGNDTW_SEQ_LEN";
const ENV_VAR_BATCH_SIZE: &str = "SIGNDTW_BATCH_SIZE";

/// Configuration of a [`Recognizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerOptions {
    seq_len: usize,
    fusion: FusionParams,
    non_dominant: Hand,
}

impl RecognizerOptions {
    /// The default length of the recording window, in ticks.
    pub const DEFAULT_SEQ_LEN: usize = 40;

    /// Sets the length of the recording window, in ticks.
    ///
    /// # Panics
    ///
    /// This method panics if `seq_len` is 0.
    pub fn seq_len(mut self, seq_len: usize) -> Self {
        assert!(seq_len > 0, "recording window must not be empty");
        self.seq_len = seq_len;
        self
    }

    /// Sets the number of best-ranked references per modality that take part in the decision.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.fusion.batch_size = batch_size;
        self
    }

    /// Sets the number of candidate gestures per modality that are compared by mean distance.
    pub fn candidates(mut self, candidates: usize) -> Self {
        self.fusion.candidates = candidates;
        self
    }

    /// Sets how decisive the camera's majority vote must be to bypass the distance comparison.
    pub fn dominance_ratio(mut self, ratio: f32) -> Self {
        self.fusion.dominance_ratio = ratio;
        self
    }

    /// Sets the sensor presence score below which the sensor is considered unreliable.
    pub fn sensor_presence_threshold(mut self, threshold: f32) -> Self {
        self.fusion.sensor_presence_threshold = threshold;
        self
    }

    /// Sets the hand that is missing from one-handed gestures.
    ///
    /// By default, this is the left hand.
    pub fn non_dominant_hand(mut self, hand: Hand) -> Self {
        self.non_dominant = hand;
        self
    }

    /// Applies overrides from the `SIGNDTW_SEQ_LEN` and `SIGNDTW_BATCH_SIZE` environment variables.
    ///
    /// Values that are not positive integers are ignored with a warning.
    pub fn from_env(mut self) -> Self {
        if let Some(seq_len) = env_override::<usize>(ENV_VAR_SEQ_LEN) {
            self = self.seq_len(seq_len);
        }
        if let Some(batch_size) = env_override::<usize>(ENV_VAR_BATCH_SIZE) {
            self = self.batch_size(batch_size);
        }
        self
    }

    #[inline]
    pub fn window_len(&self) -> usize {
        self.seq_len
    }

    #[inline]
    pub fn fusion_params(&self) -> &FusionParams {
        &self.fusion
    }
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            seq_len: Self::DEFAULT_SEQ_LEN,
            fusion: FusionParams::default(),
            non_dominant: Hand::Left,
        }
    }
}

fn env_override<T: FromStr + PartialOrd + Default + std::fmt::Display>(var: &str) -> Option<T> {
    let value = env::var(var).ok()?;
    match value.parse::<T>() {
        Ok(v) if v > T::default() => {
            log::debug!("override: `{var}` is set to {v}");
            Some(v)
        }
        _ => {
            log::warn!("ignoring invalid value '{value}' of `{var}`");
            None
        }
    }
}

/// Recording state of a [`Recognizer`].
///
/// Scoring and fusion happen within the tick that completes the window, so they are never
/// observable from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for [`Recognizer::record`].
    Idle,
    /// Buffering frames.
    Recording,
}

/// The outcome of one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    label: String,
    path: DecisionPath,
    presence: Presence,
}

impl Prediction {
    /// Returns the predicted gesture name.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the heuristic that produced the label.
    #[inline]
    pub fn path(&self) -> DecisionPath {
        self.path
    }

    /// Returns the presence scores of the recorded window.
    #[inline]
    pub fn presence(&self) -> Presence {
        self.presence
    }
}

/// Recognizes gestures by comparing recordings against a [`ReferenceCorpus`].
pub struct Recognizer {
    corpus: ReferenceCorpus,
    options: RecognizerOptions,
    aligner: Aligner,
    scores: CorpusScores,
    state: State,
    camera: Vec<FramePair>,
    sensor: Vec<FramePair>,
    prediction: Option<Prediction>,
    t_align: Timer,
    t_fuse: Timer,
}

impl Recognizer {
    /// Creates a recognizer with default options.
    pub fn new(corpus: ReferenceCorpus) -> Self {
        Self::with_options(corpus, RecognizerOptions::default())
    }

    pub fn with_options(corpus: ReferenceCorpus, options: RecognizerOptions) -> Self {
        for modality in Modality::ALL {
            if corpus.entries(modality).is_empty() {
                log::warn!("reference corpus has no {modality} entries");
            }
        }
        Self {
            scores: CorpusScores::zeroed(&corpus),
            corpus,
            options,
            aligner: Aligner::new(),
            state: State::Idle,
            camera: Vec::with_capacity(options.seq_len),
            sensor: Vec::with_capacity(options.seq_len),
            prediction: None,
            t_align: Timer::new("align"),
            t_fuse: Timer::new("fuse"),
        }
    }

    #[inline]
    pub fn corpus(&self) -> &ReferenceCorpus {
        &self.corpus
    }

    #[inline]
    pub fn options(&self) -> &RecognizerOptions {
        &self.options
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.state == State::Recording
    }

    /// Returns the number of ticks buffered in the current recording.
    #[inline]
    pub fn recorded_len(&self) -> usize {
        self.camera.len()
    }

    /// Returns the distances computed by the last recording.
    ///
    /// All distances are 0 while a recording is in progress.
    #[inline]
    pub fn scores(&self) -> &CorpusScores {
        &self.scores
    }

    /// Returns the prediction of the last completed recording.
    ///
    /// This stays available until the next call to [`Recognizer::record`].
    #[inline]
    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    /// Returns profiling timers for alignment and fusion.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_align, &self.t_fuse].into_iter()
    }

    /// Starts a new recording.
    ///
    /// Discards the previous prediction and any partially buffered recording.
    pub fn record(&mut self) {
        log::debug!("recording {} ticks", self.options.seq_len);
        self.scores.reset_distances();
        self.prediction = None;
        self.clear_buffers();
        self.state = State::Recording;
    }

    /// Abandons the recording in progress, if any.
    ///
    /// The last prediction is kept.
    pub fn abort(&mut self) {
        if self.is_recording() {
            log::debug!("recording aborted after {} ticks", self.camera.len());
        }
        self.clear_buffers();
        self.state = State::Idle;
    }

    /// Adds one tick of frames to the recording.
    ///
    /// Does nothing if no recording is in progress. When this tick completes the recording window,
    /// the recording is scored and the resulting prediction is returned.
    pub fn ingest(&mut self, camera: FramePair, sensor: FramePair) -> Option<&Prediction> {
        if !self.is_recording() {
            return None;
        }

        debug_assert!(self.camera.len() < self.options.seq_len);
        self.camera.push(camera);
        self.sensor.push(sensor);
        log::trace!("tick {}/{}", self.camera.len(), self.options.seq_len);

        if self.camera.len() >= self.options.seq_len {
            self.resolve();
            return self.prediction.as_ref();
        }
        None
    }

    /// Like [`Recognizer::ingest`], but takes unvalidated frames as slices.
    ///
    /// Every slice must hold exactly [`FRAME_LEN`][crate::landmark::FRAME_LEN] values. If any of
    /// them doesn't, the tick is dropped and the recognizer is left unchanged.
    pub fn ingest_raw(
        &mut self,
        camera: [&[f32]; 2],
        sensor: [&[f32]; 2],
    ) -> Result<Option<&Prediction>, FrameError> {
        let camera = FramePair::from_slices(camera[0], camera[1])?;
        let sensor = FramePair::from_slices(sensor[0], sensor[1])?;
        Ok(self.ingest(camera, sensor))
    }

    /// Advances the recognizer by one tick.
    ///
    /// Returns the last predicted label (empty if there is none) and whether a recording is in
    /// progress after this tick.
    ///
    /// A label is reported for every window that resolves against a non-empty corpus, even when
    /// every distance of that window is 0. The label is only empty while recording, before the
    /// first window resolved, or when the corpus has no entries.
    pub fn process(&mut self, camera: FramePair, sensor: FramePair) -> (String, bool) {
        self.ingest(camera, sensor);
        self.status()
    }

    /// Like [`Recognizer::process`], but takes unvalidated frames as slices.
    ///
    /// Malformed frames are logged and the tick is dropped.
    pub fn process_raw(&mut self, camera: [&[f32]; 2], sensor: [&[f32]; 2]) -> (String, bool) {
        if let Err(e) = self.ingest_raw(camera, sensor) {
            log::warn!("dropping tick: {e}");
        }
        self.status()
    }

    fn status(&self) -> (String, bool) {
        let label = self
            .prediction
            .as_ref()
            .map(|p| p.label.clone())
            .unwrap_or_default();
        (label, self.is_recording())
    }

    fn clear_buffers(&mut self) {
        self.camera.clear();
        self.sensor.clear();
    }

    fn resolve(&mut self) {
        let window_len = self.options.seq_len;
        debug_assert_eq!(self.camera.len(), window_len);

        let camera = GestureSequence::from_pairs(self.camera.drain(..).take(window_len));
        let sensor = GestureSequence::from_pairs(self.sensor.drain(..).take(window_len));
        self.state = State::Idle;

        let aligner = &mut self.aligner;
        let corpus = &self.corpus;
        self.scores = self
            .t_align
            .time(|| CorpusScores::compute(aligner, corpus, &camera, &sensor));

        let params = self.options.fusion;
        let presence = Presence::compute(&camera, &sensor, window_len, self.options.non_dominant);
        let decision = self.t_fuse.time(|| {
            let camera = self.scores.rank(corpus, Modality::Camera, params.batch_size);
            let sensor = self.scores.rank(corpus, Modality::Sensor, params.batch_size);
            fusion::decide(&camera, &sensor, presence, &params)
        });

        log::debug!("{}, {}", self.t_align, self.t_fuse);
        match decision {
            Some(decision) => {
                log::info!(
                    "predicted '{}' ({:?}, presence camera={:.2} sensor={:.2})",
                    decision.label,
                    decision.path,
                    presence.camera,
                    presence.sensor,
                );
                self.prediction = Some(Prediction {
                    label: decision.label,
                    path: decision.path,
                    presence,
                });
            }
            None => {
                log::warn!("no reference gestures to compare against");
                self.prediction = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        corpus::ReferenceEntry,
        landmark::{LandmarkFrame, FRAME_LEN},
    };

    fn pair(x: f32) -> FramePair {
        let frame = LandmarkFrame::new([x; FRAME_LEN]);
        FramePair::new(frame, frame)
    }

    fn constant(x: f32, len: usize) -> GestureSequence {
        GestureSequence::from_pairs(std::iter::repeat(pair(x)).take(len))
    }

    fn corpus() -> ReferenceCorpus {
        let mut corpus = ReferenceCorpus::new();
        for (name, x) in [("one", 1.0), ("two", 2.0), ("three", 3.0)] {
            for modality in Modality::ALL {
                corpus.push(modality, ReferenceEntry::new(name, constant(x, 10)));
            }
        }
        corpus
    }

    #[test]
    fn idle_ignores_ticks() {
        let mut rec = Recognizer::new(corpus());
        assert_eq!(rec.process(pair(1.0), pair(1.0)), (String::new(), false));
        assert_eq!(rec.recorded_len(), 0);
        assert_eq!(rec.state(), State::Idle);
    }

    #[test]
    fn records_full_window() {
        let mut rec = Recognizer::with_options(corpus(), RecognizerOptions::default().seq_len(5));
        rec.record();
        for _ in 0..4 {
            assert_eq!(rec.process(pair(2.1), pair(1.9)), (String::new(), true));
        }
        assert_eq!(rec.process(pair(2.1), pair(1.9)), ("two".to_string(), false));
        assert_eq!(rec.state(), State::Idle);
        assert_eq!(rec.recorded_len(), 0);
        assert_eq!(rec.prediction().unwrap().path(), DecisionPath::Fallback);

        // the prediction sticks around until the next recording starts
        assert_eq!(rec.process(pair(0.0), pair(0.0)), ("two".to_string(), false));
        rec.record();
        assert_eq!(rec.process(pair(0.0), pair(0.0)), (String::new(), true));
        assert!(rec.scores().distances(Modality::Camera).iter().all(|&d| d == 0.0));
    }

    #[test]
    fn malformed_tick_is_dropped() {
        let mut rec = Recognizer::with_options(corpus(), RecognizerOptions::default().seq_len(2));
        rec.record();
        let good = [1.0; FRAME_LEN];
        let bad = [1.0; 10];

        assert!(rec.ingest_raw([&good, &bad], [&good, &good]).is_err());
        assert_eq!(rec.recorded_len(), 0);
        assert_eq!(rec.process_raw([&good, &good], [&good, &bad[..]]), (String::new(), true));
        assert_eq!(rec.recorded_len(), 0);

        assert_eq!(rec.process_raw([&good, &good], [&good, &good]), (String::new(), true));
        assert_eq!(rec.recorded_len(), 1);
        let prediction = rec.ingest_raw([&good, &good], [&good, &good]).unwrap();
        assert_eq!(prediction.unwrap().label(), "one");
    }

    #[test]
    fn non_finite_values_do_not_poison_alignment() {
        let mut corpus = ReferenceCorpus::new();
        for _ in 0..20 {
            corpus.push(Modality::Camera, ReferenceEntry::new("bye", constant(5.0, 6)));
        }
        for _ in 0..3 {
            corpus.push(Modality::Camera, ReferenceEntry::new("hello", constant(1.0, 6)));
        }
        let options = RecognizerOptions::default().seq_len(6).batch_size(3);
        let mut rec = Recognizer::with_options(corpus, options);

        let good = [1.0; FRAME_LEN];
        let mut glitched = good;
        glitched[4] = f32::NAN;
        let absent = [0.0; FRAME_LEN];

        rec.record();
        let mut status = (String::new(), true);
        for tick in 0..6 {
            let camera = if tick == 3 { &glitched } else { &good };
            status = rec.process_raw([camera, &good], [&absent, &absent]);
        }

        assert_eq!(status, ("hello".to_string(), false));
        let camera = rec.scores().distances(Modality::Camera);
        assert!(camera.iter().all(|d| d.is_finite()), "{camera:?}");
        assert_eq!(rec.prediction().unwrap().path(), DecisionPath::FastPath);
    }

    #[test]
    fn zero_distance_window_is_labelled() {
        let mut corpus = ReferenceCorpus::new();
        for modality in Modality::ALL {
            corpus.push(modality, ReferenceEntry::new("one", constant(1.0, 3)));
        }
        let mut rec = Recognizer::with_options(corpus, RecognizerOptions::default().seq_len(3));
        rec.record();
        rec.process(pair(1.0), pair(1.0));
        rec.process(pair(1.0), pair(1.0));
        assert_eq!(rec.process(pair(1.0), pair(1.0)), ("one".to_string(), false));
        assert_eq!(rec.scores().total(Modality::Camera), 0.0);
        assert_eq!(rec.scores().total(Modality::Sensor), 0.0);
    }

    #[test]
    fn abort_discards_recording() {
        let mut rec = Recognizer::with_options(corpus(), RecognizerOptions::default().seq_len(3));
        rec.record();
        rec.process(pair(3.0), pair(3.0));
        rec.abort();
        assert!(!rec.is_recording());
        assert_eq!(rec.recorded_len(), 0);
        assert_eq!(rec.process(pair(3.0), pair(3.0)), (String::new(), false));
    }

    #[test]
    fn empty_corpus_yields_no_label() {
        let mut rec =
            Recognizer::with_options(ReferenceCorpus::new(), RecognizerOptions::default().seq_len(2));
        rec.record();
        rec.process(pair(1.0), pair(1.0));
        assert_eq!(rec.process(pair(1.0), pair(1.0)), (String::new(), false));
        assert!(rec.prediction().is_none());
    }

    #[test]
    fn single_modality_corpus_still_predicts() {
        let mut corpus = ReferenceCorpus::new();
        corpus.push(Modality::Camera, ReferenceEntry::new("wave", constant(1.0, 4)));
        corpus.push(Modality::Camera, ReferenceEntry::new("point", constant(5.0, 4)));

        let mut rec = Recognizer::with_options(corpus, RecognizerOptions::default().seq_len(4));
        rec.record();
        for _ in 0..3 {
            rec.process(pair(1.2), pair(1.0));
        }
        assert_eq!(rec.process(pair(1.2), pair(1.0)), ("wave".to_string(), false));
    }

    #[test]
    #[should_panic]
    fn zero_window_is_rejected() {
        RecognizerOptions::default().seq_len(0);
    }
}
