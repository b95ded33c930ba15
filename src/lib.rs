//! Sign gesture recognition with Dynamic Time Warping.
//!
//! Gestures are recorded as short windows of hand landmarks from two independent sensing sources
//! (a camera-based pose estimator and a dedicated hand-tracking sensor), compared against a library
//! of reference gestures with [DTW](dtw), and the two modalities' results are fused into a single
//! predicted label.
//!
//! The entry point is [`Recognizer`](recognizer::Recognizer). Reference gestures are usually loaded
//! from a [`Dataset`](dataset::Dataset).
//!
//! # Environment Variables
//!
//! [`RecognizerOptions::from_env`](recognizer::RecognizerOptions::from_env) reads these overrides:
//!
//! * `SIGNDTW_SEQ_LEN`: length of the recording window in ticks (default 40).
//! * `SIGNDTW_BATCH_SIZE`: number of best-ranked references per modality that take part in the
//!   decision (default 30).

use log::LevelFilter;

pub mod corpus;
pub mod dataset;
pub mod dtw;
pub mod fusion;
pub mod landmark;
pub mod num;
pub mod recognizer;
pub mod replay;
pub mod sequence;
pub mod source;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and `signdtw` will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` can override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
