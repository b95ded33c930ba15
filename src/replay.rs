//! Recorded tick streams.
//!
//! A replay is a stream of [`TickMessage`]s encoded as newline-delimited JSON objects
//! (["JSON Lines"]). Each message describes what the frame sources delivered in one tick of the
//! acquisition loop, so a recording session can be fed to a [`Recognizer`] offline.
//!
//! ```text
//! {"camera": {"left": [...63 numbers], "right": [...]}, "sensor_frame": 17, "sensor": {"left": [...], "right": [...]}}
//! ```
//!
//! `sensor_frame` is the hand-tracking sensor's frame index at that tick. The sensor frames are
//! only consumed when the index advances; `sensor` may be omitted on ticks where it doesn't.
//!
//! ["JSON Lines"]: https://jsonlines.org/
//! [`Recognizer`]: crate::recognizer::Recognizer

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Lines, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    landmark::FramePair,
    sequence::GestureSequence,
    source::{EdgeTriggered, FrameSource},
};

/// The frames delivered by both sources in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMessage {
    /// Frames estimated from the camera image.
    pub camera: FramePair,

    /// Frame index of the hand-tracking sensor.
    #[serde(default)]
    pub sensor_frame: u64,

    /// Frames of the hand-tracking sensor, if it produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<FramePair>,
}

/// Reads [`TickMessage`]s from a JSON Lines stream.
///
/// Blank lines are skipped.
pub struct Replay<R> {
    lines: Lines<R>,
    line: usize,
}

impl Replay<BufReader<File>> {
    /// Opens a replay file.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Replay<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Replay<R> {
    type Item = anyhow::Result<TickMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }

            let line_no = self.line;
            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("invalid tick message on line {line_no}")),
            );
        }
    }
}

/// Writes a sequence of ticks as JSON Lines.
pub fn write_ticks<'a, W, I>(mut writer: W, ticks: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a TickMessage>,
{
    for tick in ticks {
        serde_json::to_writer(&mut writer, tick)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// A [`FrameSource`] reproducing the hand-tracking sensor of a replay.
///
/// Call [`ReplaySensor::update`] with every tick before polling it.
#[derive(Debug, Default)]
pub struct ReplaySensor {
    index: u64,
    latest: FramePair,
}

impl ReplaySensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the sensor to the state recorded in `tick`.
    pub fn update(&mut self, tick: &TickMessage) {
        self.index = tick.sensor_frame;
        if let Some(sensor) = tick.sensor {
            self.latest = sensor;
        }
    }
}

impl FrameSource for ReplaySensor {
    fn frame_index(&self) -> u64 {
        self.index
    }

    fn read(&mut self) -> anyhow::Result<FramePair> {
        Ok(self.latest)
    }
}

/// Captures the first `window_len` ticks of a replay as a camera and a sensor gesture.
///
/// The sensor is polled edge-triggered, the same way a live recognizer consumes it. Returns
/// `Ok(None)` if the replay ends before the window is full.
pub fn capture_window<I>(
    ticks: I,
    window_len: usize,
) -> anyhow::Result<Option<(GestureSequence, GestureSequence)>>
where
    I: IntoIterator<Item = anyhow::Result<TickMessage>>,
{
    let mut sensor = EdgeTriggered::new(ReplaySensor::new());
    let mut camera_pairs = Vec::with_capacity(window_len);
    let mut sensor_pairs = Vec::with_capacity(window_len);
    for tick in ticks.into_iter().take(window_len) {
        let tick = tick?;
        sensor.source_mut().update(&tick);
        sensor_pairs.push(sensor.next_pair()?);
        camera_pairs.push(tick.camera);
    }

    if camera_pairs.len() < window_len {
        log::warn!(
            "replay ended after {} of {window_len} ticks",
            camera_pairs.len()
        );
        return Ok(None);
    }
    Ok(Some((
        GestureSequence::from_pairs(camera_pairs),
        GestureSequence::from_pairs(sensor_pairs),
    )))
}
