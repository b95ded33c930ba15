use std::{env, ffi::OsString, path::PathBuf, process};

use anyhow::Context;
use signdtw::{
    dataset::Dataset,
    recognizer::{Recognizer, RecognizerOptions},
    replay::{capture_window, Replay, ReplaySensor},
    source::EdgeTriggered,
};

const USAGE: &str = "usage:
    signdtw <dataset-root> <category> <replay.jsonl>
    signdtw record <dataset-root> <category> <sign> <replay.jsonl>";

fn main() -> anyhow::Result<()> {
    signdtw::init_logger!();

    let args = env::args_os().skip(1).collect::<Vec<_>>();
    match &args[..] {
        [cmd, root, category, sign, replay] if cmd == "record" => {
            record(root.into(), utf8(category)?, utf8(sign)?, replay.into())
        }
        [root, category, replay] => recognize(root.into(), utf8(category)?, replay.into()),
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    }
}

fn utf8(arg: &OsString) -> anyhow::Result<&str> {
    arg.to_str()
        .with_context(|| format!("argument '{}' is not valid UTF-8", arg.to_string_lossy()))
}

/// Replays a recording through the recognizer and prints the predicted label.
fn recognize(root: PathBuf, category: &str, replay_path: PathBuf) -> anyhow::Result<()> {
    let corpus = Dataset::new(root).load_corpus(category)?;
    let mut recognizer = Recognizer::with_options(corpus, RecognizerOptions::default().from_env());
    let mut sensor = EdgeTriggered::new(ReplaySensor::new());

    recognizer.record();
    let mut ticks = 0;
    for tick in Replay::open(&replay_path)? {
        let tick = tick?;
        ticks += 1;

        sensor.source_mut().update(&tick);
        let sensor_frames = sensor.next_pair()?;
        let (label, is_recording) = recognizer.process(tick.camera, sensor_frames);
        if !is_recording {
            // the sensor history only matters while recording
            sensor.reset();
        }
        if !label.is_empty() {
            println!("{label}");
            return Ok(());
        }
        if !is_recording {
            break;
        }
    }

    log::debug!("replayed {ticks} ticks");
    if recognizer.is_recording() {
        eprintln!(
            "replay ended after {} of {} ticks, no prediction",
            recognizer.recorded_len(),
            recognizer.options().window_len(),
        );
    } else {
        eprintln!("no prediction: the reference corpus is empty");
    }
    process::exit(1);
}

/// Stores the first window of a recording as a new reference instance of `sign`.
fn record(root: PathBuf, category: &str, sign: &str, replay_path: PathBuf) -> anyhow::Result<()> {
    let window_len = RecognizerOptions::default().from_env().window_len();
    let Some((camera, sensor)) = capture_window(Replay::open(&replay_path)?, window_len)? else {
        eprintln!("replay is shorter than the {window_len}-tick recording window");
        process::exit(1);
    };

    let dataset = Dataset::new(root);
    let instance = dataset.next_instance(category, sign)?;
    dataset.save_instance(category, &instance, &camera, &sensor)?;
    log::info!("saved {window_len} ticks as '{instance}'");
    println!("{instance}");
    Ok(())
}
