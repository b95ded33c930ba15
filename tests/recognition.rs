use signdtw::{
    corpus::{Modality, ReferenceCorpus, ReferenceEntry},
    fusion::DecisionPath,
    landmark::{FramePair, LandmarkFrame, FRAME_LEN},
    recognizer::{Recognizer, RecognizerOptions},
    sequence::GestureSequence,
};

const WINDOW: usize = RecognizerOptions::DEFAULT_SEQ_LEN;

/// A random frame whose components are all non-zero, so it never reads as "hand absent".
fn random_frame(rng: &mut fastrand::Rng) -> LandmarkFrame {
    let mut values = [0.0; FRAME_LEN];
    for v in &mut values {
        *v = 0.1 + rng.f32();
    }
    LandmarkFrame::new(values)
}

fn random_gesture(rng: &mut fastrand::Rng, len: usize) -> GestureSequence {
    GestureSequence::from_pairs(
        (0..len)
            .map(|_| FramePair::new(random_frame(rng), random_frame(rng)))
            .collect::<Vec<_>>(),
    )
}

fn absent_gesture(len: usize) -> GestureSequence {
    GestureSequence::from_pairs(std::iter::repeat(FramePair::ABSENT).take(len))
}

fn pairs(seq: &GestureSequence) -> Vec<FramePair> {
    seq.left()
        .iter()
        .zip(seq.right())
        .map(|(&l, &r)| FramePair::new(l, r))
        .collect()
}

struct Reference {
    name: &'static str,
    camera: GestureSequence,
    sensor: GestureSequence,
}

fn corpus_of(references: &[Reference]) -> ReferenceCorpus {
    let mut corpus = ReferenceCorpus::new();
    for r in references {
        corpus.push(Modality::Camera, ReferenceEntry::new(r.name, r.camera.clone()));
        corpus.push(Modality::Sensor, ReferenceEntry::new(r.name, r.sensor.clone()));
    }
    corpus
}

#[test]
fn exact_camera_match_is_recognized() {
    let mut rng = fastrand::Rng::with_seed(40);
    let mut references = ["hello", "thanks", "bye", "please"]
        .into_iter()
        .map(|name| Reference {
            name,
            // reference lengths do not have to match the window
            camera: random_gesture(&mut rng, WINDOW + 5),
            sensor: random_gesture(&mut rng, WINDOW - 3),
        })
        .collect::<Vec<_>>();
    let target_camera = random_gesture(&mut rng, WINDOW);
    references[0].camera = target_camera.clone();
    let target_sensor = pairs(&references[0].sensor);

    let mut recognizer = Recognizer::new(corpus_of(&references));
    assert_eq!(recognizer.process(FramePair::ABSENT, FramePair::ABSENT), (String::new(), false));

    recognizer.record();
    for (tick, camera) in pairs(&target_camera).into_iter().enumerate() {
        let sensor = target_sensor[tick % target_sensor.len()];
        let (label, is_recording) = recognizer.process(camera, sensor);
        if tick + 1 < WINDOW {
            assert!(is_recording, "stopped recording after {} ticks", tick + 1);
            assert_eq!(label, "");
        } else {
            assert!(!is_recording);
            assert_eq!(label, "hello");
        }
    }

    let prediction = recognizer.prediction().unwrap();
    assert_eq!(prediction.path(), DecisionPath::Fallback);
    assert_eq!(prediction.presence().camera, 1.0);
    assert_eq!(prediction.presence().sensor, 1.0);
    assert_eq!(recognizer.scores().distances(Modality::Camera)[0], 0.0);
}

#[test]
fn absent_sensor_contributes_nothing() {
    let mut rng = fastrand::Rng::with_seed(41);
    let hello = random_gesture(&mut rng, WINDOW);
    let references = vec![
        Reference {
            name: "hello",
            camera: hello.clone(),
            sensor: random_gesture(&mut rng, WINDOW),
        },
        Reference {
            name: "bye",
            camera: random_gesture(&mut rng, WINDOW),
            // would be a perfect sensor match for a window without any hands
            sensor: absent_gesture(WINDOW),
        },
        Reference {
            name: "thanks",
            camera: random_gesture(&mut rng, WINDOW),
            sensor: random_gesture(&mut rng, WINDOW),
        },
    ];

    let mut recognizer = Recognizer::new(corpus_of(&references));
    recognizer.record();
    let mut result = None;
    for camera in pairs(&hello) {
        result = Some(recognizer.process(camera, FramePair::ABSENT));
    }

    assert_eq!(result, Some(("hello".to_string(), false)));
    let prediction = recognizer.prediction().unwrap();
    assert_eq!(prediction.presence().sensor, 0.0);
    assert_eq!(prediction.path(), DecisionPath::Fallback);
}

#[test]
fn decisive_camera_vote_takes_fast_path() {
    let mut rng = fastrand::Rng::with_seed(42);
    let hello = random_gesture(&mut rng, WINDOW);
    let mut references = Vec::new();
    for _ in 0..3 {
        references.push(Reference {
            name: "hello",
            camera: hello.clone(),
            sensor: random_gesture(&mut rng, WINDOW),
        });
    }
    for name in ["bye", "thanks"] {
        references.push(Reference {
            name,
            camera: random_gesture(&mut rng, WINDOW),
            sensor: absent_gesture(WINDOW),
        });
    }

    let mut recognizer = Recognizer::new(corpus_of(&references));
    recognizer.record();
    let mut prediction = None;
    for camera in pairs(&hello) {
        prediction = recognizer.ingest(camera, FramePair::ABSENT).cloned();
    }

    let prediction = prediction.expect("window completed without a prediction");
    assert_eq!(prediction.label(), "hello");
    assert_eq!(prediction.path(), DecisionPath::FastPath);
}

#[test]
fn record_restarts_cycle() {
    let mut rng = fastrand::Rng::with_seed(43);
    let references = ["a", "b"]
        .into_iter()
        .map(|name| Reference {
            name,
            camera: random_gesture(&mut rng, 8),
            sensor: random_gesture(&mut rng, 8),
        })
        .collect::<Vec<_>>();
    let options = RecognizerOptions::default().seq_len(8);
    let mut recognizer = Recognizer::with_options(corpus_of(&references), options);

    for r in references.iter().chain(references.iter().rev()) {
        recognizer.record();
        let sensor = pairs(&r.sensor);
        let mut label = String::new();
        for (camera, sensor) in pairs(&r.camera).into_iter().zip(sensor) {
            label = recognizer.process(camera, sensor).0;
        }
        assert_eq!(label, r.name);
        assert!(recognizer.scores().total(Modality::Camera) > 0.0);
    }

    recognizer.record();
    assert!(recognizer
        .scores()
        .distances(Modality::Sensor)
        .iter()
        .all(|&d| d == 0.0));
    assert!(recognizer.prediction().is_none());
}
