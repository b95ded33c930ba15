//! On-disk reference datasets.
//!
//! A dataset is a directory tree with one subtree per [`Modality`]:
//!
//! ```text
//! <root>/<modality>/<category>/<sign>/<instance>/lh_<instance>.json
//! <root>/<modality>/<category>/<sign>/<instance>/rh_<instance>.json
//! ```
//!
//! `<modality>` is `camera` or `sensor`. Instances are named `<sign>-<n>`; the gesture name of an
//! instance is everything before the first `-`. Each file contains a JSON array of frames, and each
//! frame is an array of 63 numbers (see [`LandmarkFrame`]).
//!
//! The camera subtree determines which instances exist. Sensor recordings are optional: an
//! instance without one only contributes a camera reference.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};

use crate::{
    corpus::{Modality, ReferenceCorpus, ReferenceEntry},
    landmark::{Hand, LandmarkFrame},
    sequence::GestureSequence,
};

/// Returns the gesture name of a dataset instance.
///
/// ```
/// assert_eq!(signdtw::dataset::gesture_name("hello-3"), "hello");
/// assert_eq!(signdtw::dataset::gesture_name("hello"), "hello");
/// ```
pub fn gesture_name(instance: &str) -> &str {
    instance.split('-').next().unwrap_or(instance)
}

/// A reference dataset rooted at some directory.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
}

impl Dataset {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn instance_dir(&self, modality: Modality, category: &str, instance: &str) -> PathBuf {
        self.root
            .join(modality.name())
            .join(category)
            .join(gesture_name(instance))
            .join(instance)
    }

    fn hand_path(&self, modality: Modality, category: &str, instance: &str, hand: Hand) -> PathBuf {
        let prefix = match hand {
            Hand::Left => "lh",
            Hand::Right => "rh",
        };
        self.instance_dir(modality, category, instance)
            .join(format!("{prefix}_{instance}.json"))
    }

    /// Lists the instances of `category`, in sorted order.
    pub fn instances(&self, category: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.root.join(Modality::Camera.name()).join(category);
        if !dir.is_dir() {
            bail!("category directory '{}' does not exist", dir.display());
        }

        let mut instances = Vec::new();
        for sign in read_dir_sorted(&dir)? {
            if !sign.is_dir() {
                continue;
            }
            for instance in read_dir_sorted(&sign)? {
                if !instance.is_dir() {
                    continue;
                }
                match instance.file_name().and_then(|n| n.to_str()) {
                    Some(name) => instances.push(name.to_string()),
                    None => log::warn!("skipping non-UTF-8 instance '{}'", instance.display()),
                }
            }
        }
        Ok(instances)
    }

    /// Loads the recording of one instance for `modality`.
    ///
    /// Returns `Ok(None)` if the instance has no recording for this modality.
    pub fn load_sequence(
        &self,
        modality: Modality,
        category: &str,
        instance: &str,
    ) -> anyhow::Result<Option<GestureSequence>> {
        if !self.instance_dir(modality, category, instance).is_dir() {
            return Ok(None);
        }

        let left = self.load_hand(&self.hand_path(modality, category, instance, Hand::Left))?;
        let right = self.load_hand(&self.hand_path(modality, category, instance, Hand::Right))?;
        let sequence = GestureSequence::new(left, right)
            .with_context(|| format!("invalid {modality} recording of '{instance}'"))?;
        Ok(Some(sequence))
    }

    fn load_hand(&self, path: &Path) -> anyhow::Result<Vec<LandmarkFrame>> {
        let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
        let frames: Vec<LandmarkFrame> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        if frames.is_empty() {
            bail!("'{}' contains no frames", path.display());
        }
        Ok(frames)
    }

    /// Loads every instance of `category` into a [`ReferenceCorpus`].
    pub fn load_corpus(&self, category: &str) -> anyhow::Result<ReferenceCorpus> {
        let mut corpus = ReferenceCorpus::new();
        for instance in self.instances(category)? {
            let name = gesture_name(&instance);
            for modality in Modality::ALL {
                match self.load_sequence(modality, category, &instance)? {
                    Some(sequence) => corpus.push(modality, ReferenceEntry::new(name, sequence)),
                    None => log::warn!("instance '{instance}' has no {modality} recording"),
                }
            }
        }

        let counts = corpus.name_counts(Modality::Camera);
        log::info!(
            "loaded {} gestures from category '{category}' ({} camera and {} sensor recordings)",
            counts.len(),
            corpus.entries(Modality::Camera).len(),
            corpus.entries(Modality::Sensor).len(),
        );
        for (name, count) in counts {
            log::debug!("  {name}: {count}");
        }
        Ok(corpus)
    }

    /// Returns the name of the next free instance of `sign` in `category`.
    ///
    /// Instances are numbered from 1. The next instance is numbered one past the highest existing
    /// number of either modality, so gaps left by deleted instances are not reused.
    pub fn next_instance(&self, category: &str, sign: &str) -> anyhow::Result<String> {
        let mut last = 0;
        for modality in Modality::ALL {
            let dir = self.root.join(modality.name()).join(category).join(sign);
            if !dir.is_dir() {
                continue;
            }
            for instance in read_dir_sorted(&dir)? {
                let number = instance
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(sign))
                    .and_then(|n| n.strip_prefix('-'))
                    .and_then(|n| n.parse::<u32>().ok());
                if let Some(number) = number {
                    last = last.max(number);
                }
            }
        }
        Ok(format!("{sign}-{}", last + 1))
    }

    /// Writes the recordings of one instance.
    ///
    /// Existing files of the instance are overwritten.
    pub fn save_instance(
        &self,
        category: &str,
        instance: &str,
        camera: &GestureSequence,
        sensor: &GestureSequence,
    ) -> anyhow::Result<()> {
        for (modality, sequence) in [(Modality::Camera, camera), (Modality::Sensor, sensor)] {
            let dir = self.instance_dir(modality, category, instance);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create '{}'", dir.display()))?;
            for hand in [Hand::Left, Hand::Right] {
                let path = self.hand_path(modality, category, instance, hand);
                let file = File::create(&path)
                    .with_context(|| format!("failed to create '{}'", path.display()))?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer(&mut writer, sequence.hand(hand))?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

fn read_dir_sorted(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("failed to read '{}'", dir.display()))?
        .map(|entry| Ok(entry?.path()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_names() {
        assert_eq!(gesture_name("thanks-12"), "thanks");
        assert_eq!(gesture_name("thanks"), "thanks");
        assert_eq!(gesture_name(""), "");
    }

    #[test]
    fn next_instance_numbers() {
        let dataset = Dataset::new("/nonexistent/signdtw-dataset");
        assert_eq!(dataset.next_instance("1A", "hello").unwrap(), "hello-1");
    }

    #[test]
    fn missing_category() {
        let dataset = Dataset::new("/nonexistent/signdtw-dataset");
        let err = dataset.load_corpus("1A").unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }
}
