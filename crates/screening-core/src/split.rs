//! Dataset splitter: copies a class-labelled image tree into
//! Train/Val/Test x {Low_Risk, High_Risk} folders with a seeded 70/15/15 split.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::screen::is_supported_image;

pub const TRAIN_RATIO: f64 = 0.7;
pub const VAL_RATIO: f64 = 0.15;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskGroup {
    #[serde(rename = "Low_Risk")]
    LowRisk,
    #[serde(rename = "High_Risk")]
    HighRisk,
}

impl RiskGroup {
    pub fn dir_name(self) -> &'static str {
        match self {
            RiskGroup::LowRisk => "Low_Risk",
            RiskGroup::HighRisk => "High_Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "Train",
            Split::Val => "Val",
            Split::Test => "Test",
        }
    }
}

/// Source class folder and the risk group its images belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    pub source: String,
    pub group: RiskGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_classes")]
    pub classes: Vec<ClassMapping>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Diabetic-retinopathy grading folders: only "No_DR" counts as low risk.
fn default_classes() -> Vec<ClassMapping> {
    let class = |source: &str, group| ClassMapping {
        source: source.to_string(),
        group,
    };
    vec![
        class("No_DR", RiskGroup::LowRisk),
        class("Mild", RiskGroup::HighRisk),
        class("Moderate", RiskGroup::HighRisk),
        class("Severe", RiskGroup::HighRisk),
        class("Proliferate_DR", RiskGroup::HighRisk),
    ]
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            classes: default_classes(),
        }
    }
}

pub fn load_split_config(path: &Path) -> Result<SplitConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read split config {}", path.display()))?;
    let config: SplitConfig = serde_json::from_str(&data)?;
    Ok(config)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> Partition<T> {
    pub fn get(&self, split: Split) -> &[T] {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shuffle and cut at floor(0.7n) and floor(0.85n). Every item lands in
/// exactly one split.
pub fn partition<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Partition<T> {
    items.shuffle(rng);
    let n = items.len();
    let train_end = (TRAIN_RATIO * n as f64) as usize;
    let val_end = ((TRAIN_RATIO + VAL_RATIO) * n as f64) as usize;

    let test = items.split_off(val_end);
    let val = items.split_off(train_end);
    Partition {
        train: items,
        val,
        test,
    }
}

/// Image files directly inside `dir`, sorted so a seed always sees the same order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    pub low_risk: usize,
    pub high_risk: usize,
}

impl GroupCounts {
    fn add(&mut self, group: RiskGroup, n: usize) {
        match group {
            RiskGroup::LowRisk => self.low_risk += n,
            RiskGroup::HighRisk => self.high_risk += n,
        }
    }

    pub fn total(&self) -> usize {
        self.low_risk + self.high_risk
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub train: GroupCounts,
    pub val: GroupCounts,
    pub test: GroupCounts,
    pub skipped_classes: Vec<String>,
}

impl SplitSummary {
    pub fn get(&self, split: Split) -> &GroupCounts {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    fn get_mut(&mut self, split: Split) -> &mut GroupCounts {
        match split {
            Split::Train => &mut self.train,
            Split::Val => &mut self.val,
            Split::Test => &mut self.test,
        }
    }

    pub fn total(&self) -> usize {
        Split::ALL.iter().map(|s| self.get(*s).total()).sum()
    }
}

/// Several classes share one group folder, so a name already written there in
/// this run is prefixed with the source class. Files left by an earlier run
/// are overwritten; files written by this run never are.
fn destination_for(
    src: &Path,
    dest_dir: &Path,
    class: &str,
    written: &HashSet<PathBuf>,
) -> Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", src.display()))?;
    let dst = dest_dir.join(name);
    if !written.contains(&dst) {
        return Ok(dst);
    }

    let renamed = dest_dir.join(format!("{class}_{}", name.to_string_lossy()));
    if written.contains(&renamed) {
        bail!(
            "{} was already written, refusing to overwrite it with {}",
            renamed.display(),
            src.display()
        );
    }
    log::warn!(
        "{} taken by another class, copying {} as {}",
        dst.display(),
        src.display(),
        renamed.display()
    );
    Ok(renamed)
}

/// Split every configured class under `source` into `target`. One RNG seeded
/// from the config is shared across classes in config order.
pub fn split_dataset(source: &Path, target: &Path, config: &SplitConfig) -> Result<SplitSummary> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = SplitSummary::default();
    let mut written = HashSet::new();

    for class in &config.classes {
        let class_dir = source.join(&class.source);
        if !class_dir.is_dir() {
            log::warn!("class folder {} not found, skipping", class_dir.display());
            summary.skipped_classes.push(class.source.clone());
            continue;
        }

        let images = list_images(&class_dir)?;
        let parts = partition(images, &mut rng);
        log::info!(
            "{} -> {}: {} train, {} val, {} test",
            class.source,
            class.group.dir_name(),
            parts.train.len(),
            parts.val.len(),
            parts.test.len()
        );

        for split in Split::ALL {
            let dest_dir = target.join(split.dir_name()).join(class.group.dir_name());
            fs::create_dir_all(&dest_dir)
                .with_context(|| format!("failed to create {}", dest_dir.display()))?;

            let mut copied = 0;
            for src in parts.get(split) {
                let dst = destination_for(src, &dest_dir, &class.source, &written)?;
                fs::copy(src, &dst).with_context(|| {
                    format!("failed to copy {} to {}", src.display(), dst.display())
                })?;
                written.insert(dst);
                copied += 1;
            }
            summary.get_mut(split).add(class.group, copied);
        }
    }

    Ok(summary)
}
