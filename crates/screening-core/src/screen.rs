//! Screening orchestrator: single-image assessment and sequential batch runs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use image::DynamicImage;
use serde::Serialize;
use walkdir::WalkDir;

use crate::inference::RiskScorer;
use crate::preprocess::{preprocess_file, preprocess_image};
use crate::report::{generate_report, ScreeningResult};
use crate::triage::{Analytics, RiskLabel, RiskScore, RiskTier};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Outcome of screening one image. Passed explicitly to whatever renders
/// analytics or the downloadable report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub score: RiskScore,
    pub label: RiskLabel,
    pub tier: RiskTier,
}

impl Assessment {
    pub fn from_score(score: RiskScore) -> Self {
        Self {
            score,
            label: score.label(),
            tier: score.tier(),
        }
    }

    pub fn analytics(&self) -> Analytics {
        Analytics::from_score(self.score)
    }

    pub fn report(&self, generated_at: &NaiveDateTime) -> String {
        generate_report(self.score, self.label, generated_at)
    }
}

/// Screen an image file.
pub fn assess<S: RiskScorer + ?Sized>(scorer: &S, path: &Path) -> Result<Assessment> {
    let input = preprocess_file(path)?;
    let score = scorer.score(&input)?;
    log::debug!("{} -> {score}", path.display());
    Ok(Assessment::from_score(score))
}

/// Screen an image that is already decoded, e.g. one received as an upload.
pub fn assess_image<S: RiskScorer + ?Sized>(scorer: &S, image: &DynamicImage) -> Result<Assessment> {
    let score = scorer.score(&preprocess_image(image))?;
    Ok(Assessment::from_score(score))
}

/// JPEG or PNG by extension, case-insensitive.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Collect image paths from the given files and directories, sorted.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                files.push(path.clone());
            } else {
                log::warn!("skipping unsupported file {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
                let p = entry.into_path();
                if p.is_file() && is_supported_image(&p) {
                    files.push(p);
                }
            }
        } else {
            log::warn!("{} does not exist", path.display());
        }
    }

    files.sort();
    files
}

/// Screen every image under `paths`, one at a time. A file that cannot be
/// decoded or scored is reported with an error instead of aborting the run.
pub fn run_batch<S: RiskScorer + ?Sized>(scorer: &S, paths: &[PathBuf]) -> Vec<ScreeningResult> {
    let files = collect_images(paths);
    log::info!("found {} images to screen", files.len());

    files
        .into_iter()
        .map(|path| match assess(scorer, &path) {
            Ok(assessment) => ScreeningResult::scored(path, assessment),
            Err(e) => {
                log::warn!("{}: {e:#}", path.display());
                ScreeningResult::failed(path, format!("{e:#}"))
            }
        })
        .collect()
}
