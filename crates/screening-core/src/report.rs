//! Output formatting: the downloadable text report, single-image analytics
//! and batch result tables.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::screen::Assessment;
use crate::triage::{RiskLabel, RiskScore, RiskTier};

const REPORT_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Plain-text report for one image. Deterministic for a fixed timestamp.
pub fn generate_report(score: RiskScore, label: RiskLabel, generated_at: &NaiveDateTime) -> String {
    format!(
        "\n\
         CARDIAC RISK ASSESSMENT REPORT\n\
         =============================\n\
         \n\
         Date & Time: {}\n\
         \n\
         Risk Category : {}\n\
         Risk Score    : {:.2}\n\
         \n\
         Generated using AI-based retinal image analysis.\n",
        generated_at.format(REPORT_TIMESTAMP_FORMAT),
        label,
        score.value(),
    )
}

/// Save the report for `assessment` as a text file.
pub fn write_report(path: &Path, assessment: &Assessment, generated_at: &NaiveDateTime) -> Result<()> {
    fs::write(path, assessment.report(generated_at))
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    log::info!("report written to {}", path.display());
    Ok(())
}

/// The heatmap is pre-generated elsewhere; only reference it if it is there.
pub fn existing_heatmap(heatmap: Option<&Path>) -> Option<&Path> {
    heatmap.filter(|path| {
        let exists = path.is_file();
        if !exists {
            log::warn!("heatmap {} not found, not showing it", path.display());
        }
        exists
    })
}

/// One row of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResult {
    pub path: PathBuf,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<RiskLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<RiskTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScreeningResult {
    pub fn scored(path: PathBuf, assessment: Assessment) -> Self {
        Self {
            path,
            score: assessment.score.value(),
            label: Some(assessment.label),
            tier: Some(assessment.tier),
            error: None,
        }
    }

    pub fn failed(path: PathBuf, error: String) -> Self {
        Self {
            path,
            score: 0.0,
            label: None,
            tier: None,
            error: Some(error),
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.label == Some(RiskLabel::High)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

/// Single-image result with its analytics panel.
pub fn render_assessment(
    path: &Path,
    assessment: &Assessment,
    heatmap: Option<&Path>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => render_assessment_text(path, assessment, heatmap),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path,
                "assessment": assessment,
                "analytics": assessment.analytics(),
                "heatmap": heatmap,
            });
            serde_json::to_string_pretty(&output).unwrap_or_default()
        }
    }
}

fn render_assessment_text(path: &Path, assessment: &Assessment, heatmap: Option<&Path>) -> String {
    let analytics = assessment.analytics();
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "=".repeat(70));
    let _ = writeln!(out, "SCREENING RESULT: {}", path.display());
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "\n  {}", assessment.label.banner());
    let _ = writeln!(out, "  Risk Probability: {}", assessment.score);
    let _ = writeln!(out, "\nRISK ANALYTICS:");
    let _ = writeln!(out, "  Risk Level: {}", analytics.tier);
    let _ = writeln!(out, "\nRECOMMENDED ACTIONS:");
    for action in analytics.actions {
        let _ = writeln!(out, "  - {action}");
    }
    let _ = writeln!(out, "\nSUGGESTED FOLLOW-UP:");
    let _ = writeln!(out, "  Within {}", analytics.follow_up);
    if let Some(heatmap) = heatmap {
        let _ = writeln!(out, "\nATTENTION MAP:");
        let _ = writeln!(out, "  {} (red/yellow regions had more influence)", heatmap.display());
    }
    let _ = write!(out, "{}", "=".repeat(70));
    out
}

pub fn render_results(results: &[ScreeningResult], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(results),
        OutputFormat::Json => render_json(results),
    }
}

pub fn print_results(results: &[ScreeningResult], format: OutputFormat) {
    println!("{}", render_results(results, format));
}

fn render_text(results: &[ScreeningResult]) -> String {
    let high: Vec<_> = results.iter().filter(|r| r.is_high_risk()).collect();
    let errors: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let low = results.len() - high.len() - errors.len();
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "=".repeat(70));
    let _ = writeln!(out, "BATCH SCREENING RESULTS");
    let _ = writeln!(out, "{}", "=".repeat(70));

    let _ = writeln!(out);
    for r in results.iter().filter(|r| r.error.is_none()) {
        let label = r.label.map(RiskLabel::as_str).unwrap_or("unknown");
        let _ = writeln!(out, "  {} -> {} ({:.2})", r.path.display(), label, r.score);
    }

    if !errors.is_empty() {
        let _ = writeln!(out, "\nERRORS ({}):", errors.len());
        for r in &errors {
            let err = r.error.as_deref().unwrap_or("unknown");
            let _ = writeln!(out, "  [ERR ] {} -- {}", r.path.display(), err);
        }
    }

    let _ = writeln!(out, "\nSUMMARY:");
    let _ = writeln!(out, "  Total images screened: {}", results.len());
    let _ = writeln!(out, "  High risk:             {}", high.len());
    let _ = writeln!(out, "  Low risk:              {}", low);
    let _ = writeln!(out, "  Errors:                {}", errors.len());
    let _ = write!(out, "{}", "=".repeat(70));
    out
}

fn render_json(results: &[ScreeningResult]) -> String {
    let count_tier = |tier: RiskTier| results.iter().filter(|r| r.tier == Some(tier)).count();
    let output = serde_json::json!({
        "results": results,
        "summary": {
            "total": results.len(),
            "high_risk": results.iter().filter(|r| r.is_high_risk()).count(),
            "low_risk": results.iter().filter(|r| r.label == Some(RiskLabel::Low)).count(),
            "errors": results.iter().filter(|r| r.error.is_some()).count(),
            "tiers": {
                "very_high": count_tier(RiskTier::VeryHigh),
                "moderate": count_tier(RiskTier::Moderate),
                "low": count_tier(RiskTier::Low),
            },
        }
    });
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    fn assessed(v: f32) -> Assessment {
        Assessment::from_score(RiskScore::new(v).unwrap())
    }

    #[test]
    fn test_report_layout() {
        let a = assessed(0.82);
        let report = generate_report(a.score, a.label, &at());

        let expected = "\n\
                        CARDIAC RISK ASSESSMENT REPORT\n\
                        =============================\n\
                        \n\
                        Date & Time: 07-03-2025 09:05\n\
                        \n\
                        Risk Category : High Risk\n\
                        Risk Score    : 0.82\n\
                        \n\
                        Generated using AI-based retinal image analysis.\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_is_deterministic_and_rounds() {
        let a = assessed(0.41666);
        let first = a.report(&at());
        assert_eq!(first, a.report(&at()));
        assert!(first.contains("Risk Score    : 0.42\n"));
        assert!(first.contains("Risk Category : Low Risk\n"));
    }

    #[test]
    fn test_assessment_text_lists_actions() {
        let text = render_assessment(Path::new("eye.png"), &assessed(0.6), None, OutputFormat::Text);
        assert!(text.contains("HIGH CARDIAC RISK"));
        assert!(text.contains("Risk Level: MODERATE RISK"));
        assert!(text.contains("  - BP & lipid profile check"));
        assert!(text.contains("Within 3–6 months"));
        assert!(!text.contains("ATTENTION MAP"));
    }

    #[test]
    fn test_assessment_json() {
        let json = render_assessment(
            Path::new("eye.png"),
            &assessed(0.3),
            Some(Path::new("gradcam_result.png")),
            OutputFormat::Json,
        );
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["assessment"]["label"], "Low Risk");
        assert_eq!(v["analytics"]["tier"], "LOW RISK");
        assert_eq!(v["heatmap"], "gradcam_result.png");
    }

    #[test]
    fn test_batch_summary_counts() {
        let results = vec![
            ScreeningResult::scored("a.png".into(), assessed(0.9)),
            ScreeningResult::scored("b.png".into(), assessed(0.55)),
            ScreeningResult::scored("c.png".into(), assessed(0.1)),
            ScreeningResult::failed("d.png".into(), "bad header".into()),
        ];

        let text = render_results(&results, OutputFormat::Text);
        assert!(text.contains("a.png -> High Risk (0.90)"));
        assert!(text.contains("Total images screened: 4"));
        assert!(text.contains("High risk:             2"));
        assert!(text.contains("Low risk:              1"));
        assert!(text.contains("[ERR ] d.png -- bad header"));

        let v: serde_json::Value =
            serde_json::from_str(&render_results(&results, OutputFormat::Json)).unwrap();
        assert_eq!(v["summary"]["total"], 4);
        assert_eq!(v["summary"]["errors"], 1);
        assert_eq!(v["summary"]["tiers"]["moderate"], 1);
        assert!(v["results"][3].get("label").is_none());
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardiac_risk_report.txt");
        let a = assessed(0.82);

        write_report(&path, &a, &at()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), a.report(&at()));

        let missing_dir = dir.path().join("nope").join("report.txt");
        let err = write_report(&missing_dir, &a, &at()).unwrap_err();
        assert!(format!("{err}").contains("failed to write report"));
    }

    #[test]
    fn test_heatmap_only_kept_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("gradcam_result.png");
        fs::write(&present, b"png").unwrap();
        let absent = dir.path().join("missing.png");

        assert_eq!(existing_heatmap(Some(present.as_path())), Some(present.as_path()));
        assert_eq!(existing_heatmap(Some(absent.as_path())), None);
        assert_eq!(existing_heatmap(Some(dir.path())), None);
        assert_eq!(existing_heatmap(None), None);
    }

    #[test]
    fn test_empty_batch_json() {
        let v: serde_json::Value =
            serde_json::from_str(&render_results(&[], OutputFormat::Json)).unwrap();
        assert_eq!(v["results"].as_array().unwrap().len(), 0);
        assert_eq!(v["summary"]["total"], 0);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
