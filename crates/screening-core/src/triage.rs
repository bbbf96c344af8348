//! Risk triage: maps a model probability to a binary label, a three-level
//! tier, and the recommended actions and follow-up window for that tier.
//!
//! Both the label and the tier are pure functions of the score. They are
//! reported side by side and never derived from each other.

use std::fmt;

use anyhow::{bail, Result};
use serde::Serialize;

/// Binary decision threshold: at or above this the image is "High Risk".
pub const HIGH_RISK_THRESHOLD: f32 = 0.5;
/// Scores at or above this fall into the very-high tier.
pub const VERY_HIGH_RISK_THRESHOLD: f32 = 0.75;

/// Classifier output probability in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RiskScore(f32);

impl RiskScore {
    /// Accepts any finite value; slight numeric drift outside [0, 1] is clamped.
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() {
            bail!("risk score is not a finite number: {value}");
        }
        Ok(Self(value.clamp(0.0, 1.0)))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn label(self) -> RiskLabel {
        RiskLabel::from_score(self)
    }

    pub fn tier(self) -> RiskTier {
        RiskTier::from_score(self)
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLabel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLabel {
    pub fn from_score(score: RiskScore) -> Self {
        if score.value() >= HIGH_RISK_THRESHOLD {
            RiskLabel::High
        } else {
            RiskLabel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::Low => "Low Risk",
            RiskLabel::High => "High Risk",
        }
    }

    /// Banner shown next to a single-image result.
    pub fn banner(self) -> &'static str {
        match self {
            RiskLabel::Low => "LOW CARDIAC RISK",
            RiskLabel::High => "HIGH CARDIAC RISK",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RiskTier {
    #[serde(rename = "LOW RISK")]
    Low,
    #[serde(rename = "MODERATE RISK")]
    Moderate,
    #[serde(rename = "VERY HIGH RISK")]
    VeryHigh,
}

impl RiskTier {
    pub fn from_score(score: RiskScore) -> Self {
        let s = score.value();
        if s >= VERY_HIGH_RISK_THRESHOLD {
            RiskTier::VeryHigh
        } else if s >= HIGH_RISK_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "LOW RISK",
            RiskTier::Moderate => "MODERATE RISK",
            RiskTier::VeryHigh => "VERY HIGH RISK",
        }
    }

    pub fn actions(self) -> &'static [&'static str] {
        match self {
            RiskTier::VeryHigh => &[
                "Immediate cardiologist consultation",
                "ECG / Echocardiography",
                "Aggressive lifestyle intervention",
            ],
            RiskTier::Moderate => &[
                "Periodic monitoring",
                "BP & lipid profile check",
                "Lifestyle modification",
            ],
            RiskTier::Low => &["Routine follow-up", "Maintain healthy lifestyle"],
        }
    }

    pub fn follow_up(self) -> &'static str {
        match self {
            RiskTier::VeryHigh => "2\u{2013}4 weeks",
            RiskTier::Moderate => "3\u{2013}6 months",
            RiskTier::Low => "12 months",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the analytics panel shows for one assessed image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub tier: RiskTier,
    pub score: RiskScore,
    pub actions: &'static [&'static str],
    pub follow_up: &'static str,
}

impl Analytics {
    pub fn from_score(score: RiskScore) -> Self {
        let tier = score.tier();
        Self {
            tier,
            score,
            actions: tier.actions(),
            follow_up: tier.follow_up(),
        }
    }
}
