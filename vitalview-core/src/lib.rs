//! Core data model for turning an analysed medical report into chart-ready data.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod chart;
pub mod dispatch;
pub mod severity;

pub use chart::{
    CapacityFillChart, CategoricalIndicatorChart, ChartPoint, ChartSpec, ComparisonBarChart,
    RadialGaugeChart, TrendLineChart, VisualAidChart,
};
pub use dispatch::{render_chart, render_test, resolve_kind, TestCard};
pub use severity::{classify_range, range_position, RangePosition, RangeStatus};

/// Tuning knobs for chart scaling and text hand-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizationConfig {
    /// Smallest fill fraction drawn for a capacity/gauge indicator.
    pub min_visible_fraction: f64,
    /// Multiplier applied to the patient value when sizing the full scale.
    pub patient_headroom: f64,
    /// Multiplier applied to the upper normal bound when sizing the full scale.
    pub normal_headroom: f64,
    /// Relative band around the normal bounds treated as borderline.
    pub borderline_margin: f64,
    /// Character budget for text handed to speech synthesis.
    pub speech_max_chars: usize,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            min_visible_fraction: 0.1,
            patient_headroom: 1.5,
            normal_headroom: 2.0,
            borderline_margin: 0.05,
            speech_max_chars: 200,
        }
    }
}

impl VisualizationConfig {
    /// Reject settings that would make the scaling rules meaningless.
    pub fn validate(&self) -> Result<(), VitalViewError> {
        if !(self.min_visible_fraction > 0.0 && self.min_visible_fraction <= 1.0) {
            return Err(VitalViewError::Config(format!(
                "min_visible_fraction must be in (0, 1], got {}",
                self.min_visible_fraction
            )));
        }
        for (name, value) in [
            ("patient_headroom", self.patient_headroom),
            ("normal_headroom", self.normal_headroom),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(VitalViewError::Config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.borderline_margin.is_finite() || self.borderline_margin < 0.0 {
            return Err(VitalViewError::Config(format!(
                "borderline_margin must be non-negative, got {}",
                self.borderline_margin
            )));
        }
        Ok(())
    }
}

/// Clinical risk bucket attached to a test by the upstream model.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Normal,
    Borderline,
    Concerning,
    Critical,
}

impl Severity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "borderline" => Some(Self::Borderline),
            "concerning" => Some(Self::Concerning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Borderline => "Borderline",
            Self::Concerning => "Concerning",
            Self::Critical => "Critical",
        }
    }

    /// Display colour used for fills, strokes and badges.
    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#dc2626",
            Self::Concerning => "#ea580c",
            Self::Borderline => "#eab308",
            Self::Normal => "#22c55e",
        }
    }
}

/// Kind of document the model believes it analysed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    BloodTest,
    Prescription,
    Imaging,
    #[default]
    General,
}

impl ReportType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "blood_test" => Some(Self::BloodTest),
            "prescription" => Some(Self::Prescription),
            "imaging" => Some(Self::Imaging),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// Chart family drawn for one test.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationKind {
    CapacityFill,
    #[default]
    RadialGauge,
    TrendLine,
    CategoricalIndicator,
    ComparisonBar,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "increasing" => Some(Self::Increasing),
            "decreasing" => Some(Self::Decreasing),
            "stable" => Some(Self::Stable),
            _ => None,
        }
    }

    pub fn badge_label(self) -> &'static str {
        match self {
            Self::Increasing => "Trending Up",
            Self::Decreasing => "Trending Down",
            Self::Stable => "Stable",
        }
    }
}

/// A measured value, either a single number or an ordered set of named
/// components (blood pressure's systolic/diastolic pair).
#[derive(Debug, Clone, PartialEq)]
pub enum PatientValue {
    Scalar(f64),
    Composite(Vec<(String, f64)>),
}

impl PatientValue {
    /// Interpret a JSON value; composite entries that are not numeric are skipped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let entries: Vec<(String, f64)> = map
                    .iter()
                    .filter_map(|(key, entry)| numeric_value(entry).map(|v| (key.clone(), v)))
                    .collect();
                if entries.is_empty() {
                    None
                } else {
                    Some(Self::Composite(entries))
                }
            }
            other => numeric_value(other).map(Self::Scalar),
        }
    }

    /// Scalar used for magnitude-based scaling: the first component of a
    /// composite reading.
    pub fn representative(&self) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Composite(entries) => entries.first().map(|(_, v)| *v).unwrap_or(0.0),
        }
    }

    /// Label text, e.g. `145` or `152/94`.
    pub fn display(&self) -> String {
        match self {
            Self::Scalar(value) => format_numeric(*value),
            Self::Composite(entries) => entries
                .iter()
                .map(|(_, v)| format_numeric(*v))
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

impl Serialize for PatientValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(value) => serializer.serialize_f64(*value),
            Self::Composite(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PatientValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).ok_or_else(|| {
            de::Error::custom("patientValue must be a number or an object of numbers")
        })
    }
}

/// One laboratory or measurement result extracted from a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub test_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub visualization_type: VisualizationKind,
    pub patient_value: PatientValue,
    pub normal_min: f64,
    pub normal_max: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub historical_values: Vec<f64>,
    #[serde(default)]
    pub organ_affected: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub icon: Option<String>,
}

impl TestRecord {
    /// Check the invariants every record in a report must hold.
    pub fn validate(&self) -> Result<(), VitalViewError> {
        if self.test_name.trim().is_empty() {
            return Err(VitalViewError::InvalidRecord("testName is empty".into()));
        }
        if !self.normal_min.is_finite() || !self.normal_max.is_finite() {
            return Err(VitalViewError::InvalidRecord(format!(
                "{}: normal range is not numeric",
                self.test_name
            )));
        }
        if self.normal_min > self.normal_max {
            return Err(VitalViewError::InvalidRecord(format!(
                "{}: normalMin {} exceeds normalMax {}",
                self.test_name, self.normal_min, self.normal_max
            )));
        }
        Ok(())
    }
}

/// Structured payload extracted from one model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportVisualization {
    pub report_type: ReportType,
    pub affected_organs: Vec<String>,
    pub tests: Vec<TestRecord>,
}

impl ReportVisualization {
    /// Organ names capitalised for chips, e.g. `liver` -> `Liver`.
    pub fn organ_labels(&self) -> Vec<String> {
        self.affected_organs.iter().map(|o| capitalize_first(o)).collect()
    }
}

/// Labelled cut-off parsed from a visual-aid instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    pub label: String,
    pub value: f64,
    pub color: String,
}

/// Simplified per-test record recovered from the markdown summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisualAid {
    pub test_name: String,
    pub patient_value: f64,
    pub unit: String,
    pub normal_min: f64,
    pub normal_max: f64,
    pub chart_type: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
    pub raw_text: String,
}

/// Where the visual data came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum VisualizationOutcome {
    Structured(ReportVisualization),
    Fallback(Vec<VisualAid>),
    /// Nothing usable; the UI shows its neutral "no data" state.
    Empty,
}

/// Headline counters shown above the charts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportOverview {
    pub tests_analyzed: usize,
    pub normal_results: usize,
    pub needs_attention: usize,
}

/// Final result of analysing one model response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportAnalysis {
    pub generated_at: DateTime<Utc>,
    /// Human-readable summary with the VIZDATA block removed.
    pub summary: String,
    pub outcome: VisualizationOutcome,
    pub overview: ReportOverview,
}

impl ReportAnalysis {
    pub fn new(summary: String, outcome: VisualizationOutcome, overview: ReportOverview) -> Self {
        Self {
            generated_at: Utc::now(),
            summary,
            outcome,
            overview,
        }
    }

    pub fn visualization(&self) -> Option<&ReportVisualization> {
        match &self.outcome {
            VisualizationOutcome::Structured(report) => Some(report),
            _ => None,
        }
    }

    pub fn visual_aids(&self) -> &[VisualAid] {
        match &self.outcome {
            VisualizationOutcome::Fallback(aids) => aids,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.outcome, VisualizationOutcome::Empty)
    }
}

/// Recoverable failures inside the pipeline. None of them escape the public
/// entry points; they are logged and the affected piece is dropped.
#[derive(Debug, thiserror::Error)]
pub enum VitalViewError {
    #[error("malformed VIZDATA block: {0}")]
    MalformedBlock(String),
    #[error("malformed visual aid section: {0}")]
    MalformedSection(String),
    #[error("invalid test record: {0}")]
    InvalidRecord(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Accept JSON numbers and numeric strings; reject anything non-finite.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub(crate) fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
