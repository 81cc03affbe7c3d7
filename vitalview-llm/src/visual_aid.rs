//! Fallback recovery of chart data from the markdown summary.
//!
//! The summary template gives every abnormal result its own subsection:
//!
//! ```text
//! ### 🔹 Glucose: 145 mg/dL
//! **Normal range:**
//! 70 – 100
//!
//! ### 📊 Visual Aid Instruction
//! - **Type:** gauge
//! - **Thresholds:** Normal: 70-100 | Diabetic: 126+
//! - **Caption:** Elevated glucose
//! ```
//!
//! Lines are fed through a small state machine (`Outside` → `InSection` ⇄
//! `InVisualAid`). A subsection that does not fit the template is logged and
//! skipped; it never affects its neighbours.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use vitalview_core::{RangeStatus, Threshold, VisualAid, VitalViewError};

const SECTION_MARKER: &str = "### 🔹";
const VISUAL_AID_MARKER: &str = "### 📊 Visual Aid Instruction";
const DEFAULT_CHART_TYPE: &str = "bar chart";

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?):\s*(.+?)\s*$").expect("valid regex"));
static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*([a-zA-Z/%]+)").expect("valid regex"));
static NORMAL_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*\*Normal range:\*\*(.*)$").expect("valid regex"));
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*[-–]\s*([\d.]+)").expect("valid regex"));
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[-•]\s*\*\*(type|caption|thresholds):\*\*(.*)$").expect("valid regex")
});
static THRESHOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?):\s*([\d.]+)(?:-[\d.]+)?").expect("valid regex"));

/// Scan the summary for visual-aid subsections, in document order.
pub fn parse_visual_aids(summary: &str) -> Vec<VisualAid> {
    let mut aids = Vec::new();
    let mut state = ParserState::Outside;
    for line in summary.lines() {
        state = state.step(line, &mut aids);
    }
    state.finish(&mut aids);
    debug!(records = aids.len(), "parsed visual aid sections");
    aids
}

enum ParserState {
    /// Before the first subsection marker.
    Outside,
    InSection(SectionDraft),
    InVisualAid(SectionDraft),
}

impl ParserState {
    fn step(self, line: &str, aids: &mut Vec<VisualAid>) -> Self {
        if let Some(idx) = line.find(SECTION_MARKER) {
            self.finish(aids);
            return Self::InSection(SectionDraft::new(&line[idx + SECTION_MARKER.len()..]));
        }

        match self {
            Self::Outside => Self::Outside,
            Self::InSection(mut draft) => {
                if line.contains(VISUAL_AID_MARKER) {
                    draft.has_visual_aid = true;
                    Self::InVisualAid(draft)
                } else {
                    draft.section_line(line);
                    Self::InSection(draft)
                }
            }
            Self::InVisualAid(mut draft) => {
                if line.contains(VISUAL_AID_MARKER) {
                    Self::InVisualAid(draft)
                } else if line.trim_start().starts_with("###") {
                    Self::InSection(draft)
                } else {
                    draft.visual_aid_line(line);
                    Self::InVisualAid(draft)
                }
            }
        }
    }

    fn finish(self, aids: &mut Vec<VisualAid>) {
        let draft = match self {
            Self::Outside => return,
            Self::InSection(draft) | Self::InVisualAid(draft) => draft,
        };
        let heading = draft.heading.clone();
        match draft.build() {
            Ok(aid) => aids.push(aid),
            Err(err) => warn!(heading = %heading, error = %err, "skipping visual aid section"),
        }
    }
}

#[derive(Debug, Default)]
struct SectionDraft {
    heading: String,
    range_text: Option<String>,
    awaiting_range: bool,
    has_visual_aid: bool,
    chart_type: Option<String>,
    caption: Option<String>,
    thresholds: Option<String>,
    raw_lines: Vec<String>,
}

impl SectionDraft {
    fn new(heading: &str) -> Self {
        Self {
            heading: heading.trim().to_string(),
            ..Self::default()
        }
    }

    /// The range sits either after the label or on the next non-blank line.
    fn section_line(&mut self, line: &str) {
        if self.range_text.is_some() {
            return;
        }
        if self.awaiting_range {
            if !line.trim().is_empty() {
                self.range_text = Some(line.trim().to_string());
                self.awaiting_range = false;
            }
            return;
        }
        if let Some(caps) = NORMAL_RANGE_RE.captures(line) {
            let rest = caps[1].trim();
            if rest.is_empty() {
                self.awaiting_range = true;
            } else {
                self.range_text = Some(rest.to_string());
            }
        }
    }

    fn visual_aid_line(&mut self, line: &str) {
        self.raw_lines.push(line.to_string());
        let Some(caps) = FIELD_RE.captures(line) else {
            return;
        };
        let value = caps[2].trim();
        let slot = match caps[1].to_lowercase().as_str() {
            "type" => &mut self.chart_type,
            "caption" => &mut self.caption,
            _ => &mut self.thresholds,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    fn build(self) -> Result<VisualAid, VitalViewError> {
        let malformed = |reason: String| VitalViewError::MalformedSection(reason);

        let heading = HEADING_RE
            .captures(&self.heading)
            .ok_or_else(|| malformed(format!("heading `{}` is not `name: value`", self.heading)))?;
        let test_name = heading[1].trim().to_string();

        let value_caps = VALUE_RE
            .captures(&heading[2])
            .ok_or_else(|| malformed(format!("{test_name}: no value with unit")))?;
        let patient_value = parse_number(&value_caps[1])
            .ok_or_else(|| malformed(format!("{test_name}: value `{}`", &value_caps[1])))?;
        let unit = value_caps[2].to_string();

        let range_text = self
            .range_text
            .ok_or_else(|| malformed(format!("{test_name}: missing normal range")))?;
        let range = RANGE_RE
            .captures(&range_text)
            .ok_or_else(|| malformed(format!("{test_name}: range `{range_text}`")))?;
        let (normal_min, normal_max) = parse_number(&range[1])
            .zip(parse_number(&range[2]))
            .ok_or_else(|| malformed(format!("{test_name}: range `{range_text}`")))?;
        if normal_min > normal_max {
            return Err(malformed(format!(
                "{test_name}: normal range {normal_min} > {normal_max}"
            )));
        }

        if !self.has_visual_aid {
            return Err(malformed(format!(
                "{test_name}: no visual aid instruction"
            )));
        }

        Ok(VisualAid {
            test_name,
            patient_value,
            unit,
            normal_min,
            normal_max,
            chart_type: self
                .chart_type
                .map(|t| strip_decorations(&t))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_CHART_TYPE.to_string()),
            caption: self
                .caption
                .map(|c| strip_decorations(&c))
                .filter(|c| !c.is_empty()),
            thresholds: self
                .thresholds
                .as_deref()
                .map(parse_thresholds)
                .unwrap_or_default(),
            raw_text: self.raw_lines.join("\n").trim().to_string(),
        })
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn strip_decorations(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '[' | ']'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `Normal: 70-100 | Prediabetic: 100-125 | Diabetic: 126+`
fn parse_thresholds(text: &str) -> Vec<Threshold> {
    text.split('|')
        .filter_map(|part| {
            let caps = THRESHOLD_RE.captures(part)?;
            let value = parse_number(&caps[2])?;
            let label = strip_decorations(&caps[1]);
            if label.is_empty() {
                return None;
            }
            let lower = part.to_lowercase();
            let color = if lower.contains("normal") {
                RangeStatus::Normal.color()
            } else if lower.contains("borderline") {
                RangeStatus::Borderline.color()
            } else {
                RangeStatus::High.color()
            };
            Some(Threshold {
                label,
                value,
                color: color.to_string(),
            })
        })
        .collect()
}
