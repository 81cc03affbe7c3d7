//! The `<VIZDATA>` block: structured chart metadata the model emits ahead of
//! the patient-facing summary.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use vitalview_core::severity::resolve_severity;
use vitalview_core::{
    numeric_value, resolve_kind, PatientValue, ReportType, ReportVisualization, TestRecord, Trend,
    VitalViewError,
};

pub const OPEN_MARKER: &str = "<VIZDATA>";
pub const CLOSE_MARKER: &str = "</VIZDATA>";

/// Result of pulling the block out of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct VizExtraction {
    pub viz_data: Option<ReportVisualization>,
    /// Response text without the block. Identical to the input when no
    /// complete block was present.
    pub clean_summary: String,
}

/// Locate, parse and strip the first VIZDATA block. Never fails: a block that
/// does not parse is logged and dropped from the summary all the same.
pub fn extract_viz_data(response: &str) -> VizExtraction {
    let Some((payload, clean_summary)) = split_block(response) else {
        return VizExtraction {
            viz_data: None,
            clean_summary: response.to_string(),
        };
    };

    let viz_data = match parse_report(payload) {
        Ok(report) => {
            debug!(
                tests = report.tests.len(),
                organs = report.affected_organs.len(),
                "extracted VIZDATA block"
            );
            Some(report)
        }
        Err(err) => {
            warn!(error = %err, "discarding VIZDATA block");
            None
        }
    };

    VizExtraction {
        viz_data,
        clean_summary,
    }
}

fn split_block(response: &str) -> Option<(&str, String)> {
    let start = response.find(OPEN_MARKER)?;
    let content_start = start + OPEN_MARKER.len();
    let content_end = content_start + response[content_start..].find(CLOSE_MARKER)?;
    let block_end = content_end + CLOSE_MARKER.len();

    let mut summary = String::with_capacity(response.len() - (block_end - start));
    summary.push_str(&response[..start]);
    summary.push_str(&response[block_end..]);

    Some((
        &response[content_start..content_end],
        summary.trim().to_string(),
    ))
}

/// Models sometimes wrap the payload in a ```json fence even inside the tags.
fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the JSON payload. Individual tests that fail are dropped; only a
/// payload that is not a JSON object at all is an error.
pub fn parse_report(payload: &str) -> Result<ReportVisualization, VitalViewError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawReport {
        report_type: Option<Value>,
        affected_organs: Option<Vec<Value>>,
        tests: Option<Vec<Value>>,
    }

    let value: Value = serde_json::from_str(strip_code_fence(payload))
        .map_err(|err| VitalViewError::MalformedBlock(err.to_string()))?;
    if !value.is_object() {
        return Err(VitalViewError::MalformedBlock(
            "payload is not a JSON object".into(),
        ));
    }
    let raw = RawReport::deserialize(&value)
        .map_err(|err| VitalViewError::MalformedBlock(err.to_string()))?;

    let report_type = raw
        .report_type
        .as_ref()
        .and_then(Value::as_str)
        .and_then(ReportType::from_label)
        .unwrap_or_default();

    let mut affected_organs: Vec<String> = Vec::new();
    for organ in raw.affected_organs.iter().flatten().filter_map(Value::as_str) {
        let organ = organ.trim();
        if !organ.is_empty() && !affected_organs.iter().any(|seen| seen == organ) {
            affected_organs.push(organ.to_string());
        }
    }

    let mut tests: Vec<TestRecord> = Vec::new();
    for (index, value) in raw.tests.iter().flatten().enumerate() {
        match parse_test(value) {
            Ok(test) if tests.iter().any(|seen| seen.test_name == test.test_name) => {
                warn!(index, test_name = %test.test_name, "dropping duplicate test record");
            }
            Ok(test) => tests.push(test),
            Err(err) => warn!(index, error = %err, "dropping test record"),
        }
    }

    Ok(ReportVisualization {
        report_type,
        affected_organs,
        tests,
    })
}

fn parse_test(value: &Value) -> Result<TestRecord, VitalViewError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawTest {
        test_name: Option<String>,
        category: Option<String>,
        visualization_type: Option<String>,
        patient_value: Option<Value>,
        normal_min: Option<Value>,
        normal_max: Option<Value>,
        unit: Option<String>,
        trend: Option<String>,
        historical_values: Option<Vec<Value>>,
        organ_affected: Option<String>,
        severity: Option<String>,
        icon: Option<String>,
    }

    let raw = RawTest::deserialize(value)
        .map_err(|err| VitalViewError::InvalidRecord(err.to_string()))?;

    let test_name = raw
        .test_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| VitalViewError::InvalidRecord("missing testName".into()))?;

    let patient_value = raw
        .patient_value
        .as_ref()
        .and_then(PatientValue::from_json)
        .ok_or_else(|| {
            VitalViewError::InvalidRecord(format!("{test_name}: patientValue is not numeric"))
        })?;

    let bound = |field: &Option<Value>, name: &str| {
        field.as_ref().and_then(numeric_value).ok_or_else(|| {
            VitalViewError::InvalidRecord(format!("{test_name}: {name} is missing or not numeric"))
        })
    };
    let normal_min = bound(&raw.normal_min, "normalMin")?;
    let normal_max = bound(&raw.normal_max, "normalMax")?;

    let record = TestRecord {
        category: raw.category.unwrap_or_default(),
        visualization_type: resolve_kind(raw.visualization_type.as_deref()),
        patient_value,
        normal_min,
        normal_max,
        unit: raw.unit.unwrap_or_default(),
        trend: raw.trend.as_deref().and_then(Trend::from_label),
        historical_values: raw
            .historical_values
            .iter()
            .flatten()
            .filter_map(numeric_value)
            .collect(),
        organ_affected: raw
            .organ_affected
            .map(|organ| organ.trim().to_string())
            .filter(|organ| !organ.is_empty()),
        severity: resolve_severity(raw.severity.as_deref()),
        icon: raw.icon.filter(|icon| !icon.trim().is_empty()),
        test_name,
    };
    record.validate()?;
    Ok(record)
}
