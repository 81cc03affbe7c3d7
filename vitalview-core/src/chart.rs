//! Numeric series behind each chart family.

use serde::Serialize;

use crate::severity::{classify_range, range_position, RangePosition, RangeStatus};
use crate::{capitalize_first, Severity, TestRecord, VisualAid, VisualizationConfig};

/// Fill used for the reference (low/high) bars of a comparison chart.
pub const REFERENCE_GRAY: &str = "#94a3b8";

const DEFAULT_ORGAN: &str = "general";
const DEFAULT_ICON: &str = "🩺";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub color: Option<&'static str>,
}

impl ChartPoint {
    fn plain(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            color: None,
        }
    }

    fn colored(label: impl Into<String>, value: f64, color: &'static str) -> Self {
        Self {
            label: label.into(),
            value,
            color: Some(color),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityFillChart {
    pub filled_fraction: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RadialGaugeChart {
    pub percentage: f64,
    pub normal_min_percent: f64,
    pub normal_max_percent: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendLineChart {
    pub points: Vec<ChartPoint>,
    pub axis_max: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalIndicatorChart {
    pub organ: String,
    pub organ_label: String,
    pub icon: String,
    pub severity: Severity,
    pub status_label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonBarChart {
    pub points: Vec<ChartPoint>,
    pub axis_max: f64,
}

/// Chart selected for a structured test record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    CapacityFill(CapacityFillChart),
    RadialGauge(RadialGaugeChart),
    TrendLine(TrendLineChart),
    CategoricalIndicator(CategoricalIndicatorChart),
    ComparisonBar(ComparisonBarChart),
}

/// Everything the simplified card needs for one fallback record: a radial
/// progress ring plus a low/you/high comparison.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisualAidChart {
    pub status: RangeStatus,
    pub status_label: &'static str,
    pub position: RangePosition,
    pub position_label: &'static str,
    pub color: &'static str,
    pub percentage: f64,
    pub comparison: ComparisonBarChart,
}

/// Full-scale maximum of a capacity or gauge indicator.
///
/// Sized from both the patient value and the upper normal bound so that an
/// abnormally high value lands around the middle of the scale instead of
/// pegging it.
pub fn full_scale_max(value: f64, normal_max: f64, config: &VisualizationConfig) -> f64 {
    (value * config.patient_headroom).max(normal_max * config.normal_headroom)
}

/// Share of the scale to fill, floored at `min_visible_fraction` and capped at 1.
///
/// Never panics, even for a config that would fail `validate()`.
pub fn filled_fraction(value: f64, normal_max: f64, config: &VisualizationConfig) -> f64 {
    // NaN.min(1.0) is 1.0, so the floor is always a usable number.
    let floor = config.min_visible_fraction.min(1.0);
    let scale = full_scale_max(value, normal_max, config);
    if !scale.is_finite() || scale <= 0.0 {
        return floor;
    }
    let raw = value / scale;
    if !raw.is_finite() {
        return floor;
    }
    raw.max(floor).min(1.0)
}

fn percent_of_scale(part: f64, scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        part / scale * 100.0
    } else {
        0.0
    }
}

pub fn capacity_fill(test: &TestRecord, config: &VisualizationConfig) -> CapacityFillChart {
    let value = test.patient_value.representative();
    CapacityFillChart {
        filled_fraction: filled_fraction(value, test.normal_max, config),
        color: test.severity.color(),
    }
}

pub fn radial_gauge(test: &TestRecord, config: &VisualizationConfig) -> RadialGaugeChart {
    let value = test.patient_value.representative();
    let scale = full_scale_max(value, test.normal_max, config);
    RadialGaugeChart {
        percentage: filled_fraction(value, test.normal_max, config) * 100.0,
        normal_min_percent: percent_of_scale(test.normal_min, scale),
        normal_max_percent: percent_of_scale(test.normal_max, scale),
        color: test.severity.color(),
    }
}

/// Historical series when present, otherwise a synthetic previous/current pair
/// starting from the middle of the normal range.
pub fn trend_line(test: &TestRecord) -> TrendLineChart {
    let value = test.patient_value.representative();
    let points = if test.historical_values.is_empty() {
        let midpoint = test.normal_min + (test.normal_max - test.normal_min) / 2.0;
        vec![
            ChartPoint::plain("Previous", midpoint),
            ChartPoint::plain("Current", value),
        ]
    } else {
        test.historical_values
            .iter()
            .enumerate()
            .map(|(idx, v)| ChartPoint::plain(format!("Test {}", idx + 1), *v))
            .collect()
    };

    TrendLineChart {
        points,
        axis_max: (test.normal_max * 1.5).max(value * 1.2),
        color: test.severity.color(),
    }
}

pub fn categorical_indicator(test: &TestRecord) -> CategoricalIndicatorChart {
    let organ = test
        .organ_affected
        .as_deref()
        .map(str::trim)
        .filter(|organ| !organ.is_empty())
        .unwrap_or(DEFAULT_ORGAN)
        .to_string();
    let icon = test
        .icon
        .clone()
        .filter(|icon| !icon.trim().is_empty())
        .unwrap_or_else(|| organ_icon(&organ).to_string());

    CategoricalIndicatorChart {
        organ_label: format!("Affects: {}", capitalize_first(&organ)),
        organ,
        icon,
        severity: test.severity,
        status_label: format!("{} Status", test.severity.label()),
    }
}

pub fn comparison_bar(
    value: f64,
    normal_min: f64,
    normal_max: f64,
    color: &'static str,
) -> ComparisonBarChart {
    ComparisonBarChart {
        points: vec![
            ChartPoint::colored("Low", normal_min, REFERENCE_GRAY),
            ChartPoint::colored("You", value, color),
            ChartPoint::colored("High", normal_max, REFERENCE_GRAY),
        ],
        axis_max: value.max(normal_max) * 1.2,
    }
}

pub fn visual_aid_chart(aid: &VisualAid, config: &VisualizationConfig) -> VisualAidChart {
    let status = classify_range(aid.patient_value, aid.normal_min, aid.normal_max, config);
    let position = range_position(aid.patient_value, aid.normal_min, aid.normal_max);
    let color = status.color();
    VisualAidChart {
        status,
        status_label: status.label(),
        position,
        position_label: position.label(),
        color,
        percentage: percent_of_scale(
            aid.patient_value,
            full_scale_max(aid.patient_value, aid.normal_max, config),
        ),
        comparison: comparison_bar(aid.patient_value, aid.normal_min, aid.normal_max, color),
    }
}

/// Display glyph for an organ name; unknown organs get a stethoscope.
pub fn organ_icon(organ: &str) -> &'static str {
    match organ.trim().to_lowercase().as_str() {
        "heart" => "🫀",
        "liver" | "kidney" | "lungs" => "🫁",
        "pancreas" => "🩸",
        "thyroid" | "brain" => "🧠",
        "stomach" => "🫃",
        _ => DEFAULT_ICON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PatientValue, VisualizationKind};
    use proptest::prelude::*;

    fn glucose() -> TestRecord {
        TestRecord {
            test_name: "Glucose".into(),
            category: "metabolic".into(),
            visualization_type: VisualizationKind::CapacityFill,
            patient_value: PatientValue::Scalar(145.0),
            normal_min: 70.0,
            normal_max: 100.0,
            unit: "mg/dL".into(),
            trend: None,
            historical_values: Vec::new(),
            organ_affected: Some("pancreas".into()),
            severity: Severity::Concerning,
            icon: None,
        }
    }

    #[test]
    fn high_value_stays_inside_legible_band() {
        let config = VisualizationConfig::default();
        let fraction = filled_fraction(300.0, 100.0, &config);
        assert!((fraction - 300.0 / 450.0).abs() < 1e-9);
        assert!(fraction > 0.5 && fraction < 0.7);
    }

    #[test]
    fn tiny_value_is_floored_to_visible_fraction() {
        let config = VisualizationConfig::default();
        assert_eq!(filled_fraction(1.0, 100.0, &config), 0.1);
        assert_eq!(filled_fraction(0.0, 0.0, &config), 0.1);
    }

    #[test]
    fn unvalidated_floor_does_not_panic() {
        let config = VisualizationConfig {
            min_visible_fraction: 1.5,
            ..VisualizationConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(filled_fraction(50.0, 100.0, &config), 1.0);

        let config = VisualizationConfig {
            min_visible_fraction: f64::NAN,
            ..VisualizationConfig::default()
        };
        assert_eq!(filled_fraction(50.0, 100.0, &config), 1.0);
        let gauge = radial_gauge(&glucose(), &config);
        assert_eq!(gauge.percentage, 100.0);
    }

    #[test]
    fn capacity_fill_uses_severity_colour() {
        let chart = capacity_fill(&glucose(), &VisualizationConfig::default());
        assert_eq!(chart.color, "#ea580c");
        assert!((chart.filled_fraction - 145.0 / 217.5).abs() < 1e-9);
    }

    #[test]
    fn gauge_reports_normal_band_on_same_scale() {
        let chart = radial_gauge(&glucose(), &VisualizationConfig::default());
        assert!((chart.normal_min_percent - 70.0 / 217.5 * 100.0).abs() < 1e-9);
        assert!((chart.normal_max_percent - 100.0 / 217.5 * 100.0).abs() < 1e-9);
        assert!((chart.percentage - 145.0 / 217.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn composite_value_scales_by_first_component() {
        let mut test = glucose();
        test.patient_value = PatientValue::Composite(vec![
            ("systolic".into(), 152.0),
            ("diastolic".into(), 94.0),
        ]);
        test.normal_min = 90.0;
        test.normal_max = 120.0;
        let chart = capacity_fill(&test, &VisualizationConfig::default());
        // max(152 * 1.5, 120 * 2.0) = 240
        assert!((chart.filled_fraction - 152.0 / 240.0).abs() < 1e-9);
    }

    #[test]
    fn trend_without_history_uses_range_midpoint() {
        let chart = trend_line(&glucose());
        assert_eq!(
            chart.points,
            vec![
                ChartPoint::plain("Previous", 85.0),
                ChartPoint::plain("Current", 145.0),
            ]
        );
        assert!((chart.axis_max - 174.0).abs() < 1e-9);
    }

    #[test]
    fn trend_with_history_labels_each_test() {
        let mut test = glucose();
        test.historical_values = vec![120.0, 135.0, 145.0];
        let chart = trend_line(&test);
        let labels: Vec<_> = chart.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Test 1", "Test 2", "Test 3"]);
    }

    #[test]
    fn indicator_falls_back_to_organ_glyph() {
        let chart = categorical_indicator(&glucose());
        assert_eq!(chart.icon, "🩸");
        assert_eq!(chart.organ_label, "Affects: Pancreas");
        assert_eq!(chart.status_label, "Concerning Status");

        let mut unknown = glucose();
        unknown.organ_affected = None;
        unknown.icon = Some("💊".into());
        let chart = categorical_indicator(&unknown);
        assert_eq!(chart.organ, "general");
        assert_eq!(chart.icon, "💊");
    }

    #[test]
    fn comparison_bar_highlights_patient_point() {
        let chart = comparison_bar(145.0, 70.0, 100.0, Severity::Concerning.color());
        assert_eq!(chart.points[0].color, Some(REFERENCE_GRAY));
        assert_eq!(chart.points[1].label, "You");
        assert_eq!(chart.points[1].color, Some("#ea580c"));
        assert_eq!(chart.points[2].value, 100.0);
        assert!((chart.axis_max - 174.0).abs() < 1e-9);
    }

    #[test]
    fn visual_aid_chart_colours_by_range_status() {
        let aid = VisualAid {
            test_name: "Glucose".into(),
            patient_value: 145.0,
            unit: "mg/dL".into(),
            normal_min: 70.0,
            normal_max: 100.0,
            chart_type: "gauge".into(),
            caption: None,
            thresholds: Vec::new(),
            raw_text: String::new(),
        };
        let chart = visual_aid_chart(&aid, &VisualizationConfig::default());
        assert_eq!(chart.status, RangeStatus::High);
        assert_eq!(chart.status_label, "HIGH");
        assert_eq!(chart.position, RangePosition::Above);
        assert_eq!(chart.position_label, "Above Normal Range");
        assert_eq!(chart.color, "#ef4444");
        assert_eq!(chart.comparison.points[1].color, Some("#ef4444"));
    }

    proptest! {
        #[test]
        fn filled_fraction_stays_in_visible_range(
            value in 0.0f64..1.0e6,
            normal_max in 1.0e-3f64..1.0e6,
        ) {
            let fraction = filled_fraction(value, normal_max, &VisualizationConfig::default());
            prop_assert!((0.1..=1.0).contains(&fraction));
        }
    }
}
