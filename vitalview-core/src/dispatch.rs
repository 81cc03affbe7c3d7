//! Chart selection from the declared `visualizationType`.

use serde::Serialize;

use crate::chart::{self, ChartSpec};
use crate::{format_numeric, Severity, TestRecord, VisualizationConfig, VisualizationKind};

impl VisualizationKind {
    /// Exact match against the payload labels and the canonical kind names.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "test_tube" | "capacity_fill" => Some(Self::CapacityFill),
            "gauge" | "radial_gauge" => Some(Self::RadialGauge),
            "line_graph" | "trend_line" => Some(Self::TrendLine),
            "organ_diagram" | "categorical_indicator" => Some(Self::CategoricalIndicator),
            "comparison_bar" => Some(Self::ComparisonBar),
            _ => None,
        }
    }
}

/// Unknown or missing labels render as a radial gauge.
pub fn resolve_kind(label: Option<&str>) -> VisualizationKind {
    label
        .and_then(VisualizationKind::from_label)
        .unwrap_or(VisualizationKind::RadialGauge)
}

/// Card content for one structured test: header fields plus the chart body.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCard {
    pub test_name: String,
    pub category: String,
    pub icon: String,
    pub display_value: String,
    pub unit: String,
    pub normal_range: String,
    pub severity: Severity,
    pub severity_color: &'static str,
    pub trend_label: Option<&'static str>,
    pub chart: ChartSpec,
}

pub fn render_chart(test: &TestRecord, config: &VisualizationConfig) -> ChartSpec {
    match test.visualization_type {
        VisualizationKind::CapacityFill => {
            ChartSpec::CapacityFill(chart::capacity_fill(test, config))
        }
        VisualizationKind::RadialGauge => {
            ChartSpec::RadialGauge(chart::radial_gauge(test, config))
        }
        VisualizationKind::TrendLine => ChartSpec::TrendLine(chart::trend_line(test)),
        VisualizationKind::CategoricalIndicator => {
            ChartSpec::CategoricalIndicator(chart::categorical_indicator(test))
        }
        VisualizationKind::ComparisonBar => ChartSpec::ComparisonBar(chart::comparison_bar(
            test.patient_value.representative(),
            test.normal_min,
            test.normal_max,
            test.severity.color(),
        )),
    }
}

pub fn render_test(test: &TestRecord, config: &VisualizationConfig) -> TestCard {
    let range = format!(
        "{} - {}",
        format_numeric(test.normal_min),
        format_numeric(test.normal_max)
    );
    TestCard {
        test_name: test.test_name.clone(),
        category: test.category.clone(),
        icon: test.icon.clone().unwrap_or_else(|| "🩺".to_string()),
        display_value: test.patient_value.display(),
        unit: test.unit.clone(),
        normal_range: if test.unit.is_empty() {
            range
        } else {
            format!("{range} {}", test.unit)
        },
        severity: test.severity,
        severity_color: test.severity.color(),
        trend_label: test.trend.map(|trend| trend.badge_label()),
        chart: render_chart(test, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PatientValue, Trend};

    fn record(kind: VisualizationKind) -> TestRecord {
        TestRecord {
            test_name: "Blood Pressure".into(),
            category: "cardiac".into(),
            visualization_type: kind,
            patient_value: PatientValue::Composite(vec![
                ("systolic".into(), 152.0),
                ("diastolic".into(), 94.0),
            ]),
            normal_min: 90.0,
            normal_max: 120.0,
            unit: "mmHg".into(),
            trend: Some(Trend::Increasing),
            historical_values: Vec::new(),
            organ_affected: Some("heart".into()),
            severity: Severity::Concerning,
            icon: None,
        }
    }

    #[test]
    fn unknown_or_missing_label_defaults_to_gauge() {
        assert_eq!(resolve_kind(None), VisualizationKind::RadialGauge);
        assert_eq!(resolve_kind(Some("progress_bar")), VisualizationKind::RadialGauge);
        assert_eq!(resolve_kind(Some("Test_Tube")), VisualizationKind::RadialGauge);
        assert_eq!(resolve_kind(Some("test_tube")), VisualizationKind::CapacityFill);
        assert_eq!(resolve_kind(Some("line_graph")), VisualizationKind::TrendLine);
        assert_eq!(
            resolve_kind(Some("organ_diagram")),
            VisualizationKind::CategoricalIndicator
        );
        assert_eq!(
            resolve_kind(Some("comparison_bar")),
            VisualizationKind::ComparisonBar
        );
    }

    #[test]
    fn each_kind_maps_to_its_chart() {
        let config = VisualizationConfig::default();
        let cases = [
            (VisualizationKind::CapacityFill, "capacity_fill"),
            (VisualizationKind::RadialGauge, "radial_gauge"),
            (VisualizationKind::TrendLine, "trend_line"),
            (VisualizationKind::CategoricalIndicator, "categorical_indicator"),
            (VisualizationKind::ComparisonBar, "comparison_bar"),
        ];
        for (kind, tag) in cases {
            let chart = render_chart(&record(kind), &config);
            let value = serde_json::to_value(&chart).unwrap();
            assert_eq!(value["kind"], tag);
        }
    }

    #[test]
    fn card_formats_composite_value_and_range() {
        let card = render_test(
            &record(VisualizationKind::RadialGauge),
            &VisualizationConfig::default(),
        );
        assert_eq!(card.display_value, "152/94");
        assert_eq!(card.normal_range, "90 - 120 mmHg");
        assert_eq!(card.trend_label, Some("Trending Up"));
        assert_eq!(card.icon, "🩺");
        match card.chart {
            ChartSpec::RadialGauge(gauge) => {
                assert!((gauge.percentage - 152.0 / 240.0 * 100.0).abs() < 1e-9)
            }
            other => panic!("expected gauge, got {other:?}"),
        }
    }
}
