//! Range classification used by the simplified (fallback) chart path.
//!
//! The structured path never computes severity itself: it echoes whatever the
//! upstream model declared, see [`resolve_severity`].

use serde::{Deserialize, Serialize};

use crate::{Severity, VisualizationConfig};

/// Two-tier status of a value against its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeStatus {
    Low,
    Normal,
    High,
    Borderline,
}

impl RangeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Borderline => "BORDERLINE",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Low | Self::High => "#ef4444",
            Self::Borderline => "#eab308",
            Self::Normal => "#22c55e",
        }
    }
}

/// Classify `value` against `[normal_min, normal_max]`.
///
/// Checks run in a fixed order: out-of-range first, then the borderline bands
/// `[min * (1 - margin), min]` and `[max, max * (1 + margin)]`. Because the
/// out-of-range checks win, a borderline result is only produced for values
/// sitting exactly on a bound.
pub fn classify_range(
    value: f64,
    normal_min: f64,
    normal_max: f64,
    config: &VisualizationConfig,
) -> RangeStatus {
    let margin = config.borderline_margin;
    if value < normal_min {
        return RangeStatus::Low;
    }
    if value > normal_max {
        return RangeStatus::High;
    }
    if value >= normal_min * (1.0 - margin) && value <= normal_min {
        return RangeStatus::Borderline;
    }
    if value >= normal_max && value <= normal_max * (1.0 + margin) {
        return RangeStatus::Borderline;
    }
    RangeStatus::Normal
}

/// Inclusive position of a value relative to its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    Below,
    Within,
    Above,
}

impl RangePosition {
    pub fn label(self) -> &'static str {
        match self {
            Self::Below => "Below Normal Range",
            Self::Within => "Within Normal Range",
            Self::Above => "Above Normal Range",
        }
    }
}

pub fn range_position(value: f64, normal_min: f64, normal_max: f64) -> RangePosition {
    if value < normal_min {
        RangePosition::Below
    } else if value > normal_max {
        RangePosition::Above
    } else {
        RangePosition::Within
    }
}

/// Four-tier severity: the declared label when recognised, otherwise normal.
pub fn resolve_severity(label: Option<&str>) -> Severity {
    label.and_then(Severity::from_label).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(value: f64) -> RangeStatus {
        classify_range(value, 70.0, 100.0, &VisualizationConfig::default())
    }

    #[test]
    fn out_of_range_values_are_low_or_high() {
        assert_eq!(classify(69.0), RangeStatus::Low);
        assert_eq!(classify(145.0), RangeStatus::High);
        assert_eq!(classify(85.0), RangeStatus::Normal);
    }

    #[test]
    fn exact_bounds_land_in_borderline_bucket() {
        assert_eq!(classify(70.0), RangeStatus::Borderline);
        assert_eq!(classify(100.0), RangeStatus::Borderline);
        // Inclusive range check still treats the bound as in range.
        assert_eq!(range_position(70.0, 70.0, 100.0), RangePosition::Within);
    }

    #[test]
    fn just_below_minimum_is_low_not_borderline() {
        assert_eq!(classify(70.0 - 1e-9), RangeStatus::Low);
        assert_eq!(classify(100.0 + 1e-9), RangeStatus::High);
    }

    #[test]
    fn status_colours_follow_bucket() {
        assert_eq!(RangeStatus::Low.color(), RangeStatus::High.color());
        assert_eq!(RangeStatus::Borderline.color(), "#eab308");
        assert_eq!(RangeStatus::Normal.color(), "#22c55e");
    }

    #[test]
    fn severity_echoes_declared_label() {
        assert_eq!(resolve_severity(Some("critical")), Severity::Critical);
        assert_eq!(resolve_severity(Some("Concerning")), Severity::Concerning);
        assert_eq!(resolve_severity(Some("alarming")), Severity::Normal);
        assert_eq!(resolve_severity(None), Severity::Normal);
    }

    #[test]
    fn range_position_labels() {
        assert_eq!(range_position(50.0, 70.0, 100.0), RangePosition::Below);
        assert_eq!(range_position(120.0, 70.0, 100.0), RangePosition::Above);
        assert_eq!(RangePosition::Above.label(), "Above Normal Range");
    }
}
