//! Turn a raw model response into chart-ready report data.
//!
//! The response carries an optional `<VIZDATA>` JSON block followed by a
//! patient-facing markdown summary. The block is preferred; when it is absent,
//! broken or empty, per-test visual-aid subsections of the markdown are used
//! instead.

use tracing::debug;
use vitalview_core::{
    range_position, RangePosition, ReportAnalysis, ReportOverview, Severity, VisualizationConfig,
    VisualizationOutcome,
};

pub mod clean;
pub mod visual_aid;
pub mod vizdata;

pub use clean::{clean_response_text, prepare_speech_text};
pub use visual_aid::parse_visual_aids;
pub use vizdata::{extract_viz_data, parse_report, VizExtraction};

/// Analyse one model response. Never fails: every malformed piece degrades to
/// "no data" for that piece, and a response with nothing usable yields
/// [`VisualizationOutcome::Empty`].
pub fn analyze_response(response: &str) -> ReportAnalysis {
    let VizExtraction {
        viz_data,
        clean_summary,
    } = extract_viz_data(response);

    let outcome = match viz_data {
        Some(report) if !report.tests.is_empty() => VisualizationOutcome::Structured(report),
        _ => {
            let aids = parse_visual_aids(&clean_summary);
            if aids.is_empty() {
                VisualizationOutcome::Empty
            } else {
                VisualizationOutcome::Fallback(aids)
            }
        }
    };

    let overview = summarize_outcome(&outcome);
    debug!(
        tests = overview.tests_analyzed,
        needs_attention = overview.needs_attention,
        "analysed model response"
    );
    ReportAnalysis::new(clean_summary, outcome, overview)
}

/// Speech-ready summary of an analysis, bounded by the configured budget.
pub fn speech_summary(analysis: &ReportAnalysis, config: &VisualizationConfig) -> String {
    prepare_speech_text(&analysis.summary, config.speech_max_chars)
}

/// Headline counters. Structured tests count by declared severity; fallback
/// records count by the inclusive normal range.
pub fn summarize_outcome(outcome: &VisualizationOutcome) -> ReportOverview {
    let (tests_analyzed, normal_results) = match outcome {
        VisualizationOutcome::Structured(report) => (
            report.tests.len(),
            report
                .tests
                .iter()
                .filter(|test| test.severity == Severity::Normal)
                .count(),
        ),
        VisualizationOutcome::Fallback(aids) => (
            aids.len(),
            aids.iter()
                .filter(|aid| {
                    range_position(aid.patient_value, aid.normal_min, aid.normal_max)
                        == RangePosition::Within
                })
                .count(),
        ),
        VisualizationOutcome::Empty => (0, 0),
    };

    ReportOverview {
        tests_analyzed,
        normal_results,
        needs_attention: tests_analyzed - normal_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_block_wins_over_markdown() {
        let response = "<VIZDATA>{\"reportType\":\"blood_test\",\"tests\":[\
{\"testName\":\"Glucose\",\"patientValue\":145,\"normalMin\":70,\"normalMax\":100,\"severity\":\"concerning\"},\
{\"testName\":\"Sodium\",\"patientValue\":140,\"normalMin\":135,\"normalMax\":145,\"severity\":\"normal\"}]}</VIZDATA>\n\
### 🔹 Glucose: 145 mg/dL\n**Normal range:** 70 - 100\n### 📊 Visual Aid Instruction\n- **Type:** gauge\n";
        let analysis = analyze_response(response);
        let report = analysis.visualization().expect("structured outcome");
        assert_eq!(report.tests.len(), 2);
        assert!(analysis.visual_aids().is_empty());
        assert_eq!(
            analysis.overview,
            ReportOverview {
                tests_analyzed: 2,
                normal_results: 1,
                needs_attention: 1,
            }
        );
        assert!(analysis.summary.starts_with("### 🔹 Glucose"));
    }

    #[test]
    fn malformed_block_falls_back_to_markdown() {
        let response = "<VIZDATA>{\"tests\":[,]}</VIZDATA>\n\
### 🔹 Glucose: 145 mg/dL\n**Normal range:**\n70 – 100\n### 📊 Visual Aid Instruction\n- **Type:** gauge\n\
### 🔹 Sodium: 140 mmol/L\n**Normal range:** 135 - 145\n### 📊 Visual Aid Instruction\n";
        let analysis = analyze_response(response);
        assert!(analysis.visualization().is_none());
        assert_eq!(analysis.visual_aids().len(), 2);
        assert_eq!(analysis.overview.normal_results, 1);
        assert_eq!(analysis.overview.needs_attention, 1);
        assert!(!analysis.summary.contains("VIZDATA"));
    }

    #[test]
    fn empty_block_uses_markdown_records() {
        let response = "<VIZDATA>{\"reportType\":\"general\",\"tests\":[]}</VIZDATA>\n\
### 🔹 LDL: 160 mg/dL\n**Normal range:** 0 - 100\n### 📊 Visual Aid Instruction\n";
        let analysis = analyze_response(response);
        assert_eq!(analysis.visual_aids().len(), 1);
    }

    #[test]
    fn nothing_usable_is_an_empty_outcome() {
        let analysis = analyze_response("Unable to generate AI summary at this time.");
        assert!(analysis.is_empty());
        assert_eq!(analysis.overview, ReportOverview::default());
        assert_eq!(analysis.summary, "Unable to generate AI summary at this time.");
    }

    #[test]
    fn speech_summary_respects_budget() {
        let analysis = analyze_response(
            "# 🧪 Summary\nGlucose is high. Please follow up with your doctor soon.",
        );
        let config = VisualizationConfig {
            speech_max_chars: 30,
            ..VisualizationConfig::default()
        };
        assert_eq!(speech_summary(&analysis, &config), "Summary. Glucose is high.");
    }
}
