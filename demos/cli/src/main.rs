use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vitalview_core::chart::visual_aid_chart;
use vitalview_core::{render_test, ReportAnalysis, VisualizationConfig, VisualizationOutcome};
use vitalview_llm::{analyze_response, speech_summary};

#[derive(Parser, Debug)]
#[command(
    name = "vitalview-cli",
    about = "Turn a model's medical report summary into chart-ready data."
)]
struct Args {
    /// Path to the raw model response (VIZDATA block and/or markdown summary).
    #[arg(short, long)]
    input: PathBuf,

    /// Print the full analysis and rendered charts as JSON.
    #[arg(long, conflicts_with = "speech")]
    json: bool,

    /// Print the speech-ready summary instead of the overview.
    #[arg(long)]
    speech: bool,

    /// Smallest fill fraction drawn for capacity and gauge charts, in (0, 1].
    #[arg(long)]
    min_visible_fraction: Option<f64>,

    /// Multiplier on the patient value when sizing a chart's full scale.
    #[arg(long)]
    patient_headroom: Option<f64>,

    /// Multiplier on the upper normal bound when sizing a chart's full scale.
    #[arg(long)]
    normal_headroom: Option<f64>,

    /// Relative band around the normal bounds treated as borderline.
    #[arg(long)]
    borderline_margin: Option<f64>,

    /// Character budget for `--speech` output.
    #[arg(long)]
    speech_max_chars: Option<usize>,
}

impl Args {
    fn config(&self) -> anyhow::Result<VisualizationConfig> {
        let mut config = VisualizationConfig::default();
        if let Some(fraction) = self.min_visible_fraction {
            config.min_visible_fraction = fraction;
        }
        if let Some(headroom) = self.patient_headroom {
            config.patient_headroom = headroom;
        }
        if let Some(headroom) = self.normal_headroom {
            config.normal_headroom = headroom;
        }
        if let Some(margin) = self.borderline_margin {
            config.borderline_margin = margin;
        }
        if let Some(chars) = self.speech_max_chars {
            config.speech_max_chars = chars;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read file {:?}", args.input))?;

    let analysis = analyze_response(&data);
    tracing::info!(
        source = ?args.input,
        tests = analysis.overview.tests_analyzed,
        "analysed response"
    );

    if args.speech {
        println!("{}", speech_summary(&analysis, &config));
    } else if args.json {
        let rendered = render_charts(&analysis, &config);
        let output = json!({ "analysis": analysis, "charts": rendered });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("cannot serialize analysis")?
        );
    } else {
        print_overview(&analysis);
    }

    Ok(())
}

fn render_charts(analysis: &ReportAnalysis, config: &VisualizationConfig) -> serde_json::Value {
    match &analysis.outcome {
        VisualizationOutcome::Structured(report) => json!(report
            .tests
            .iter()
            .map(|test| render_test(test, config))
            .collect::<Vec<_>>()),
        VisualizationOutcome::Fallback(aids) => json!(aids
            .iter()
            .map(|aid| visual_aid_chart(aid, config))
            .collect::<Vec<_>>()),
        VisualizationOutcome::Empty => json!([]),
    }
}

fn print_overview(analysis: &ReportAnalysis) {
    let source = match &analysis.outcome {
        VisualizationOutcome::Structured(_) => "VIZDATA block",
        VisualizationOutcome::Fallback(_) => "visual aid sections",
        VisualizationOutcome::Empty => "none",
    };
    let overview = &analysis.overview;
    println!("Generated at: {}", analysis.generated_at);
    println!("Data source: {source}");
    println!("Tests analysed: {}", overview.tests_analyzed);
    println!("Normal results: {}", overview.normal_results);
    println!("Needs attention: {}", overview.needs_attention);
    if let Some(report) = analysis.visualization() {
        if !report.affected_organs.is_empty() {
            println!("Affected organs: {}", report.organ_labels().join(", "));
        }
    }
}
