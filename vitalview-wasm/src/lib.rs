//! Framework-neutral WASM <-> JavaScript bridge.

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use vitalview_core::chart::visual_aid_chart as build_visual_aid_chart;
use vitalview_core::{render_test, TestRecord, VisualAid, VisualizationConfig, VitalViewError};
use vitalview_llm::{clean_response_text, prepare_speech_text};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsVisualizationConfig {
    #[serde(default)]
    min_visible_fraction: Option<f64>,
    #[serde(default)]
    patient_headroom: Option<f64>,
    #[serde(default)]
    normal_headroom: Option<f64>,
    #[serde(default)]
    borderline_margin: Option<f64>,
    #[serde(default)]
    speech_max_chars: Option<usize>,
}

impl From<JsVisualizationConfig> for VisualizationConfig {
    fn from(cfg: JsVisualizationConfig) -> Self {
        let mut base = VisualizationConfig::default();
        if let Some(fraction) = cfg.min_visible_fraction {
            base.min_visible_fraction = fraction;
        }
        if let Some(headroom) = cfg.patient_headroom {
            base.patient_headroom = headroom;
        }
        if let Some(headroom) = cfg.normal_headroom {
            base.normal_headroom = headroom;
        }
        if let Some(margin) = cfg.borderline_margin {
            base.borderline_margin = margin;
        }
        if let Some(chars) = cfg.speech_max_chars {
            base.speech_max_chars = chars;
        }
        base
    }
}

/// Analyse a raw model response into `{ generatedAt, summary, outcome, overview }`.
#[wasm_bindgen(js_name = analyzeResponse)]
pub fn analyze_response(response: &str) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let analysis = vitalview_llm::analyze_response(response);
    to_plain_js(&analysis, "analysis")
}

/// Card and chart data for one structured test record.
#[wasm_bindgen(js_name = chartForTest)]
pub fn chart_for_test(test: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let test: TestRecord = from_value(test)
        .map_err(|err| JsValue::from_str(&format!("cannot read test record: {err}")))?;
    test.validate().map_err(to_js_error)?;

    let cfg = read_config(config)?;
    to_plain_js(&render_test(&test, &cfg), "card")
}

/// Radial ring plus comparison bars for one fallback record.
#[wasm_bindgen(js_name = visualAidChart)]
pub fn visual_aid_chart(aid: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let aid: VisualAid = from_value(aid)
        .map_err(|err| JsValue::from_str(&format!("cannot read visual aid: {err}")))?;

    let cfg = read_config(config)?;
    to_plain_js(&build_visual_aid_chart(&aid, &cfg), "chart")
}

#[wasm_bindgen(js_name = cleanText)]
pub fn clean_text(raw: &str) -> String {
    clean_response_text(raw)
}

/// Speech-ready text; `maxChars` falls back to the default budget.
#[wasm_bindgen(js_name = speechText)]
pub fn speech_text(raw: &str, max_chars: Option<usize>) -> String {
    let budget = max_chars.unwrap_or_else(|| VisualizationConfig::default().speech_max_chars);
    prepare_speech_text(raw, budget)
}

fn read_config(config: Option<JsValue>) -> Result<VisualizationConfig, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsVisualizationConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("cannot read config: {err}")))?;
            VisualizationConfig::from(cfg)
        }
        _ => VisualizationConfig::default(),
    };
    cfg.validate().map_err(to_js_error)?;
    Ok(cfg)
}

/// Maps become plain objects (not ES `Map`s) so composite readings read as
/// `{ systolic, diastolic }` on the JS side.
fn to_plain_js<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("cannot serialize {what}: {err}")))
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: VitalViewError) -> JsValue {
    JsValue::from_str(&format_vitalview_error(err))
}

fn format_vitalview_error(err: VitalViewError) -> String {
    format!("VitalView error: {err}")
}
