//! WASM bindings for pachinko data-display OCR.
//!
//! The browser runs OCR (or calls a vision service) and hands the text or
//! the raw response to these functions.

use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;

use pachi_core::ocr::DEFAULT_ROW_TOLERANCE;
use pachi_core::text::normalize;
use pachi_core::{
    build_extractor, extractor_from_config, Extractor, OcrDocument, PachiConfig, Polygon,
    StrategyKind, Token, Vertex,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Largest integer a JS number holds exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Plain JS objects rather than `Map`s, so results serialize with `JSON.stringify`.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let mut json = serde_json::to_value(value).map_err(js_error)?;
    widen_large_integers(&mut json);
    json.serialize(&Serializer::json_compatible()).map_err(js_error)
}

/// Misread counts past 2^53 go out as the nearest double instead of
/// failing the whole result.
fn widen_large_integers(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Number(number) => {
            let wide = number
                .as_u64()
                .filter(|&v| v > MAX_SAFE_INTEGER)
                .and_then(|v| serde_json::Number::from_f64(v as f64));
            if let Some(wide) = wide {
                *number = wide;
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(widen_large_integers),
        serde_json::Value::Object(map) => map.values_mut().for_each(widen_large_integers),
        _ => {}
    }
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Extract fields from OCR text with the default configuration.
#[wasm_bindgen]
pub fn extract_fields(text: &str) -> Result<JsValue, JsValue> {
    let extractor = extractor_from_config(&PachiConfig::default()).map_err(js_error)?;
    to_js(&extractor.extract_text(text))
}

/// Extract fields from a JSON OCR document or Vision response, using the
/// keyword strategy with the grid filling in what it misses.
#[wasm_bindgen]
pub fn extract_document(json: &str) -> Result<JsValue, JsValue> {
    let document = OcrDocument::from_json_str(json).map_err(js_error)?;
    let extractor =
        build_extractor(&PachiConfig::default(), StrategyKind::Chain).map_err(js_error)?;
    to_js(&extractor.extract(&document))
}

/// Total one daily history screen.
#[wasm_bindgen]
pub fn aggregate_daily(text: &str) -> Result<JsValue, JsValue> {
    let config = PachiConfig::default();
    let total = pachi_core::parse_daily_history(text, &config.aggregation).map_err(js_error)?;
    if total.source.is_fallback() {
        web_sys::console::warn_1(&"Day labels not recognized, using fallback total".into());
    }
    to_js(&total)
}

/// Wins, starts and odds from two history screens in either order.
#[wasm_bindgen]
pub fn summarize_pair(first: &str, second: &str) -> Result<JsValue, JsValue> {
    let config = PachiConfig::default();
    let summary =
        pachi_core::summarize_pair(first, second, &config.aggregation).map_err(js_error)?;
    to_js(&summary)
}

/// Normalize OCR text the way the extractors see it.
#[wasm_bindgen]
pub fn normalize_text(raw: &str) -> String {
    normalize(raw)
}

/// Field extractor class for browser use.
#[wasm_bindgen]
pub struct FieldExtractor {
    config: PachiConfig,
    extractor: Box<dyn Extractor>,
}

#[wasm_bindgen]
impl FieldExtractor {
    /// Create an extractor from an optional JSON configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<FieldExtractor, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<PachiConfig>(&json).map_err(js_error)?,
            None => PachiConfig::default(),
        };
        let extractor = extractor_from_config(&config).map_err(js_error)?;
        Ok(Self { config, extractor })
    }

    /// Name of the active strategy.
    #[wasm_bindgen]
    pub fn strategy(&self) -> String {
        self.config.extraction.strategy.to_string()
    }

    /// Switch strategy: "keyword", "grid" or "chain".
    #[wasm_bindgen]
    pub fn set_strategy(&mut self, name: &str) -> Result<(), JsValue> {
        let kind: StrategyKind = serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map_err(|_| JsValue::from_str(&format!("Unknown strategy: {}", name)))?;
        self.extractor = build_extractor(&self.config, kind).map_err(js_error)?;
        self.config.extraction.strategy = kind;
        Ok(())
    }

    /// Configured field ids.
    #[wasm_bindgen]
    pub fn fields(&self) -> js_sys::Array {
        self.config
            .fields
            .fields
            .keys()
            .map(|id| JsValue::from_str(id))
            .collect()
    }

    /// Extract from plain text.
    #[wasm_bindgen]
    pub fn extract(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.extractor.extract_text(text))
    }

    /// Extract from a JSON OCR document or Vision response.
    #[wasm_bindgen]
    pub fn extract_json(&self, json: &str) -> Result<JsValue, JsValue> {
        let document = OcrDocument::from_json_str(json).map_err(js_error)?;
        to_js(&self.extractor.extract(&document))
    }

    /// Extract from tokens collected in the browser.
    #[wasm_bindgen]
    pub fn extract_input(&self, input: &OcrInput) -> Result<JsValue, JsValue> {
        to_js(&self.extractor.extract(&input.document()))
    }
}

/// OCR output assembled token by token on the JS side.
#[wasm_bindgen]
pub struct OcrInput {
    text: String,
    tokens: Vec<Token>,
}

#[wasm_bindgen]
impl OcrInput {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            text: String::new(),
            tokens: Vec::new(),
        }
    }

    /// Add a token with its four corners.
    #[wasm_bindgen]
    #[allow(clippy::too_many_arguments)]
    pub fn add_token(
        &mut self,
        text: &str,
        x1: f32, y1: f32,
        x2: f32, y2: f32,
        x3: f32, y3: f32,
        x4: f32, y4: f32,
    ) {
        let polygon = Polygon::new(vec![
            Vertex::new(x1, y1),
            Vertex::new(x2, y2),
            Vertex::new(x3, y3),
            Vertex::new(x4, y4),
        ]);
        self.tokens.push(Token::new(text, 0).with_box(polygon));
    }

    /// Set the full text.
    #[wasm_bindgen]
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Get the full text.
    #[wasm_bindgen]
    pub fn get_text(&self) -> String {
        self.document().full_text()
    }

    /// Number of tokens added.
    #[wasm_bindgen]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn document(&self) -> OcrDocument {
        let mut document = OcrDocument::from_text(self.text.clone()).with_tokens(self.tokens.clone());
        if self.text.trim().is_empty() {
            document.sort_by_reading_order(DEFAULT_ROW_TOLERANCE);
        } else {
            document.derive_offsets();
        }
        document
    }
}

impl Default for OcrInput {
    fn default() -> Self {
        Self::new()
    }
}
