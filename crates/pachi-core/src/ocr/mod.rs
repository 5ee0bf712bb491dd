//! OCR input boundary.
//!
//! The OCR engine itself lives outside this crate. Whatever produced the
//! text hands over an [`OcrDocument`]: the full recognized text plus,
//! optionally, the individual tokens with their quadrilaterals.

pub mod vision;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PachiError, Result};

/// Vertical distance, in pixels, within which token tops share a reading row.
pub const DEFAULT_ROW_TOLERANCE: f32 = 20.0;

/// A corner of a token's bounding polygon, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounding polygon of a token (normally 4 corners).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle as a 4-corner polygon.
    pub fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(vec![
            Vertex::new(x1, y1),
            Vertex::new(x2, y1),
            Vertex::new(x2, y2),
            Vertex::new(x1, y2),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Centroid as the mean of the corners.
    pub fn center(&self) -> Option<(f32, f32)> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f32;
        let x = self.vertices.iter().map(|v| v.x).sum::<f32>() / n;
        let y = self.vertices.iter().map(|v| v.y).sum::<f32>() / n;
        Some((x, y))
    }

    /// Smallest x and y coordinate among the corners.
    pub fn min_corner(&self) -> Option<(f32, f32)> {
        if self.vertices.is_empty() {
            return None;
        }
        let min_x = self.vertices.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
        let min_y = self.vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
        Some((min_x, min_y))
    }

    /// Largest x and y coordinate among the corners.
    pub fn max_corner(&self) -> Option<(f32, f32)> {
        if self.vertices.is_empty() {
            return None;
        }
        let max_x = self.vertices.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
        let max_y = self.vertices.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);
        Some((max_x, max_y))
    }
}

/// A recognized span of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Recognized text content.
    pub text: String,

    /// Character offset of the token in the document text.
    #[serde(default)]
    pub start_index: usize,

    /// Quadrilateral around the token, when the engine reports geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Polygon>,
}

impl Token {
    pub fn new(text: impl Into<String>, start_index: usize) -> Self {
        Self {
            text: text.into(),
            start_index,
            bounding_box: None,
        }
    }

    pub fn with_box(mut self, polygon: Polygon) -> Self {
        self.bounding_box = Some(polygon);
        self
    }
}

/// Everything the OCR collaborator returns for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    /// Full recognized text, line breaks as the engine produced them.
    #[serde(default)]
    pub text: String,

    /// Individual tokens, in whatever order the engine emitted them.
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl OcrDocument {
    /// Document with text only and no geometry.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: Vec::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Parse either the native JSON shape or a Cloud Vision annotate response
    /// (bare or inside a `responses` batch).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;

        // Batch responses wrap the single result in `responses[0]`.
        if let Some(inner) = value.get("responses").and_then(|r| r.get(0)) {
            value = inner.clone();
        }

        if vision::looks_like_vision(&value) {
            debug!("Decoding OCR payload as a Vision annotate response");
            let response: vision::AnnotateResponse = serde_json::from_value(value)?;
            return Ok(response.into_document());
        }

        if value.get("text").is_none() && value.get("tokens").is_none() {
            return Err(PachiError::Ocr(
                "expected an object with `text`/`tokens` or `textAnnotations`".to_string(),
            ));
        }

        let mut document: OcrDocument = serde_json::from_value(value)?;
        if document.text.trim().is_empty() && document.has_geometry() {
            document.sort_by_reading_order(DEFAULT_ROW_TOLERANCE);
        }
        Ok(document)
    }

    /// Full text, or the tokens joined by newlines in `start_index` order
    /// when the engine sent tokens only.
    pub fn full_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.clone();
        }

        let mut ordered: Vec<&Token> = self.tokens.iter().collect();
        ordered.sort_by_key(|t| t.start_index);
        ordered
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sort tokens top-to-bottom, then left-to-right. Tokens whose top edges
    /// lie within `row_tolerance` pixels share a row; tokens without geometry
    /// keep their relative order after the rest.
    ///
    /// Without document text, the text is rebuilt from the sorted tokens so
    /// offsets follow reading order.
    pub fn sort_by_reading_order(&mut self, row_tolerance: f32) {
        let tolerance = row_tolerance.max(1.0);
        self.tokens.sort_by(|a, b| {
            let a_top = a.bounding_box.as_ref().and_then(|p| p.min_corner());
            let b_top = b.bounding_box.as_ref().and_then(|p| p.min_corner());

            match (a_top, b_top) {
                (Some((ax, ay)), Some((bx, by))) => {
                    let row_a = (ay / tolerance) as i64;
                    let row_b = (by / tolerance) as i64;
                    row_a
                        .cmp(&row_b)
                        .then(ax.total_cmp(&bx))
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });

        if self.text.trim().is_empty() {
            self.text = self
                .tokens
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
        }
        self.derive_offsets();
    }

    /// True when the text has nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.tokens.iter().all(|t| t.text.trim().is_empty())
    }

    /// True when at least one token carries a usable polygon.
    pub fn has_geometry(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| t.bounding_box.as_ref().is_some_and(|b| !b.is_empty()))
    }

    /// Image extent inferred from the largest coordinates of all boxes.
    pub fn image_extent(&self) -> Option<(f32, f32)> {
        self.tokens
            .iter()
            .filter_map(|t| t.bounding_box.as_ref()?.max_corner())
            .reduce(|(ax, ay), (bx, by)| (ax.max(bx), ay.max(by)))
    }

    /// Recompute every token's `start_index` by searching its text forward
    /// through the full text. Tokens that cannot be found keep the cursor
    /// position so their relative order survives.
    pub fn derive_offsets(&mut self) {
        let mut cursor = 0;
        for token in &mut self.tokens {
            let needle = token.text.trim();
            if needle.is_empty() {
                token.start_index = cursor;
                continue;
            }
            match self.text.get(cursor..).and_then(|rest| rest.find(needle)) {
                Some(found) => {
                    token.start_index = cursor + found;
                    cursor += found + needle.len();
                }
                None => token.start_index = cursor,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_center() {
        let poly = Polygon::rect(40.0, 110.0, 60.0, 130.0);
        assert_eq!(poly.center(), Some((50.0, 120.0)));
        assert_eq!(Polygon::default().center(), None);
    }

    #[test]
    fn test_image_extent_uses_all_boxes() {
        let doc = OcrDocument::from_text("a b").with_tokens(vec![
            Token::new("a", 0).with_box(Polygon::rect(0.0, 0.0, 100.0, 30.0)),
            Token::new("b", 2).with_box(Polygon::rect(50.0, 200.0, 80.0, 420.0)),
            Token::new("c", 4),
        ]);
        assert_eq!(doc.image_extent(), Some((100.0, 420.0)));
        assert!(doc.has_geometry());
    }

    #[test]
    fn test_derive_offsets() {
        let mut doc = OcrDocument::from_text("打込 5\n2穴 5").with_tokens(vec![
            Token::new("打込", 99),
            Token::new("5", 99),
            Token::new("2穴", 99),
            Token::new("5", 99),
        ]);
        doc.derive_offsets();
        let offsets: Vec<usize> = doc.tokens.iter().map(|t| t.start_index).collect();
        assert_eq!(offsets, vec![0, 7, 9, 14]);
    }

    #[test]
    fn test_from_json_native() {
        let json = r#"{"text": "対象ゲーム数 120", "tokens": [{"text": "120"}]}"#;
        let doc = OcrDocument::from_json_str(json).unwrap();
        assert_eq!(doc.text, "対象ゲーム数 120");
        assert_eq!(doc.tokens.len(), 1);
        assert!(!doc.has_geometry());
    }

    #[test]
    fn test_from_json_tokens_only_use_reading_order() {
        let json = r#"{"tokens": [
            {"text": "5", "bounding_box": {"vertices": [{"x": 80, "y": 100}, {"x": 90, "y": 110}]}},
            {"text": "打込", "bounding_box": {"vertices": [{"x": 10, "y": 100}, {"x": 40, "y": 110}]}}
        ]}"#;
        let doc = OcrDocument::from_json_str(json).unwrap();
        assert_eq!(doc.text, "打込\n5");
        assert_eq!(doc.full_text(), "打込\n5");
    }

    #[test]
    fn test_from_json_rejects_unknown_shape() {
        assert!(OcrDocument::from_json_str(r#"{"foo": 1}"#).is_err());
        assert!(OcrDocument::from_json_str("not json").is_err());
    }

    #[test]
    fn test_full_text_falls_back_to_tokens() {
        let doc = OcrDocument::from_text("").with_tokens(vec![
            Token::new("打込", 0),
            Token::new("5", 0),
        ]);
        assert_eq!(doc.full_text(), "打込\n5");
        assert_eq!(OcrDocument::from_text("本日 5").full_text(), "本日 5");
    }

    #[test]
    fn test_full_text_orders_by_offset() {
        let doc = OcrDocument::default().with_tokens(vec![
            Token::new("5", 3),
            Token::new("打込", 0),
        ]);
        assert_eq!(doc.full_text(), "打込\n5");
    }

    #[test]
    fn test_sort_by_reading_order() {
        let mut doc = OcrDocument::default().with_tokens(vec![
            Token::new("5", 0).with_box(Polygon::rect(80.0, 102.0, 100.0, 120.0)),
            Token::new("2穴", 0).with_box(Polygon::rect(10.0, 160.0, 40.0, 180.0)),
            Token::new("?", 0),
            Token::new("打込", 0).with_box(Polygon::rect(10.0, 100.0, 40.0, 120.0)),
        ]);
        doc.sort_by_reading_order(20.0);

        let texts: Vec<&str> = doc.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["打込", "5", "2穴", "?"]);
        assert_eq!(doc.text, "打込\n5\n2穴\n?");
        assert_eq!(doc.tokens[1].start_index, "打込\n".len());
    }

    #[test]
    fn test_sort_by_reading_order_with_nan_corners() {
        let nan = Polygon::new(vec![
            Vertex::new(f32::NAN, f32::NAN),
            Vertex::new(f32::NAN, f32::NAN),
            Vertex::new(f32::NAN, f32::NAN),
            Vertex::new(f32::NAN, f32::NAN),
        ]);
        let mut doc = OcrDocument::default().with_tokens(vec![
            Token::new("?", 0),
            Token::new("n", 0).with_box(nan),
            Token::new("7", 0).with_box(Polygon::rect(10.0, 100.0, 20.0, 110.0)),
            Token::new("1", 0).with_box(Polygon::rect(f32::NAN, 100.0, 5.0, 110.0)),
        ]);
        doc.sort_by_reading_order(f32::NAN);

        let texts: Vec<&str> = doc.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "7", "n", "?"]);
    }

    #[test]
    fn test_blank_document() {
        assert!(OcrDocument::from_text("  \n ").is_blank());
        assert!(!OcrDocument::from_text("1").is_blank());
    }
}
