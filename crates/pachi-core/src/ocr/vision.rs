//! Adapter for Cloud Vision `textDetection` responses.
//!
//! The first entry of `textAnnotations` is the whole page; the rest are
//! individual words with their bounding polygons. Vertices omit `x` or `y`
//! when the coordinate is 0.

use serde::Deserialize;
use tracing::debug;

use super::{OcrDocument, Polygon, Token, Vertex};

/// Subset of an annotate-image response that carries text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateResponse {
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub full_text_annotation: Option<FullTextAnnotation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<VisionVertex>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VisionVertex {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
}

/// True if the JSON value has the shape of a single annotate response.
pub fn looks_like_vision(value: &serde_json::Value) -> bool {
    value.get("textAnnotations").is_some() || value.get("fullTextAnnotation").is_some()
}

impl AnnotateResponse {
    /// Convert into the crate's document model.
    pub fn into_document(self) -> OcrDocument {
        let mut annotations = self.text_annotations.into_iter();
        let page = annotations.next();

        let text = self
            .full_text_annotation
            .map(|f| f.text)
            .filter(|t| !t.is_empty())
            .or_else(|| page.map(|p| p.description))
            .unwrap_or_default();

        let tokens: Vec<Token> = annotations
            .map(|annotation| Token {
                text: annotation.description,
                start_index: 0,
                bounding_box: annotation.bounding_poly.map(|poly| {
                    Polygon::new(
                        poly.vertices
                            .iter()
                            .map(|v| Vertex::new(v.x.unwrap_or(0.0), v.y.unwrap_or(0.0)))
                            .collect(),
                    )
                }),
            })
            .collect();

        debug!("Vision response: {} chars, {} word annotations", text.len(), tokens.len());

        let mut document = OcrDocument { text, tokens };
        document.derive_offsets();
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "textAnnotations": [
            {"description": "対象ゲーム数 120\n打込 5", "boundingPoly": {"vertices": [{}, {"x": 160}, {"x": 160, "y": 420}, {"y": 420}]}},
            {"description": "対象ゲーム数", "boundingPoly": {"vertices": [{"x": 10, "y": 5}, {"x": 90, "y": 5}, {"x": 90, "y": 25}, {"x": 10, "y": 25}]}},
            {"description": "120", "boundingPoly": {"vertices": [{"x": 100, "y": 5}, {"x": 130, "y": 5}, {"x": 130, "y": 25}, {"x": 100, "y": 25}]}},
            {"description": "打込", "boundingPoly": {"vertices": [{"y": 40}, {"x": 30, "y": 40}]}},
            {"description": "5"}
        ],
        "fullTextAnnotation": {"text": "対象ゲーム数 120\n打込 5\n"}
    }"#;

    #[test]
    fn test_vision_response_to_document() {
        let doc = OcrDocument::from_json_str(RESPONSE).unwrap();

        assert_eq!(doc.text, "対象ゲーム数 120\n打込 5\n");
        assert_eq!(doc.tokens.len(), 4);
        assert_eq!(doc.tokens[1].text, "120");
        assert_eq!(doc.tokens[1].start_index, "対象ゲーム数 ".len());
        assert!(doc.tokens[3].bounding_box.is_none());

        // Missing coordinates read as zero.
        let label = doc.tokens[2].bounding_box.as_ref().unwrap();
        assert_eq!(label.vertices[0], Vertex::new(0.0, 40.0));
        assert_eq!(doc.image_extent(), Some((130.0, 40.0)));
    }

    #[test]
    fn test_page_description_used_without_full_text() {
        let response = AnnotateResponse {
            text_annotations: vec![EntityAnnotation {
                description: "本日 50".to_string(),
                bounding_poly: None,
            }],
            full_text_annotation: None,
        };
        let doc = response.into_document();
        assert_eq!(doc.text, "本日 50");
        assert!(doc.tokens.is_empty());
    }
}
