//! Keyword anchor lookup.
//!
//! Labels are matched as plain substrings. Several of them contain
//! characters with regex meaning (`→`, digits next to kanji), and a short
//! label may be a prefix of a longer one (リプ / リプレイ / リプ→V). Each
//! keyword is looked up on its own, so overlaps never disturb each other.

use serde::Serialize;

use crate::config::Occurrence;

/// Position of a keyword in the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordAnchor {
    pub keyword: String,
    /// Byte offset of the chosen occurrence, `None` if absent.
    pub offset: Option<usize>,
}

impl KeywordAnchor {
    pub fn is_absent(&self) -> bool {
        self.offset.is_none()
    }

    /// Offset just past the keyword.
    pub fn end(&self) -> Option<usize> {
        self.offset.map(|start| start + self.keyword.len())
    }
}

/// Find one keyword.
pub fn locate(text: &str, keyword: &str, occurrence: Occurrence) -> KeywordAnchor {
    let offset = if keyword.is_empty() {
        None
    } else {
        match occurrence {
            Occurrence::First => text.find(keyword),
            Occurrence::Last => text.rfind(keyword),
        }
    };

    KeywordAnchor {
        keyword: keyword.to_string(),
        offset,
    }
}

/// Find several keywords, longest first so more specific labels are
/// reported ahead of their prefixes.
pub fn locate_anchors<'a, I>(text: &str, keywords: I) -> Vec<KeywordAnchor>
where
    I: IntoIterator<Item = (&'a str, Occurrence)>,
{
    let mut wanted: Vec<(&str, Occurrence)> = keywords.into_iter().collect();
    wanted.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
    wanted.dedup();

    wanted
        .into_iter()
        .map(|(keyword, occurrence)| locate(text, keyword, occurrence))
        .collect()
}
