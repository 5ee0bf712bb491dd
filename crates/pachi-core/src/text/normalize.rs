//! OCR text normalization.

/// Dash and hyphen characters that OCR returns for a printed "—" placeholder.
///
/// The katakana prolonged sound mark (ー) is deliberately absent: it is part
/// of labels such as 対象ゲーム数.
pub const DASH_CHARS: &[char] = &[
    '-',        // hyphen-minus
    '\u{FF0D}', // fullwidth hyphen-minus －
    '\u{2010}', // hyphen ‐
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash ‒
    '\u{2013}', // en dash –
    '\u{2014}', // em dash —
    '\u{2015}', // horizontal bar ―
    '\u{2212}', // minus sign −
    '\u{2500}', // box drawing horizontal ─
    '\u{FE63}', // small hyphen-minus
];

/// Returns true if the character is one of [`DASH_CHARS`].
pub fn is_dash(c: char) -> bool {
    DASH_CHARS.contains(&c)
}

/// Normalize raw OCR text into a single line.
///
/// - every dash becomes a standalone `0` (surrounded by spaces, so `5－`
///   reads as `5 0` rather than `50`)
/// - fullwidth digits `０`-`９` become ASCII digits
/// - whitespace runs, newlines included, collapse to one space
/// - leading and trailing whitespace is dropped
///
/// The output contains no dashes and no whitespace runs, so normalizing it
/// again returns it unchanged.
pub fn normalize(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len() + 8);

    for c in raw.chars() {
        if is_dash(c) {
            folded.push_str(" 0 ");
        } else if let Some(digit) = fold_fullwidth_digit(c) {
            folded.push(digit);
        } else {
            folded.push(c);
        }
    }

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_fullwidth_digit(c: char) -> Option<char> {
    match c {
        '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10),
        _ => None,
    }
}
