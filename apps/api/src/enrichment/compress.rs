//! Bounds article text before it is sent to the summarizer.
//!
//! Whitespace runs collapse to one space. Text over budget keeps a 65% head and a
//! 35% tail around `TRUNCATION_MARKER`; the marker is charged against the budget,
//! so the output is never longer than `max_chars`. Lengths are in chars, not bytes.

pub const TRUNCATION_MARKER: &str = " ... [TRUNCATED MIDDLE] ... ";

const HEAD_SHARE: f64 = 0.65;

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Head/tail lengths (in chars) used when text exceeds `max_chars`.
pub fn split_lengths(max_chars: usize) -> (usize, usize) {
    let marker = TRUNCATION_MARKER.chars().count();
    let available = max_chars.saturating_sub(marker);
    let head = (available as f64 * HEAD_SHARE).floor() as usize;
    (head, available - head)
}

/// Normalizes `text` and bounds it to `max_chars`.
///
/// The head is 65% of `max_chars` minus the marker length, not 65% of `max_chars`:
/// the marker comes out of the budget so the result never exceeds it.
pub fn compress_for_model(text: &str, max_chars: usize) -> String {
    let text = normalize_whitespace(text);
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }

    // Too small to fit the marker: plain cut.
    if max_chars <= TRUNCATION_MARKER.chars().count() {
        return text.chars().take(max_chars).collect();
    }

    let (head, tail) = split_lengths(max_chars);
    let head_text: String = text.chars().take(head).collect();
    let tail_text: String = text.chars().skip(total - tail).collect();
    format!("{head_text}{TRUNCATION_MARKER}{tail_text}")
}
