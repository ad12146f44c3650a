//! Single-line text fitting

use crate::constants::ELLIPSIS;

/// Fit `text` into `max_width` on one line.
///
/// Returns the text unchanged when it fits, otherwise the longest prefix that
/// fits together with a trailing ellipsis. Returns an empty string when not
/// even the ellipsis fits.
pub fn fit_text<M>(text: &str, max_width: f32, measure: M) -> String
where
    M: Fn(&str) -> f32,
{
    if measure(text) <= max_width {
        return text.to_string();
    }

    if measure(ELLIPSIS) > max_width {
        return String::new();
    }

    // Prefix boundaries, longest first
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    for &end in boundaries.iter().rev() {
        let candidate = format!("{}{}", text[..end].trim_end(), ELLIPSIS);
        if measure(&candidate) <= max_width {
            return candidate;
        }
    }

    ELLIPSIS.to_string()
}
