//! Plain-text rendering of model output for matching and speech synthesis.

/// Emoji and pictograph blocks stripped from model output.
const SYMBOL_RANGES: [(u32, u32); 9] = [
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F1E0, 0x1F1FF), // flags
    (0x2600, 0x26FF),   // misc symbols
    (0x2700, 0x27BF),   // dingbats
    (0x1F900, 0x1F9FF), // supplemental symbols
    (0x1FA00, 0x1FA6F), // extended symbols
    (0xFE00, 0xFE0F),   // variation selectors
];

const MARKDOWN_TOKENS: [char; 5] = ['*', '_', '~', '`', '#'];

fn is_stripped(c: char) -> bool {
    let code = c as u32;
    MARKDOWN_TOKENS.contains(&c)
        || SYMBOL_RANGES
            .iter()
            .any(|(start, end)| (*start..=*end).contains(&code))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove emoji and markdown emphasis, collapse whitespace and trim.
///
/// `clean_response_text(clean_response_text(x)) == clean_response_text(x)`.
pub fn clean_response_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !is_stripped(*c)).collect();
    collapse_whitespace(&stripped)
}

/// Text for a speech engine: line breaks become sentence breaks and the result
/// is cut back to the last full stop inside `max_chars`.
pub fn prepare_speech_text(raw: &str, max_chars: usize) -> String {
    let stripped: String = raw.chars().filter(|c| !is_stripped(*c)).collect();
    let sentences = stripped
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join(". ");
    let text = collapse_whitespace(&sentences);

    if text.chars().count() <= max_chars {
        return text;
    }

    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind('.') {
        Some(idx) if idx > 0 => truncated[..=idx].to_string(),
        _ => format!("{truncated}..."),
    }
}
