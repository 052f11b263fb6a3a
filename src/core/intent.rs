//! Image-request detection for submitted input.
//!
//! An input is an image request when it starts (case-insensitively) with one
//! of [`IMAGE_PHRASES`]. The prompt is whatever follows the phrase, minus
//! one separating space.

pub const IMAGE_PHRASES: [&str; 4] = [
    "generate an image of",
    "create an image of",
    "draw a picture of",
    "make a picture of",
];

/// What a submitted input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Generate an image from the extracted prompt.
    Image { prompt: String },
    /// Regular chat turn.
    Chat,
}

/// Classify raw input.
pub fn detect(input: &str) -> Intent {
    match IMAGE_PHRASES.iter().find_map(|phrase| strip_phrase(input, phrase)) {
        Some(rest) => Intent::Image {
            prompt: rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        },
        None => Intent::Chat,
    }
}

/// `input` after `phrase`, if it starts with it ignoring ASCII case.
/// The phrases are ASCII, so the byte split lands on a char boundary.
fn strip_phrase<'a>(input: &'a str, phrase: &str) -> Option<&'a str> {
    let head = input.get(..phrase.len())?;
    head.eq_ignore_ascii_case(phrase)
        .then(|| &input[phrase.len()..])
}
