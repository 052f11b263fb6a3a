//! # Fenced Code Splitting
//!
//! Splits message text into plain and code segments on triple-backtick
//! fences. Fences pair up left to right (non-greedy): the first ```` ``` ````
//! opens, the next one closes. An opening fence may be followed by a word
//! language tag and a single optional newline, both stripped from the code.
//!
//! An opening fence without a partner is left in the plain text, so a reply
//! still streaming in renders its half-finished block literally.

const FENCE: &str = "```";

/// Label shown when a block carries no language tag.
pub const PLAIN_LANGUAGE: &str = "plaintext";

const PREVIEWABLE: [&str; 1] = ["html"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code {
        language: Option<String>,
        code: String,
    },
}

/// Split `content` into segments, in order. Empty plain segments are dropped.
pub fn split_segments(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = content;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };

        push_text(&mut segments, &rest[..open]);
        segments.push(parse_block(&after_open[..close]));
        rest = &after_open[close + FENCE.len()..];
    }

    push_text(&mut segments, rest);
    segments
}

/// Only the code segments of `content`, as `(language, code)` in order.
pub fn code_blocks(content: &str) -> Vec<(Option<String>, String)> {
    split_segments(content)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Code { language, code } => Some((language, code)),
            Segment::Text(_) => None,
        })
        .collect()
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Parse the inside of a fence pair: `[lang][\n]code`.
fn parse_block(inner: &str) -> Segment {
    let tag_len = inner
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(inner.len());

    let (tag, body) = inner.split_at(tag_len);
    let code = body.strip_prefix('\n').unwrap_or(body);

    Segment::Code {
        language: (!tag.is_empty()).then(|| tag.to_string()),
        code: code.to_string(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// File extension used when saving a block. Unknown or missing languages
/// fall back to `txt`.
pub fn file_extension(language: Option<&str>) -> &'static str {
    let Some(language) = language else {
        return "txt";
    };
    match language.to_lowercase().as_str() {
        "javascript" => "js",
        "python" => "py",
        "html" => "html",
        "css" => "css",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "json" => "json",
        "shell" | "bash" => "sh",
        "typescript" => "ts",
        _ => "txt",
    }
}

/// Whether a block of this language offers a rendered preview.
pub fn is_previewable(language: Option<&str>) -> bool {
    language.is_some_and(|lang| {
        let lowered = lang.to_lowercase();
        PREVIEWABLE.contains(&lowered.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    fn code(language: Option<&str>, body: &str) -> Segment {
        Segment::Code {
            language: language.map(str::to_string),
            code: body.to_string(),
        }
    }

    #[test]
    fn test_plain_text_is_single_segment() {
        assert_eq!(split_segments("just words\n  indented"), vec![text("just words\n  indented")]);
    }

    #[test]
    fn test_empty_content_has_no_segments() {
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_text_code_text() {
        let segments = split_segments("Here:\n```python\nprint(1)\n```\nDone.");
        assert_eq!(
            segments,
            vec![
                text("Here:\n"),
                code(Some("python"), "print(1)\n"),
                text("\nDone."),
            ]
        );
    }

    #[test]
    fn test_block_without_language() {
        assert_eq!(split_segments("```\nls -la\n```"), vec![code(None, "ls -la\n")]);
    }

    #[test]
    fn test_block_only_drops_empty_text() {
        let segments = split_segments("```js\nx```");
        assert_eq!(segments, vec![code(Some("js"), "x")]);
    }

    #[test]
    fn test_only_one_newline_is_stripped() {
        assert_eq!(split_segments("```\n\nx```"), vec![code(None, "\nx")]);
    }

    #[test]
    fn test_tag_stops_at_non_word_char() {
        assert_eq!(split_segments("```c++\nint x;```"), vec![code(Some("c"), "++\nint x;")]);
    }

    #[test]
    fn test_adjacent_blocks_pair_non_greedily() {
        let segments = split_segments("```a\n1```between```b\n2```");
        assert_eq!(
            segments,
            vec![code(Some("a"), "1"), text("between"), code(Some("b"), "2")]
        );
    }

    #[test]
    fn test_unclosed_fence_stays_text() {
        let content = "intro ```rust\nfn main() {";
        assert_eq!(split_segments(content), vec![text(content)]);
    }

    #[test]
    fn test_third_fence_without_partner_stays_text() {
        let segments = split_segments("```x```tail```open");
        assert_eq!(segments, vec![code(Some("x"), ""), text("tail```open")]);
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(split_segments("``````"), vec![code(None, "")]);
    }

    #[test]
    fn test_code_blocks_skip_text() {
        let blocks = code_blocks("a```py\n1```b```\n2```c");
        assert_eq!(
            blocks,
            vec![
                (Some("py".to_string()), "1".to_string()),
                (None, "2".to_string())
            ]
        );
        assert!(code_blocks("no code here").is_empty());
    }

    #[test]
    fn test_python_block_alone() {
        let segments = split_segments("```python\nprint(1)\n```");
        assert_eq!(segments, vec![code(Some("python"), "print(1)\n")]);

        let Segment::Code { language, .. } = &segments[0] else {
            panic!("expected a code segment");
        };
        assert_eq!(file_extension(language.as_deref()), "py");
    }

    #[test]
    fn test_inline_block_between_text() {
        assert_eq!(
            split_segments("plain ```js\nx=1\n``` tail"),
            vec![text("plain "), code(Some("js"), "x=1\n"), text(" tail")]
        );
    }

    #[test]
    fn test_file_extension_mapping() {
        assert_eq!(file_extension(Some("javascript")), "js");
        assert_eq!(file_extension(Some("Python")), "py");
        assert_eq!(file_extension(Some("bash")), "sh");
        assert_eq!(file_extension(Some("SHELL")), "sh");
        assert_eq!(file_extension(Some("typescript")), "ts");
        assert_eq!(file_extension(Some("rust")), "txt");
        assert_eq!(file_extension(None), "txt");
    }

    #[test]
    fn test_only_html_is_previewable() {
        assert!(is_previewable(Some("html")));
        assert!(is_previewable(Some("HTML")));
        assert!(!is_previewable(Some("javascript")));
        assert!(!is_previewable(None));
    }
}
