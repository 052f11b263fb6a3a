//! # Snippet Export
//!
//! Side effects behind the code block and image actions: saving a code
//! block or an image to disk, and turning an HTML block into readable text
//! for the in-terminal preview.
//!
//! Saved files never overwrite an existing one. A taken name gets a numeric
//! suffix instead: `code-snippet.py`, `code-snippet-1.py`, ...

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::fence::file_extension;

const SNIPPET_STEM: &str = "code-snippet";
const IMAGE_STEM: &str = "generated-image";

/// Elements whose content never shows up in a preview.
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "head"];

/// Writes `code` to `<dir>/code-snippet.<ext>` and returns the path used.
pub fn save_code(code: &str, language: Option<&str>, dir: &Path) -> io::Result<PathBuf> {
    let path = unused_path(dir, SNIPPET_STEM, file_extension(language))?;
    fs::write(&path, code)?;
    info!("Saved code snippet to {}", path.display());
    Ok(path)
}

/// Decodes an image `data:` URI and writes it to `<dir>/generated-image.<ext>`.
pub fn save_image(data_uri: &str, dir: &Path) -> io::Result<PathBuf> {
    let (mime_type, payload) = split_data_uri(data_uri)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "not a base64 data URI"))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let path = unused_path(dir, IMAGE_STEM, image_extension(mime_type))?;
    fs::write(&path, bytes)?;
    info!("Saved image to {}", path.display());
    Ok(path)
}

/// Splits `data:<mime>;base64,<payload>` into its mime type and payload.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    Some((mime_type, payload))
}

/// Decoded size of a base64 payload, without decoding it.
pub fn decoded_len(payload: &str) -> usize {
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
    ((payload.len() / 4) * 3).saturating_sub(padding.min(2))
}

fn image_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// First `<dir>/<stem>[-n].<ext>` that does not exist yet.
fn unused_path(dir: &Path, stem: &str, ext: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let mut candidate = dir.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }
    Ok(candidate)
}

/// Renders an HTML document as plain text lines.
///
/// Tags are removed, block-level tags break lines, and the content of
/// `script`, `style` and `head` is dropped. Nothing is executed.
pub fn preview_text(html: &str) -> Vec<String> {
    let mut out = String::new();
    let mut hidden: Option<String> = None;
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        if hidden.is_none() {
            out.push_str(&rest[..lt]);
        }
        let Some(gt) = rest[lt..].find('>') else {
            // Dangling '<': treat the remainder as text.
            if hidden.is_none() {
                out.push_str(&rest[lt..]);
            }
            rest = "";
            break;
        };

        let tag = &rest[lt + 1..lt + gt];
        let (closing, name) = tag_name(tag);

        match &hidden {
            Some(open) if closing && *open == name => hidden = None,
            Some(_) => {}
            None if !closing && HIDDEN_ELEMENTS.contains(&name.as_str()) => {
                if !tag.ends_with('/') {
                    hidden = Some(name);
                }
            }
            None if is_line_break(&name) => out.push('\n'),
            None => {}
        }
        rest = &rest[lt + gt + 1..];
    }
    if hidden.is_none() {
        out.push_str(rest);
    }

    out.lines()
        .map(|line| decode_entities(line.trim()))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Returns `(is_closing, lowercase name)` for the inside of a tag.
fn tag_name(tag: &str) -> (bool, String) {
    let (closing, body) = match tag.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, tag),
    };
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (closing, name.to_ascii_lowercase())
}

fn is_line_break(name: &str) -> bool {
    matches!(
        name,
        "br" | "p" | "div" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "title"
            | "section" | "article" | "header" | "footer" | "ul" | "ol" | "table" | "body"
    )
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
