//! Recovery parser for JSON embedded in model replies.
//!
//! Replies wrap the JSON in reasoning blocks, markdown fences or prose. Parsing goes through
//! three stages, stopping at the first success:
//! 1. strict parse of the whole reply
//! 2. strict parse after stripping `<think>` blocks and code fences
//! 3. parse of the first balanced `{...}` or `[...]` substring
//!
//! Anything else yields `None`. Partial structures are never guessed.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid think-block pattern"));

static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\n?(.*?)```").expect("valid fence pattern"));

/// Extract a JSON value from a free-form model reply
pub fn extract_json(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let stripped = strip_wrappers(trimmed);
    if let Ok(value) = serde_json::from_str(&stripped) {
        return Some(value);
    }

    balanced_candidates(&stripped).find_map(|candidate| serde_json::from_str(candidate).ok())
}

/// Remove reasoning blocks and unwrap the first code fence
fn strip_wrappers(text: &str) -> String {
    let mut text = THINK_BLOCK.replace_all(text, "").into_owned();

    // Reasoning whose opening tag was cut off
    if let Some(end) = text.rfind("</think>") {
        text = text[end + "</think>".len()..].to_string();
    }

    if let Some(captures) = FENCED.captures(&text) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str().trim().to_string();
        }
    }

    // Unterminated fence
    let text = text.trim();
    let text = match text.strip_prefix("```") {
        Some(rest) => rest.split_once('\n').map(|(_, body)| body).unwrap_or(""),
        None => text,
    };
    text.trim().trim_end_matches("```").trim().to_string()
}

/// Outermost balanced bracketed substrings, in order.
///
/// A structure nested inside an earlier balanced one is never a candidate of its own.
fn balanced_candidates(text: &str) -> impl Iterator<Item = &str> {
    let mut covered = 0;
    text.char_indices().filter_map(move |(start, c)| {
        if start < covered || (c != '{' && c != '[') {
            return None;
        }
        let len = balanced_end(&text[start..])?;
        covered = start + len;
        Some(&text[start..covered])
    })
}

/// Byte length of the balanced structure opening at the start of `text`.
///
/// Brackets inside JSON strings are ignored.
fn balanced_end(text: &str) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
