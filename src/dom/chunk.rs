//! Splitting oversized summaries into self-describing blocks.

use std::fmt;

/// One bounded block of summary lines, prefixed by the shared header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub header: String,
    pub lines: Vec<String>,
}

impl Chunk {
    /// Body lines joined with `\n`
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    /// Length of the body in characters
    pub fn body_len(&self) -> usize {
        joined_len(&self.lines)
    }

    /// Header and body, as sent to the model
    pub fn to_prompt_text(&self) -> String {
        let header = self.header.trim_end_matches('\n');
        if header.is_empty() {
            return self.body();
        }
        format!("{}\n\n{}", header, self.body())
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_prompt_text())
    }
}

fn joined_len(lines: &[String]) -> usize {
    let chars: usize = lines.iter().map(|l| l.chars().count()).sum();
    chars + lines.len().saturating_sub(1)
}

/// Separate the `URL:`/`Title:` header from the body of a rendered summary.
///
/// Header lines are the leading run of `URL:`, `Title:` and blank lines. Blank lines at the
/// boundary are dropped from both parts.
pub fn split_summary(text: &str) -> (String, Vec<String>) {
    let mut header = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.peek() {
        if line.starts_with("URL:") || line.starts_with("Title:") {
            header.push(line.to_string());
        } else if !line.trim().is_empty() {
            break;
        }
        lines.next();
    }

    let body = lines.map(str::to_string).collect();
    (header.join("\n"), body)
}

/// Greedily pack `body` lines into blocks of at most `limit` characters.
///
/// A block is flushed before a line that would push it over the limit, so only a single line
/// longer than `limit` produces an oversized block. Line order is preserved and no line is
/// split; every block carries `header`. A body that fits yields exactly one block.
pub fn chunk(body: &[String], header: &str, limit: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for line in body {
        let line_len = line.chars().count();
        let added = if current.is_empty() { line_len } else { line_len + 1 };

        if !current.is_empty() && current_len + added > limit {
            chunks.push(Chunk { header: header.to_string(), lines: std::mem::take(&mut current) });
            current_len = 0;
            current.push(line.clone());
            current_len += line_len;
            continue;
        }

        current.push(line.clone());
        current_len += added;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(Chunk { header: header.to_string(), lines: current });
    }

    log::debug!("Chunked {} lines into {} block(s) (limit {})", body.len(), chunks.len(), limit);
    chunks
}
