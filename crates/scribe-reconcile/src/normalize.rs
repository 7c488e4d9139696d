//! Whitespace and line-ending normalization
//!
//! Two bodies that normalize to the same text are the same document: a
//! proposal equal to the accepted text after normalization is no proposal.

/// Normalize a document body
///
/// CRLF and lone CR become LF, trailing whitespace is stripped from each
/// line, trailing blank lines are dropped, and a non-empty result ends with
/// exactly one LF.
#[must_use]
pub fn normalize(text: &str) -> String {
    render(&split_lines(text))
}

/// Check if two bodies are equal after normalization
#[must_use]
pub fn normalized_eq(a: &str, b: &str) -> bool {
    split_lines(a) == split_lines(b)
}

/// Normalized lines of a body, without terminators
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = unified
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect();
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Join lines back into a normalized body
#[must_use]
pub fn render<S: AsRef<str>>(lines: &[S]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
