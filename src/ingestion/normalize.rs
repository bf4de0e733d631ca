//! Whitespace and control-character normalization applied before chunking.
//!
//! Loader output regularly carries non-breaking spaces, private-use glyphs
//! from PDF bullet fonts, and irregular line breaks. Canonicalizing these
//! ahead of chunking keeps chunk size accounting honest and stops invisible
//! characters from leaking into prompts.

/// Normalizes raw document text.
///
/// Collapses every whitespace run (including Unicode spaces such as NBSP) to
/// one ASCII space, drops control and private-use characters, and trims the
/// ends. Pure and total; idempotent, so `normalize(normalize(t)) ==
/// normalize(t)` for all `t`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if ch.is_control() || is_private_use(ch) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

/// Private Use Area characters, e.g. `\u{f0a7}` bullets from PDF symbol fonts.
fn is_private_use(ch: char) -> bool {
    matches!(ch, '\u{e000}'..='\u{f8ff}' | '\u{f0000}'..='\u{ffffd}' | '\u{100000}'..='\u{10fffd}')
}
