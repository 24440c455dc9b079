//! Text canonicalization for guesses and titles.
//!
//! Every comparison the game makes (dedup keys, similarity lookup tokens,
//! title equality) goes through one of these functions. All of them are
//! pure, total and idempotent.

use std::sync::LazyLock;

use caseless::Caseless;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Bracketed credit annotation: `(feat. X)`, `[ft X & Y]`.
static BRACKETED_CREDIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(\[]\s*(?:featuring|feat|ft)\b[^)\]]*[)\]]?").expect("valid credit regex")
});

/// Bare credit marker after some title text, and the names that follow it:
/// `Song feat. X`. A marker that opens the title is part of the title.
static TRAILING_CREDIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S)\s+(?:featuring|feat|ft)\b.*$").expect("valid trailing credit regex")
});

/// Canonicalizes free text into a diacritic- and case-insensitive key.
///
/// Decomposes (NFD), applies full Unicode case folding (`ß` -> `ss`,
/// `ﬁ` -> `fi`), maps curly and back quotes to `'`, drops guillemets,
/// discards every remaining non-ASCII codepoint and trims.
#[must_use]
pub fn normalize_word(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().default_case_fold() {
        match c {
            '\u{2018}' | '\u{2019}' | '`' => out.push('\''),
            '«' | '»' | '‹' | '›' => {}
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Canonical form of a word guess: runs of `[a-z0-9]` joined by single spaces.
///
/// This is the dedup key for guesses and the similarity lookup token.
#[must_use]
pub fn normalize_guess(text: &str) -> String {
    collapse_alnum(&normalize_word(text))
}

/// Canonical form of a song title for equality checks.
///
/// Like [`normalize_guess`], but featured-artist credits are removed first,
/// so `"Song (feat. X)"` and `"Song"` compare equal.
#[must_use]
pub fn normalize_title(text: &str) -> String {
    let word = normalize_word(text);
    let without_brackets = BRACKETED_CREDIT.replace_all(&word, " ");
    let without_credits = TRAILING_CREDIT.replace(&without_brackets, "$1");
    collapse_alnum(&without_credits)
}

/// Returns `true` when a title guess matches the stored title.
///
/// Exact equality of the normalized forms, never substring containment.
/// A guess that normalizes to nothing never matches. A stored title made
/// only of a credit annotation is compared by its [`normalize_guess`] form,
/// so any title with a letter or digit can still be found.
#[must_use]
pub fn titles_match(guess: &str, stored: &str) -> bool {
    let stored_key = normalize_title(stored);
    let (guess, stored) = if stored_key.is_empty() {
        (normalize_guess(guess), normalize_guess(stored))
    } else {
        (normalize_title(guess), stored_key)
    };
    !guess.is_empty() && guess == stored
}

fn collapse_alnum(text: &str) -> String {
    text.split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
