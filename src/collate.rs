//! Sort order for folder listings.
//!
//! Entries are compared the way a user reads them:
//! - digit runs compare by numeric value (`file2` before `file10`)
//! - accents are ignored (`a` equals `á`)
//! - letter case is significant (`a` differs from `A`), but only after the
//!   case-folded text compares equal, so `apple` still sorts before `Banana`
//!
//! Within the same base text, lowercase sorts before uppercase. Whitespace and
//! punctuation sort before digits, digits before letters. Punctuation follows
//! the common Unicode root order (` ` `_` `-` `,` `.` `/` ...) rather than code
//! points, so `/src_old` lists before `/src/a`.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(char),
    Number(String),
}

/// Case-, accent- and number-aware comparison of two strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);

    primary(&ta, &tb).then_with(|| case_level(&ta, &tb))
}

/// Sort a slice of strings in place using [`compare`].
///
/// The sort is stable, so entries that compare equal keep their input order.
pub fn sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}

/// Split into text characters (accents stripped) and digit runs.
fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(s.len());
    let mut digits = String::new();

    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if !digits.is_empty() {
            tokens.push(Token::Number(std::mem::take(&mut digits)));
        }
        tokens.push(Token::Text(c));
    }
    if !digits.is_empty() {
        tokens.push(Token::Number(digits));
    }

    tokens
}

/// Root collation order of whitespace, punctuation and symbols.
const PUNCTUATION_ORDER: &str = " _-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

fn class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else {
        0
    }
}

/// Rank of a non-letter; listed characters first, the rest by code point.
fn punctuation_rank(c: char) -> u32 {
    if c.is_whitespace() {
        return 0;
    }
    match PUNCTUATION_ORDER.chars().position(|p| p == c) {
        Some(i) => i as u32,
        None => PUNCTUATION_ORDER.len() as u32 + c as u32,
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn primary(a: &[Token], b: &[Token]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x, y) {
            (Token::Number(n), Token::Number(m)) => compare_numbers(n, m),
            (Token::Number(_), Token::Text(c)) => {
                if class(*c) == 0 {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Token::Text(c), Token::Number(_)) => {
                if class(*c) == 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Token::Text(c), Token::Text(d)) => match (class(*c), class(*d)) {
                (0, 0) => punctuation_rank(*c).cmp(&punctuation_rank(*d)),
                (x, y) => x.cmp(&y).then_with(|| fold(*c).cmp(&fold(*d))),
            },
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn case_level(a: &[Token], b: &[Token]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        if let (Token::Text(c), Token::Text(d)) = (x, y) {
            if c != d {
                // Lowercase first
                return c.is_uppercase().cmp(&d.is_uppercase());
            }
        }
    }
    Ordering::Equal
}

/// Compare two ASCII digit runs by value, then by length (fewer leading zeros first).
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}
