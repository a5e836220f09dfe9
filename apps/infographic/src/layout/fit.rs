//! Auto-fit: the largest font size at which a string, greedily wrapped, fits a box.
//!
//! For each candidate size (counting down from [`CEILING_FONT_SIZE`]) the words
//! are appended one at a time and the whole accumulated string, line breaks
//! included, is remeasured after every append. A word that overflows the width
//! gets a line break in front of it and is retried; a word that overflows a
//! fresh line, or any string taller than the box, rejects the size.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::TextMeasure;

pub const CEILING_FONT_SIZE: u32 = 100;

/// The wrapped string and the font size it was fitted at.
///
/// `font_size == 0` means no size fitted; `text` then holds the last attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedText {
    pub text: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Break,
}

fn join_tokens(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match token {
            Token::Word(w) => out.push_str(w),
            Token::Break => out.push('\n'),
        }
    }
    out
}

enum Attempt<'a> {
    Fits(Vec<Token<'a>>),
    Rejected(Vec<Token<'a>>),
}

/// Greedy wrap of `words` at one font size.
fn wrap_at_size<'a, M: TextMeasure>(
    measure: &M,
    words: &[&'a str],
    font_size: u32,
    box_width: f32,
    box_height: f32,
) -> Attempt<'a> {
    let mut tokens: Vec<Token<'a>> = Vec::new();
    let mut idx = 0;

    while idx < words.len() {
        tokens.push(Token::Word(words[idx]));
        let extent = measure.measure(&join_tokens(&tokens), font_size);
        tokens.pop();

        if extent.height > box_height {
            return Attempt::Rejected(tokens);
        }
        if extent.width < box_width {
            tokens.push(Token::Word(words[idx]));
            idx += 1;
            continue;
        }
        // Width overflow: a word that can't fit a fresh line can't fit at all.
        match tokens.last() {
            None | Some(Token::Break) => return Attempt::Rejected(tokens),
            Some(Token::Word(_)) => tokens.push(Token::Break),
        }
    }
    Attempt::Fits(tokens)
}

/// Fits `text` into a `box_width` x `box_height` pixel box.
pub fn fit_text<M: TextMeasure>(
    measure: &M,
    text: &str,
    box_width: f32,
    box_height: f32,
) -> FittedText {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut last_attempt = Vec::new();

    for font_size in (1..=CEILING_FONT_SIZE).rev() {
        match wrap_at_size(measure, &words, font_size, box_width, box_height) {
            Attempt::Fits(tokens) => {
                return FittedText {
                    text: join_tokens(&tokens),
                    font_size,
                };
            }
            Attempt::Rejected(tokens) => last_attempt = tokens,
        }
    }

    FittedText {
        text: join_tokens(&last_attempt),
        font_size: 0,
    }
}
