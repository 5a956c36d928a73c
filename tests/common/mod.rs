//! Shared builders for integration tests: small token streams shaped like
//! the external tokenizer's output for markdown documents.
#![allow(dead_code)]

use doxstrux::{Nesting, SourceInfo, Token};

/// heading_open / inline / heading_close triple for an ATX heading whose
/// title is a single text fragment
pub fn heading(level: u8, line: i64, title: &str) -> Vec<Token> {
    heading_with_fragments(
        level,
        line,
        vec![Token::new("text", Nesting::SelfClosing).with_content(title)],
    )
}

/// Heading whose inline content is given explicitly, for multi-fragment
/// titles (emphasis inside a heading etc.)
pub fn heading_with_fragments(level: u8, line: i64, fragments: Vec<Token>) -> Vec<Token> {
    let tag = format!("h{}", level);
    vec![
        Token::new("heading_open", Nesting::Open)
            .with_tag(&tag)
            .with_map(line, line + 1),
        Token::new("inline", Nesting::SelfClosing).with_children(fragments),
        Token::new("heading_close", Nesting::Close).with_tag(&tag),
    ]
}

/// paragraph_open / inline / paragraph_close triple
pub fn paragraph(line: i64, text: &str) -> Vec<Token> {
    vec![
        Token::new("paragraph_open", Nesting::Open)
            .with_tag("p")
            .with_map(line, line + 1),
        Token::new("inline", Nesting::SelfClosing).with_children(vec![Token::new(
            "text",
            Nesting::SelfClosing,
        )
        .with_content(text)]),
        Token::new("paragraph_close", Nesting::Close).with_tag("p"),
    ]
}

pub fn source(line_count: usize) -> SourceInfo {
    SourceInfo {
        line_count,
        byte_len: line_count * 50,
    }
}
