//! Deterministic token formatting for golden tests.
//!
//! A stable, allocation-only formatting surface for token snapshots.
//! Attribute encounter order is preserved.

use crate::html5::shared::Token;
use crate::html5::tokenizer::SpanResolver;

/// Formatter context deriving deterministic test strings from tokens.
pub struct TokenFmt<'a> {
    resolver: SpanResolver<'a>,
}

impl<'a> TokenFmt<'a> {
    pub fn new(resolver: SpanResolver<'a>) -> Self {
        Self { resolver }
    }

    pub fn format_token(&self, token: &Token) -> String {
        token.to_test_string(self)
    }
}

/// Extension trait for deterministic token snapshot formatting.
pub trait TokenTestFormatExt {
    fn to_test_string(&self, fmt: &TokenFmt<'_>) -> String;
}

impl TokenTestFormatExt for Token {
    fn to_test_string(&self, fmt: &TokenFmt<'_>) -> String {
        let r = &fmt.resolver;
        match self {
            Token::Doctype { doctype } => {
                format!(
                    "DOCTYPE name=\"{}\" force_quirks={} correct={}",
                    escape_text(r.text(doctype.name)),
                    doctype.force_quirks,
                    doctype.correct,
                )
            }
            Token::StartTag { tag } => {
                let mut out = String::new();
                out.push_str("START name=");
                out.push_str(r.text(tag.name));
                out.push_str(" attrs=[");
                for (i, attr) in tag.attributes.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(r.text(attr.name));
                    out.push_str("=\"");
                    out.push_str(&escape_text(r.text(attr.value)));
                    out.push('"');
                }
                out.push_str("] self_closing=");
                out.push_str(if tag.self_closing { "true" } else { "false" });
                out
            }
            Token::EndTag { tag } => format!("END name={}", r.text(tag.name)),
            Token::Comment { span } => {
                format!("COMMENT text=\"{}\"", escape_text(r.text(*span)))
            }
            Token::Character { span } => {
                format!("CHAR text=\"{}\"", escape_text(r.text(*span)))
            }
            Token::Eof => "EOF".to_string(),
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' || ch == '\u{7f}' => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}
