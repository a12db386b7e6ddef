//! HTML5 token model.
//!
//! Tokens reference the decoded input buffer through [`Span`]s; no string is
//! copied during tokenization. A token stays valid until the tokenizer next
//! runs, so the tree builder consumes each batch before the machine resumes.

use super::Span;

/// Element and attribute namespaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    MathMl,
    Svg,
    XLink,
    Xml,
    Xmlns,
}

/// Lexical mode governing how `<` and `&` are interpreted in data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentModel {
    #[default]
    Pcdata,
    Rcdata,
    Cdata,
    Plaintext,
}

/// One attribute on a tag token.
///
/// The name span is already lowercase: ASCII letters are folded in place in
/// the input buffer as they are consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub ns: Namespace,
    pub name: Span,
    pub value: Span,
}

/// Scratch and payload for start/end tag tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: Span,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

/// Doctype payload. `correct` is true iff the name compares equal to `HTML`
/// ignoring ASCII case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Doctype {
    pub name: Span,
    pub public_id: Option<Span>,
    pub system_id: Option<Span>,
    pub force_quirks: bool,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Character { span: Span },
    StartTag { tag: Tag },
    EndTag { tag: Tag },
    Comment { span: Span },
    Doctype { doctype: Doctype },
    Eof,
}
