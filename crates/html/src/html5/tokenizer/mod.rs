//! HTML5 tokenizer public API.
//!
//! This is a streaming tokenizer: it consumes a decoded `Input` and emits
//! tokens in batches. The machine is an explicit ~28-state automaton and is
//! resumable at any byte boundary.
//!
//! Invariants:
//! - Chunk equivalence: feeding input in one chunk or many chunks yields the
//!   same token sequence.
//! - Input ownership: a tokenizer instance is bound to one `Input` instance
//!   (`Input::id`) for its lifetime.
//! - Span validity: token spans are resolved through the batch that produced
//!   them; the batch holds a borrow of the `Input` to pin them.
//! - Content-model sync: the machine pauses right after emitting a start tag
//!   so the tree builder can switch the content model before tokenization
//!   resumes (`<script>`, `<style>`, `<title>`, `<textarea>`, `<plaintext>`).

use crate::html5::shared::{
    Attribute, ContentModel, DocumentParseContext, Doctype, ErrorOrigin, Input, ParseError,
    ParseErrorCode, Peeked, Span, Tag, Token,
};
use entities::{EntitySearch, EntityStep};
use states::TokenizerState;

mod emit;
mod entities;
mod states;
mod token_fmt;

pub use token_fmt::{TokenFmt, TokenTestFormatExt};

/// Table of mappings between Windows-1252 codepoints 128-159 and UCS4.
const CP1252: [u32; 32] = [
    0x20AC, 0xFFFD, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0xFFFD, 0x017D, 0xFFFD, 0xFFFD, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0xFFFD, 0x017E, 0x0178,
];

/// Configuration for the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenizerConfig {
    /// Emit an `Eof` token when the stream ends.
    pub emit_eof: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { emit_eof: true }
    }
}

/// Streaming tokenizer result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenizeResult {
    /// Progress was made and at least one token may be available.
    Progress,
    /// More input is required to continue.
    NeedMoreInput,
    /// End of stream reached; no further input will be consumed.
    EmittedEof,
}

/// Minimal tokenizer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
    pub budget_exhaustions: u64,
}

/// Resolve token spans against the input buffer for the current batch.
#[derive(Clone, Copy)]
pub struct SpanResolver<'a> {
    input: &'a Input,
}

impl<'a> SpanResolver<'a> {
    pub fn bytes(&self, span: Span) -> &'a [u8] {
        self.input.slice(span)
    }

    /// Spans produced by the tokenizer always lie on character boundaries.
    pub fn text(&self, span: Span) -> &'a str {
        self.input.span_str(span).unwrap_or("")
    }

    pub fn eq_ignore_ascii_case(&self, span: Span, literal: &[u8]) -> bool {
        self.input.compare_span_ascii_ci(span, literal)
    }
}

/// Token batch bound to one drain of the tokenizer.
///
/// Invariant: spans inside the tokens are only valid for as long as this
/// batch exists (the batch holds an exclusive borrow of the `Input`).
pub struct TokenBatch<'t> {
    tokens: Vec<Token>,
    input: &'t mut Input,
}

impl<'t> TokenBatch<'t> {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn resolver(&self) -> SpanResolver<'_> {
        SpanResolver { input: &*self.input }
    }
}

/// Entity sub-machine scratch. The caller state is stashed in
/// `return_state`; consumption can pause at any byte, so resumption never
/// relies on the call stack.
#[derive(Clone, Debug)]
struct EntityMatch {
    span: Span,
    base: u32,
    codepoint: u32,
    had_data: bool,
    return_state: TokenizerState,
    complete: bool,
    done_setup: bool,
    search: EntitySearch,
    /// Byte length (from `&`) of the last complete named match.
    prev_len: usize,
}

impl Default for EntityMatch {
    fn default() -> Self {
        Self {
            span: Span::default(),
            base: 0,
            codepoint: 0,
            had_data: false,
            return_state: TokenizerState::Data,
            complete: false,
            done_setup: false,
            search: EntitySearch::new(),
            prev_len: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Progress,
    NeedMoreInput,
}

const MAX_STEPS_PER_PUMP: usize = 65_536;

/// HTML5 tokenizer.
pub struct Html5Tokenizer {
    config: TokenizerConfig,
    state: TokenizerState,
    content_model: ContentModel,
    input_id: Option<u64>,
    tokens: Vec<Token>,
    eof_emitted: bool,
    /// Set when a start tag was emitted; `run` returns so the driver can
    /// apply content-model changes before the machine continues.
    paused: bool,
    /// Pending character run; survives out-of-data pauses so chunking never
    /// changes token boundaries.
    pending_run: Option<Span>,
    /// Consumed markup prefix (`<`, `</`, `<>`) emitted as characters when
    /// tag parsing backs out.
    markup_prefix: Span,
    current_tag: Tag,
    current_tag_is_end: bool,
    current_comment: Span,
    current_doctype: Doctype,
    close_tag_match: Span,
    match_doctype_count: u8,
    /// Attribute-value state to resume after an entity in a value.
    prev_state: TokenizerState,
    entity: EntityMatch,
    stats: TokenizerStats,
}

impl Html5Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self {
            config,
            state: TokenizerState::Data,
            content_model: ContentModel::Pcdata,
            input_id: None,
            tokens: Vec::new(),
            eof_emitted: false,
            paused: false,
            pending_run: None,
            markup_prefix: Span::default(),
            current_tag: Tag::default(),
            current_tag_is_end: false,
            current_comment: Span::default(),
            current_doctype: Doctype::default(),
            close_tag_match: Span::default(),
            match_doctype_count: 0,
            prev_state: TokenizerState::Data,
            entity: EntityMatch::default(),
            stats: TokenizerStats::default(),
        }
    }

    /// Current content model flag.
    pub fn content_model(&self) -> ContentModel {
        self.content_model
    }

    /// Set by the tree builder when entering raw-text elements.
    pub fn set_content_model(&mut self, model: ContentModel) {
        self.content_model = model;
    }

    /// Return a copy of current instrumentation counters.
    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Drive the machine until it needs more input, pauses for a
    /// content-model sync point, or reaches end of stream.
    pub fn run(&mut self, input: &mut Input, ctx: &mut DocumentParseContext) -> TokenizeResult {
        if let Some(id) = self.input_id {
            assert_eq!(id, input.id(), "tokenizer is bound to a single Input instance");
        } else {
            self.input_id = Some(input.id());
        }
        if self.eof_emitted {
            return TokenizeResult::EmittedEof;
        }

        let initial_cursor = input.cursor();
        let initial_tokens = self.tokens.len();
        let initial_transitions = self.stats.state_transitions;
        self.paused = false;

        let mut remaining_budget = MAX_STEPS_PER_PUMP;
        while remaining_budget > 0 && !self.paused && !self.eof_emitted {
            remaining_budget -= 1;
            self.stats.steps = self.stats.steps.saturating_add(1);
            match self.step(input, ctx) {
                Step::Progress => {}
                Step::NeedMoreInput => break,
            }
        }

        if remaining_budget == 0 {
            self.stats.budget_exhaustions = self.stats.budget_exhaustions.saturating_add(1);
            let no_observable_progress = input.cursor() == initial_cursor
                && self.tokens.len() == initial_tokens
                && self.stats.state_transitions == initial_transitions;
            assert!(
                !no_observable_progress,
                "tokenizer step budget exhausted without observable progress: state={:?} cursor={}",
                self.state,
                input.cursor(),
            );
        }

        if self.eof_emitted {
            TokenizeResult::EmittedEof
        } else if input.cursor() != initial_cursor
            || self.tokens.len() != initial_tokens
            || self.stats.state_transitions != initial_transitions
        {
            TokenizeResult::Progress
        } else {
            TokenizeResult::NeedMoreInput
        }
    }

    /// Drain the current batch of tokens; spans stay valid for the batch's
    /// lifetime.
    pub fn next_batch<'t>(&mut self, input: &'t mut Input) -> TokenBatch<'t> {
        assert!(
            self.input_id.is_none() || self.input_id == Some(input.id()),
            "next_batch input must match the tokenizer-bound Input instance"
        );
        let tokens = std::mem::take(&mut self.tokens);
        TokenBatch { tokens, input }
    }

    fn transition(&mut self, next: TokenizerState) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html5.tokenizer", "state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    fn step(&mut self, input: &mut Input, ctx: &mut DocumentParseContext) -> Step {
        match self.state {
            TokenizerState::Data => self.step_data(input),
            TokenizerState::EntityData => self.step_entity_data(input),
            TokenizerState::TagOpen => self.step_tag_open(input),
            TokenizerState::CloseTagOpen => self.step_close_tag_open(input),
            TokenizerState::CloseTagMatch => self.step_close_tag_match(input),
            TokenizerState::TagName => self.step_tag_name(input),
            TokenizerState::BeforeAttributeName => self.step_before_attribute_name(input),
            TokenizerState::AttributeName => self.step_attribute_name(input),
            TokenizerState::AfterAttributeName => self.step_after_attribute_name(input),
            TokenizerState::BeforeAttributeValue => self.step_before_attribute_value(input),
            TokenizerState::AttributeValueDq => self.step_attribute_value_quoted(input, '"'),
            TokenizerState::AttributeValueSq => self.step_attribute_value_quoted(input, '\''),
            TokenizerState::AttributeValueUq => self.step_attribute_value_uq(input),
            TokenizerState::EntityInAttributeValue => self.step_entity_in_attribute_value(input),
            TokenizerState::BogusComment => self.step_bogus_comment(input),
            TokenizerState::MarkupDeclarationOpen => self.step_markup_declaration_open(input),
            TokenizerState::CommentStart => self.step_comment_start(input),
            TokenizerState::Comment => self.step_comment(input),
            TokenizerState::CommentDash => self.step_comment_dash(input),
            TokenizerState::CommentEnd => self.step_comment_end(input),
            TokenizerState::MatchDoctype => self.step_match_doctype(input, ctx),
            TokenizerState::Doctype => self.step_doctype(input),
            TokenizerState::BeforeDoctypeName => self.step_before_doctype_name(input),
            TokenizerState::DoctypeName => self.step_doctype_name(input),
            TokenizerState::AfterDoctypeName => self.step_after_doctype_name(input),
            TokenizerState::BogusDoctype => self.step_bogus_doctype(input),
            TokenizerState::NumberedEntity => self.step_numbered_entity(input, ctx),
            TokenizerState::NamedEntity => self.step_named_entity(input),
        }
    }

    fn step_data(&mut self, input: &mut Input) -> Step {
        loop {
            // Bulk-skip plain characters up to the next delimiter.
            let start = input.cursor();
            let haystack = &input.as_bytes()[start..];
            let delim = match self.content_model {
                ContentModel::Pcdata | ContentModel::Rcdata => {
                    memchr::memchr2(b'<', b'&', haystack)
                }
                ContentModel::Cdata => memchr::memchr(b'<', haystack),
                ContentModel::Plaintext => None,
            };
            let skip = delim.unwrap_or(haystack.len());
            if skip > 0 {
                self.extend_pending_run(start, start + skip);
                input.advance_to(start + skip);
            }

            match input.peek() {
                Peeked::Char('&')
                    if matches!(
                        self.content_model,
                        ContentModel::Pcdata | ContentModel::Rcdata
                    ) =>
                {
                    self.flush_pending_run();
                    self.transition(TokenizerState::EntityData);
                    return Step::Progress;
                }
                Peeked::Char('<') if self.content_model != ContentModel::Plaintext => {
                    self.flush_pending_run();
                    let (pos, len) = input.cur_pos();
                    self.markup_prefix = Span::new(pos, pos + len);
                    self.transition(TokenizerState::TagOpen);
                    input.advance();
                    return Step::Progress;
                }
                Peeked::Char(_) => {
                    let (pos, len) = input.cur_pos();
                    self.extend_pending_run(pos, pos + len);
                    input.advance();
                }
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Eof => {
                    self.flush_pending_run();
                    self.emit_eof();
                    return Step::Progress;
                }
            }
        }
    }

    fn step_entity_data(&mut self, input: &mut Input) -> Step {
        if !self.entity.complete {
            return self.consume_entity(input);
        }
        let Peeked::Char(_) = input.peek() else {
            unreachable!("entity completion left no character under the cursor");
        };
        let (pos, len) = input.cur_pos();
        self.emit_token(Token::Character {
            span: Span::new(pos, pos + len),
        });
        self.entity.complete = false;
        self.transition(TokenizerState::Data);
        input.advance();
        Step::Progress
    }

    fn step_tag_open(&mut self, input: &mut Input) -> Step {
        match self.content_model {
            ContentModel::Rcdata | ContentModel::Cdata => match input.peek() {
                Peeked::NeedMoreInput => Step::NeedMoreInput,
                Peeked::Char('/') => {
                    let (pos, len) = input.cur_pos();
                    self.markup_prefix.end = pos + len;
                    self.transition(TokenizerState::CloseTagOpen);
                    input.advance();
                    Step::Progress
                }
                _ => {
                    // Not a close tag: the `<` was plain text after all.
                    self.emit_token(Token::Character {
                        span: self.markup_prefix,
                    });
                    self.transition(TokenizerState::Data);
                    Step::Progress
                }
            },
            ContentModel::Pcdata => match input.peek() {
                Peeked::NeedMoreInput => Step::NeedMoreInput,
                Peeked::Char('!') => {
                    let (pos, len) = input.cur_pos();
                    self.markup_prefix.end = pos + len;
                    self.transition(TokenizerState::MarkupDeclarationOpen);
                    input.advance();
                    Step::Progress
                }
                Peeked::Char('/') => {
                    let (pos, len) = input.cur_pos();
                    self.markup_prefix.end = pos + len;
                    self.transition(TokenizerState::CloseTagOpen);
                    input.advance();
                    Step::Progress
                }
                Peeked::Char(c) if c.is_ascii_alphabetic() => {
                    if c.is_ascii_uppercase() {
                        input.lowercase();
                    }
                    let (pos, len) = input.cur_pos();
                    self.start_tag(Span::new(pos, pos + len), false);
                    self.transition(TokenizerState::TagName);
                    input.advance();
                    Step::Progress
                }
                Peeked::Char('>') => {
                    let (pos, len) = input.cur_pos();
                    self.markup_prefix.end = pos + len;
                    self.emit_token(Token::Character {
                        span: self.markup_prefix,
                    });
                    self.transition(TokenizerState::Data);
                    input.advance();
                    Step::Progress
                }
                Peeked::Char('?') => {
                    let (pos, len) = input.cur_pos();
                    self.current_comment = Span::new(pos, pos + len);
                    self.transition(TokenizerState::BogusComment);
                    input.advance();
                    Step::Progress
                }
                Peeked::Char(_) | Peeked::Eof => {
                    self.emit_token(Token::Character {
                        span: self.markup_prefix,
                    });
                    self.transition(TokenizerState::Data);
                    Step::Progress
                }
            },
            ContentModel::Plaintext => {
                // Data never opens a tag in PLAINTEXT.
                self.transition(TokenizerState::Data);
                Step::Progress
            }
        }
    }

    fn step_close_tag_open(&mut self, input: &mut Input) -> Step {
        if matches!(
            self.content_model,
            ContentModel::Rcdata | ContentModel::Cdata
        ) {
            self.close_tag_match = Span::default();
            self.transition(TokenizerState::CloseTagMatch);
            return Step::Progress;
        }

        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char(c) if c.is_ascii_alphabetic() => {
                if c.is_ascii_uppercase() {
                    input.lowercase();
                }
                let (pos, len) = input.cur_pos();
                self.start_tag(Span::new(pos, pos + len), true);
                self.transition(TokenizerState::TagName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_token(Token::Character {
                    span: self.markup_prefix,
                });
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                self.current_comment = Span::new(pos, pos + len);
                self.transition(TokenizerState::BogusComment);
                input.advance();
                Step::Progress
            }
        }
    }

    /// Match a candidate end tag against the last open tag name in RCDATA or
    /// CDATA. On failure the stream is rewound to just past `</` and the
    /// characters become data; on success the content model resets to PCDATA
    /// and the normal close-tag path runs.
    fn step_close_tag_match(&mut self, input: &mut Input) -> Step {
        let name = self.current_tag.name;
        while self.close_tag_match.len() < name.len() {
            match input.peek() {
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Eof => {
                    input.rewind(self.close_tag_match.len());
                    self.emit_token(Token::Character {
                        span: self.markup_prefix,
                    });
                    self.transition(TokenizerState::Data);
                    return Step::Progress;
                }
                Peeked::Char(_) => {
                    let (pos, len) = input.cur_pos();
                    if self.close_tag_match.is_empty() {
                        self.close_tag_match = Span::new(pos, pos + len);
                    } else {
                        self.close_tag_match.end = pos + len;
                    }
                    input.advance();

                    let candidate = self.close_tag_match;
                    if candidate.len() > name.len()
                        || (candidate.len() == name.len()
                            && !input.compare_range_ci(name.start, candidate.start, name.len()))
                    {
                        input.rewind(candidate.len());
                        self.emit_token(Token::Character {
                            span: self.markup_prefix,
                        });
                        self.transition(TokenizerState::Data);
                        return Step::Progress;
                    }
                }
            }
        }

        // Name matched; the next character decides whether this is a real
        // terminator.
        let following = match input.peek() {
            Peeked::NeedMoreInput => return Step::NeedMoreInput,
            other => other,
        };
        input.rewind(self.close_tag_match.len());
        let valid = matches!(
            following,
            Peeked::Eof
                | Peeked::Char('\t')
                | Peeked::Char('\n')
                | Peeked::Char('\x0B')
                | Peeked::Char('\x0C')
                | Peeked::Char(' ')
                | Peeked::Char('>')
                | Peeked::Char('/')
                | Peeked::Char('<')
        );
        if !valid {
            self.emit_token(Token::Character {
                span: self.markup_prefix,
            });
            self.transition(TokenizerState::Data);
            return Step::Progress;
        }
        self.content_model = ContentModel::Pcdata;
        self.transition(TokenizerState::CloseTagOpen);
        Step::Progress
    }

    fn step_tag_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char(c) if c.is_ascii_uppercase() => {
                input.lowercase();
                let (pos, len) = input.cur_pos();
                self.current_tag.name.end = pos + len;
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char('/') => {
                self.current_tag.self_closing = true;
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                self.current_tag.name.end = pos + len;
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_before_attribute_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                self.current_tag.self_closing = false;
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('/') => {
                self.current_tag.self_closing = true;
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(c) => {
                self.current_tag.self_closing = false;
                if c.is_ascii_uppercase() {
                    input.lowercase();
                }
                let (pos, len) = input.cur_pos();
                self.current_tag.attributes.push(Attribute {
                    ns: Default::default(),
                    name: Span::new(pos, pos + len),
                    value: Span::default(),
                });
                self.transition(TokenizerState::AttributeName);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_attribute_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                self.transition(TokenizerState::AfterAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('=') => {
                self.transition(TokenizerState::BeforeAttributeValue);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('/') => {
                self.current_tag.self_closing = true;
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(c) => {
                if c.is_ascii_uppercase() {
                    input.lowercase();
                }
                let (pos, len) = input.cur_pos();
                self.last_attribute().name.end = pos + len;
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_after_attribute_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                input.advance();
                Step::Progress
            }
            Peeked::Char('=') => {
                self.transition(TokenizerState::BeforeAttributeValue);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('/') => {
                self.current_tag.self_closing = true;
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(c) => {
                self.current_tag.self_closing = false;
                if c.is_ascii_uppercase() {
                    input.lowercase();
                }
                let (pos, len) = input.cur_pos();
                self.current_tag.attributes.push(Attribute {
                    ns: Default::default(),
                    name: Span::new(pos, pos + len),
                    value: Span::default(),
                });
                self.transition(TokenizerState::AttributeName);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_before_attribute_value(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                input.advance();
                Step::Progress
            }
            Peeked::Char('"') => {
                self.transition(TokenizerState::AttributeValueDq);
                input.advance();
                Step::Progress
            }
            Peeked::Char('&') => {
                // Not consumed: the unquoted-value state starts the entity.
                self.transition(TokenizerState::AttributeValueUq);
                Step::Progress
            }
            Peeked::Char('\'') => {
                self.transition(TokenizerState::AttributeValueSq);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                self.last_attribute().value = Span::new(pos, pos + len);
                self.transition(TokenizerState::AttributeValueUq);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_attribute_value_quoted(&mut self, input: &mut Input, quote: char) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char(c) if c == quote => {
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('&') => {
                self.prev_state = self.state;
                self.transition(TokenizerState::EntityInAttributeValue);
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                self.extend_attribute_value(pos, len);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_attribute_value_uq(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                self.transition(TokenizerState::BeforeAttributeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('&') => {
                self.prev_state = self.state;
                self.transition(TokenizerState::EntityInAttributeValue);
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('<') | Peeked::Eof => {
                self.emit_current_tag(input);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                self.extend_attribute_value(pos, len);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_entity_in_attribute_value(&mut self, input: &mut Input) -> Step {
        if !self.entity.complete {
            return self.consume_entity(input);
        }
        let Peeked::Char(_) = input.peek() else {
            unreachable!("entity completion left no character under the cursor");
        };
        let (pos, len) = input.cur_pos();
        self.extend_attribute_value(pos, len);
        self.entity.complete = false;
        let resume = self.prev_state;
        self.transition(resume);
        input.advance();
        Step::Progress
    }

    fn step_bogus_comment(&mut self, input: &mut Input) -> Step {
        loop {
            match input.peek() {
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Char('>') => {
                    input.advance();
                    break;
                }
                Peeked::Char(_) => {
                    let (pos, len) = input.cur_pos();
                    if self.current_comment.is_empty() {
                        self.current_comment = Span::new(pos, pos + len);
                    } else {
                        self.current_comment.end = pos + len;
                    }
                    input.advance();
                }
                Peeked::Eof => break,
            }
        }
        self.emit_token(Token::Comment {
            span: self.current_comment,
        });
        self.transition(TokenizerState::Data);
        Step::Progress
    }

    fn step_markup_declaration_open(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('-') => {
                self.transition(TokenizerState::CommentStart);
                input.advance();
                Step::Progress
            }
            Peeked::Char(c) if c.eq_ignore_ascii_case(&'d') => {
                input.uppercase();
                self.match_doctype_count = 1;
                self.transition(TokenizerState::MatchDoctype);
                input.advance();
                Step::Progress
            }
            _ => {
                self.current_comment = Span::default();
                self.transition(TokenizerState::BogusComment);
                Step::Progress
            }
        }
    }

    fn step_comment_start(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('-') => {
                self.current_comment = Span::default();
                self.transition(TokenizerState::Comment);
                input.advance();
                Step::Progress
            }
            _ => {
                self.current_comment = Span::default();
                input.push_back('-');
                self.transition(TokenizerState::BogusComment);
                Step::Progress
            }
        }
    }

    fn step_comment(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('-') => {
                self.transition(TokenizerState::CommentDash);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_token(Token::Comment {
                    span: self.current_comment,
                });
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                if self.current_comment.is_empty() {
                    self.current_comment = Span::new(pos, pos + len);
                } else {
                    self.current_comment.end = pos + len;
                }
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_comment_dash(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('-') => {
                self.transition(TokenizerState::CommentEnd);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_token(Token::Comment {
                    span: self.current_comment,
                });
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                // Contiguity in the buffer lets the span absorb the dash.
                let (pos, len) = input.cur_pos();
                if self.current_comment.is_empty() {
                    self.current_comment = Span::new(pos, pos + len);
                } else {
                    self.current_comment.end = pos + len;
                }
                self.transition(TokenizerState::Comment);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_comment_end(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('>') => {
                self.emit_token(Token::Comment {
                    span: self.current_comment,
                });
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Char('-') => {
                // Keep the first dash of the pair in the comment.
                let (pos, len) = input.cur_pos();
                if self.current_comment.is_empty() {
                    self.current_comment = Span::new(pos, pos + len);
                } else {
                    self.current_comment.end = pos;
                }
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_token(Token::Comment {
                    span: self.current_comment,
                });
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                let (pos, len) = input.cur_pos();
                if self.current_comment.is_empty() {
                    self.current_comment = Span::new(pos, pos + len);
                } else {
                    self.current_comment.end = pos + len;
                }
                self.transition(TokenizerState::Comment);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_match_doctype(&mut self, input: &mut Input, ctx: &mut DocumentParseContext) -> Step {
        const REST: &[u8] = b"OCTYPE";
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char(c)
                if c.is_ascii()
                    && (c as u8)
                        .eq_ignore_ascii_case(&REST[self.match_doctype_count as usize - 1]) =>
            {
                input.uppercase();
                input.advance();
                if self.match_doctype_count as usize == REST.len() {
                    self.current_doctype = Doctype::default();
                    self.transition(TokenizerState::Doctype);
                } else {
                    self.match_doctype_count += 1;
                }
                Step::Progress
            }
            _ => {
                // Push the matched letters back in reverse and reparse them
                // as a bogus comment.
                ctx.record_error(ParseError {
                    origin: ErrorOrigin::Tokenizer,
                    code: ParseErrorCode::MalformedDoctype,
                    position: input.cursor(),
                    detail: Some("incomplete DOCTYPE keyword"),
                });
                input.rewind(self.match_doctype_count as usize);
                self.current_comment = Span::default();
                self.transition(TokenizerState::BogusComment);
                Step::Progress
            }
        }
    }

    fn step_doctype(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                input.advance();
                self.transition(TokenizerState::BeforeDoctypeName);
                Step::Progress
            }
            _ => {
                self.transition(TokenizerState::BeforeDoctypeName);
                Step::Progress
            }
        }
    }

    fn step_before_doctype_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(c) => {
                if c.is_ascii_lowercase() {
                    input.uppercase();
                }
                let (pos, len) = input.cur_pos();
                self.current_doctype.name = Span::new(pos, pos + len);
                self.transition(TokenizerState::DoctypeName);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_doctype_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                self.transition(TokenizerState::AfterDoctypeName);
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_doctype(input, false);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(c) => {
                if c.is_ascii_lowercase() {
                    input.uppercase();
                }
                let (pos, len) = input.cur_pos();
                self.current_doctype.name.end = pos + len;
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_after_doctype_name(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('\t' | '\n' | '\x0B' | '\x0C' | ' ') => {
                input.advance();
                Step::Progress
            }
            Peeked::Char('>') => {
                self.emit_doctype(input, false);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                self.transition(TokenizerState::BogusDoctype);
                input.advance();
                Step::Progress
            }
        }
    }

    fn step_bogus_doctype(&mut self, input: &mut Input) -> Step {
        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('>') => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                input.advance();
                Step::Progress
            }
            Peeked::Eof => {
                self.emit_doctype(input, true);
                self.transition(TokenizerState::Data);
                Step::Progress
            }
            Peeked::Char(_) => {
                input.advance();
                Step::Progress
            }
        }
    }

    /// Shared entry to the entity sub-machines. The current state is stashed
    /// as the return state before dispatching.
    fn consume_entity(&mut self, input: &mut Input) -> Step {
        if !self.entity.done_setup {
            debug_assert_eq!(input.peek(), Peeked::Char('&'));
            let (pos, len) = input.cur_pos();
            self.entity = EntityMatch {
                span: Span::new(pos, pos + len),
                base: 0,
                codepoint: 0,
                had_data: false,
                return_state: self.state,
                complete: false,
                done_setup: true,
                search: EntitySearch::new(),
                prev_len: len,
            };
            input.advance();
        }

        match input.peek() {
            Peeked::NeedMoreInput => Step::NeedMoreInput,
            Peeked::Char('#') => {
                let (pos, len) = input.cur_pos();
                self.entity.span.end = pos + len;
                self.transition(TokenizerState::NumberedEntity);
                input.advance();
                Step::Progress
            }
            _ => {
                self.transition(TokenizerState::NamedEntity);
                Step::Progress
            }
        }
    }

    fn step_numbered_entity(&mut self, input: &mut Input, ctx: &mut DocumentParseContext) -> Step {
        if self.entity.base == 0 {
            match input.peek() {
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Char('x' | 'X') => {
                    self.entity.base = 16;
                    let (pos, len) = input.cur_pos();
                    self.entity.span.end = pos + len;
                    input.advance();
                }
                _ => self.entity.base = 10,
            }
        }

        loop {
            match input.peek() {
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Char(c) => {
                    let digit = match (self.entity.base, c) {
                        (10, '0'..='9') => Some(c as u32 - '0' as u32),
                        (16, '0'..='9') => Some(c as u32 - '0' as u32),
                        (16, 'a'..='f') => Some(c as u32 - 'a' as u32 + 10),
                        (16, 'A'..='F') => Some(c as u32 - 'A' as u32 + 10),
                        _ => None,
                    };
                    let Some(digit) = digit else { break };
                    self.entity.had_data = true;
                    self.entity.codepoint = self
                        .entity
                        .codepoint
                        .saturating_mul(self.entity.base)
                        .saturating_add(digit);
                    let (pos, len) = input.cur_pos();
                    self.entity.span.end = pos + len;
                    input.advance();
                }
                Peeked::Eof => break,
            }
        }

        if let Peeked::Char(';') = input.peek() {
            let (pos, len) = input.cur_pos();
            self.entity.span.end = pos + len;
            input.advance();
        }

        input.rewind(self.entity.span.len());

        if self.entity.had_data {
            let mapped = match self.entity.codepoint {
                0x80..=0x9F => CP1252[self.entity.codepoint as usize - 0x80],
                0 => 0xFFFD,
                cp if cp > 0x10FFFF => 0xFFFD,
                cp => cp,
            };
            let ch = char::from_u32(mapped).unwrap_or('\u{FFFD}');
            input.replace_range(self.entity.span.start, self.entity.span.len(), ch);
        } else {
            ctx.record_error(ParseError {
                origin: ErrorOrigin::Tokenizer,
                code: ParseErrorCode::InvalidCharacterReference,
                position: self.entity.span.start,
                detail: Some("numeric reference with no digits"),
            });
        }

        self.entity.done_setup = false;
        self.entity.complete = true;
        let resume = self.entity.return_state;
        self.transition(resume);
        Step::Progress
    }

    fn step_named_entity(&mut self, input: &mut Input) -> Step {
        let following = loop {
            match input.peek() {
                Peeked::NeedMoreInput => return Step::NeedMoreInput,
                Peeked::Eof => break Peeked::Eof,
                Peeked::Char(c) => {
                    if !c.is_ascii() {
                        // Entity names are ASCII only.
                        break Peeked::Char(c);
                    }
                    match self.entity.search.step(c as u8) {
                        EntityStep::Match(ch) => {
                            self.entity.codepoint = ch as u32;
                            let (pos, len) = input.cur_pos();
                            self.entity.span.end = pos + len;
                            self.entity.prev_len = self.entity.span.len();
                        }
                        EntityStep::Advance => {
                            let (pos, len) = input.cur_pos();
                            self.entity.span.end = pos + len;
                        }
                        EntityStep::Dead => break Peeked::Char(c),
                    }
                    input.advance();
                }
            }
        };

        // Consume the `;` only if the match ended exactly at it.
        if self.entity.codepoint != 0
            && following == Peeked::Char(';')
            && self.entity.prev_len == self.entity.span.len()
        {
            self.entity.prev_len += 1;
        }

        input.rewind(self.entity.span.len());

        if self.entity.codepoint != 0 {
            let ch = char::from_u32(self.entity.codepoint).unwrap_or('\u{FFFD}');
            input.replace_range(self.entity.span.start, self.entity.prev_len, ch);
        }

        self.entity.done_setup = false;
        self.entity.complete = true;
        let resume = self.entity.return_state;
        self.transition(resume);
        Step::Progress
    }

    fn start_tag(&mut self, name: Span, is_end: bool) {
        self.current_tag = Tag {
            name,
            attributes: Vec::new(),
            self_closing: false,
        };
        self.current_tag_is_end = is_end;
    }

    fn last_attribute(&mut self) -> &mut Attribute {
        self.current_tag
            .attributes
            .last_mut()
            .expect("attribute states require a started attribute")
    }

    fn extend_attribute_value(&mut self, pos: usize, len: usize) {
        let value = &mut self.last_attribute().value;
        if value.is_empty() {
            *value = Span::new(pos, pos + len);
        } else {
            value.end = pos + len;
        }
    }

    fn extend_pending_run(&mut self, start: usize, end: usize) {
        match &mut self.pending_run {
            Some(run) => run.end = end,
            None => self.pending_run = Some(Span::new(start, end)),
        }
    }

    fn flush_pending_run(&mut self) {
        if let Some(run) = self.pending_run.take()
            && !run.is_empty()
        {
            self.emit_token(Token::Character { span: run });
        }
    }

    fn emit_eof(&mut self) {
        debug_assert!(!self.eof_emitted);
        self.eof_emitted = true;
        if self.config.emit_eof {
            self.emit_token(Token::Eof);
        }
    }
}

#[cfg(test)]
mod tests;
