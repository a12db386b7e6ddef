//! HTML5 parsing path: streaming tokenizer plus tree construction.

mod session;
pub(crate) mod shared;
pub mod tokenizer;
pub mod tree_builder;

// Public re-exports: consumers import from `html::html5::*` rather than
// `shared::*`.
pub use session::Html5ParseSession;
pub use shared::{
    Attribute, ByteStreamDecoder, ContentModel, Counters, Doctype, DocumentParseContext,
    ErrorOrigin, ErrorPolicy, Input, Namespace, ParseError, ParseErrorCode, Peeked, Span, Tag,
    Token,
};
pub use tokenizer::{
    Html5Tokenizer, SpanResolver, TokenBatch, TokenFmt, TokenTestFormatExt, TokenizeResult,
    TokenizerConfig, TokenizerStats,
};
pub use tree_builder::{
    AttrView, ElementType, Html5TreeBuilder, ScopeKind, TreeBuilderConfig, TreeBuilderError,
    TreeBuilderStep, TreeHandler, TreeHandlerError,
};
