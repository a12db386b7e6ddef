//! Shared types for the HTML5 parsing path.
//!
//! This module is `pub(crate)`; downstream consumers import these types via
//! `html::html5::{Token, Span, ParseError, ...}` to preserve API flexibility.

mod context;
mod counters;
mod error;
mod input;
mod span;
mod token;

pub use context::DocumentParseContext;
pub use counters::Counters;
pub use error::{ErrorOrigin, ErrorPolicy, ParseError, ParseErrorCode};
pub use input::{ByteStreamDecoder, Input, Peeked};
pub use span::Span;
pub use token::{Attribute, ContentModel, Doctype, Namespace, Tag, Token};
