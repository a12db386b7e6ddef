//! Streaming HTML5 parsing engine.
//!
//! The crate is split along the parsing pipeline:
//!
//! ```text
//! bytes -> [ByteStreamDecoder] -> Input -> [Html5Tokenizer] -> tokens
//!       -> [Html5TreeBuilder] -> TreeHandler calls
//! ```
//!
//! [`html5::Html5ParseSession`] wires the stages together for embedders that
//! just want to feed byte chunks and receive tree mutations. The individual
//! stages are public for callers that need finer control (custom scheduling,
//! token inspection, fragment-style drivers).
//!
//! Malformed markup is never fatal: the machines recover the way interop
//! requires and report parse errors through the shared
//! [`html5::DocumentParseContext`].

pub mod html5;
