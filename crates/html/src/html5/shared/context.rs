//! Document-level parse context (shared resources).

use super::{Counters, ErrorPolicy, ParseError};
use std::collections::VecDeque;

/// Document-level parse context shared by tokenizer and tree builder.
///
/// Owns document-lifetime resources: the error policy, the bounded error
/// store, and instrumentation counters.
#[derive(Debug)]
pub struct DocumentParseContext {
    pub counters: Counters,
    pub error_policy: ErrorPolicy,
    errors: Option<VecDeque<ParseError>>,
}

impl Default for DocumentParseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParseContext {
    pub fn new() -> Self {
        Self::with_policy(ErrorPolicy::default())
    }

    pub fn with_policy(error_policy: ErrorPolicy) -> Self {
        let store_enabled = error_policy.track
            && error_policy.max_stored != 0
            && (!error_policy.debug_only || cfg!(debug_assertions));
        Self {
            counters: Counters::default(),
            error_policy,
            errors: store_enabled.then(VecDeque::new),
        }
    }

    /// Record a recoverable parse error. Never panics on malformed input.
    pub fn record_error(&mut self, error: ParseError) {
        if self.error_policy.track_counters {
            self.counters.parse_errors = self.counters.parse_errors.saturating_add(1);
        }
        let Some(errors) = self.errors.as_mut() else {
            return;
        };
        if errors.len() >= self.error_policy.max_stored {
            errors.pop_front();
            self.counters.errors_dropped = self.counters.errors_dropped.saturating_add(1);
        }
        errors.push_back(error);
    }

    /// Stored errors, oldest first. Empty when storage is disabled.
    pub fn errors(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter().flatten()
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        self.errors
            .as_mut()
            .map(|e| e.drain(..).collect())
            .unwrap_or_default()
    }
}
