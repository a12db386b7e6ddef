//! Optional counters for instrumentation.

#[derive(Clone, Copy, Debug, Default)]
pub struct Counters {
    pub tokens_emitted: u64,
    pub parse_errors: u64,
    pub errors_dropped: u64,
}
