use std::fmt;

/// Fatal conditions raised while merging upstream message iterators.
///
/// `Again` (no data yet, retry later) and `End` (the stream is exhausted)
/// are not errors: they are outcome variants returned alongside `Ok`, never
/// through this type. Everything here is terminal for the iterator that
/// raised it.
#[derive(thiserror::Error, Debug)]
pub enum MuxerError {
    /// An upstream iterator's `next` or `seek_beginning` call failed.
    #[error("upstream iterator failed: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stream or message carried a clock class incompatible with the
    /// regime locked in by the first observation.
    #[error(
        "clock class incompatible: expected {expected}, observed {observed} \
         (stream {stream_id:?}, stream class {stream_class_id:?})"
    )]
    ClockIncompatible {
        expected: ClockExpectationDescription,
        observed: ClockExpectationDescription,
        stream_id: Option<u64>,
        stream_class_id: Option<u64>,
    },

    /// An upstream produced a timestamp smaller than the last one emitted.
    #[error("non-monotonic timestamp: previous {previous} ns, next {next} ns")]
    NonMonotonicTimestamp { previous: i64, next: i64 },

    /// Converting a clock snapshot to nanoseconds-from-origin failed.
    #[error("failed to extract timestamp from clock snapshot: {0}")]
    TimestampExtraction(String),

    /// A configuration parameter was malformed, or the filter was asked to
    /// build a message iterator re-entrantly.
    #[error("invalid muxer configuration: {0}")]
    ConfigInvalid(String),
}

/// Human-readable description of a clock-class expectation or of an
/// observed clock, used only to populate [`MuxerError::ClockIncompatible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockExpectationDescription(pub String);

impl fmt::Display for ClockExpectationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ClockExpectationDescription {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}
