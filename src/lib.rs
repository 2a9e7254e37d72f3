//! Time-ordered k-way merge of timestamped trace message streams.
//!
//! [`MuxerFilter`] owns a dynamic set of input ports and, once its output
//! is subscribed to, builds a [`MuxerIterator`] over every connected
//! port's upstream. The iterator merges its upstreams into a single
//! monotonically non-decreasing stream, enforcing that every clock class
//! observed across them is mutually compatible.
//!
//! This crate does not decode trace data, load plugins, or wire a
//! processing graph together; it implements the merge itself, against the
//! [`UpstreamIterator`] trait as the only contract it needs from whatever
//! produces the upstream streams.

mod clock;
mod cursor;
mod error;
mod filter;
mod iterator;
mod message;
mod timestamp;


pub use clock::ClockExpectation;
pub use cursor::{
    SeekOutcome,
    UpstreamIterator,
    UpstreamNext,
};
pub use error::{
    ClockExpectationDescription,
    MuxerError,
};
pub use filter::{
    Config,
    ConfigValue,
    MuxerFilter,
};
pub use iterator::{
    MuxerIterator,
    NextBatchStatus,
};
pub use message::{
    ActivityClockSnapshot,
    ClockClass,
    ClockSnapshot,
    ClockValue,
    Message,
    StreamClassId,
    StreamId,
};
