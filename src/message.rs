//! The message type the muxer merges, and the clock types it carries.
//!
//! The upstream framework's messages are a tagged union with a handful of
//! accessor methods per variant; reimplemented here as a sealed sum type so
//! the timestamper and clock policy are plain `match`es instead of virtual
//! dispatch per message.

use crate::error::MuxerError;

/// Opaque identifier for a stream class, carried only for clock-conflict
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamClassId(pub u64);

/// Opaque identifier for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

/// A named time axis. Two clock classes are the same axis only if they
/// agree on UUID (when both specify one) or are the same `Absolute` origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockClass {
    pub uuid: Option<[u8; 16]>,
    pub name: String,
    pub origin_is_unix_epoch: bool,
}

impl ClockClass {
    pub fn new(name: impl Into<String>, origin_is_unix_epoch: bool, uuid: Option<[u8; 16]>) -> Self {
        Self {
            uuid,
            name: name.into(),
            origin_is_unix_epoch,
        }
    }
}

/// The raw reading carried by a [`ClockSnapshot`]. Modeled as an enum
/// (rather than a bare `i64`) so that an upstream producing a value that
/// cannot be represented as nanoseconds-from-origin can be exercised in
/// tests without fabricating a second fallible conversion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockValue {
    NanosFromOrigin(i64),
    Unrepresentable,
}

impl ClockValue {
    pub fn ns_from_origin(&self) -> Result<i64, MuxerError> {
        match self {
            ClockValue::NanosFromOrigin(ns) => Ok(*ns),
            ClockValue::Unrepresentable => Err(MuxerError::TimestampExtraction(
                "clock value has no representation in nanoseconds from origin".to_string(),
            )),
        }
    }
}

/// A point-in-time reading against a [`ClockClass`].
#[derive(Debug, Clone)]
pub struct ClockSnapshot {
    pub clock_class: ClockClass,
    pub value: ClockValue,
}

impl ClockSnapshot {
    pub fn new(clock_class: ClockClass, value: ClockValue) -> Self {
        Self { clock_class, value }
    }

    pub fn ns_from_origin(&self) -> Result<i64, MuxerError> {
        self.value.ns_from_origin()
    }
}

/// The clock snapshot carried by a stream activity message, which may be
/// absent entirely (the activity's time is simply unknown).
#[derive(Debug, Clone)]
pub enum ActivityClockSnapshot {
    Known(ClockSnapshot),
    Unknown,
}

/// A trace message. Every variant that can carry a default clock snapshot
/// exposes it directly as a field rather than through a fallible accessor,
/// since there is no separate "does this variant have a clock" query in
/// this crate's contract. The snapshot fields are `Option` because a stream
/// whose class declares no default clock (the locked `None` regime) has no
/// snapshot to attach — there is no real clock reading to fabricate one
/// from.
#[derive(Debug, Clone)]
pub enum Message {
    /// Marks the start of a stream. `default_clock_class` is the stream
    /// class's default clock class, if it declares one.
    StreamBeginning {
        stream: StreamId,
        stream_class: StreamClassId,
        default_clock_class: Option<ClockClass>,
    },
    StreamEnd { stream: StreamId },
    PacketBeginning {
        stream: StreamId,
        clock_snapshot: Option<ClockSnapshot>,
    },
    PacketEnd {
        stream: StreamId,
        clock_snapshot: Option<ClockSnapshot>,
    },
    Event {
        stream: StreamId,
        clock_snapshot: Option<ClockSnapshot>,
    },
    DiscardedEvents {
        stream: StreamId,
        begin_clock_snapshot: Option<ClockSnapshot>,
    },
    DiscardedPackets {
        stream: StreamId,
        begin_clock_snapshot: Option<ClockSnapshot>,
    },
    StreamActivityBeginning {
        stream: StreamId,
        clock_snapshot: ActivityClockSnapshot,
    },
    StreamActivityEnd {
        stream: StreamId,
        clock_snapshot: ActivityClockSnapshot,
    },
    /// Raised by an upstream iterator itself, not by any stream, to signal
    /// that it has no message ready right now but didn't want to return
    /// `Again` (used by iterators that need to report progress without
    /// producing data, e.g. a live-viewer poll that came back empty).
    MessageIteratorInactivity { clock_snapshot: Option<ClockSnapshot> },
    /// Any other message kind the muxer does not special-case; it sticks
    /// to `last_ts_ns` like stream beginning/end.
    Other,
}

impl Message {
    pub fn stream(&self) -> Option<StreamId> {
        match self {
            Message::StreamBeginning { stream, .. }
            | Message::StreamEnd { stream }
            | Message::PacketBeginning { stream, .. }
            | Message::PacketEnd { stream, .. }
            | Message::Event { stream, .. }
            | Message::DiscardedEvents { stream, .. }
            | Message::DiscardedPackets { stream, .. }
            | Message::StreamActivityBeginning { stream, .. }
            | Message::StreamActivityEnd { stream, .. } => Some(*stream),
            Message::MessageIteratorInactivity { .. } | Message::Other => None,
        }
    }
}
