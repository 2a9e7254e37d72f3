//! Extracts a signed 64-bit nanoseconds-from-origin timestamp from a
//! message, given the clock regime and the last timestamp emitted.

use crate::clock::ClockExpectation;
use crate::error::MuxerError;
use crate::message::{
    ActivityClockSnapshot,
    Message,
};

/// Computes the comparable timestamp for the head-of-queue message of a
/// cursor. Stateless aside from the two inputs it's given; owned logic
/// lives in [`crate::iterator::MuxerIterator`].
pub fn timestamp_ns(
    message: &Message,
    clock_expect: &ClockExpectation,
    last_ts_ns: i64,
) -> Result<i64, MuxerError> {
    if *clock_expect == ClockExpectation::None {
        // No time axis: every message is ordered purely by arrival, and
        // the stable tie break in cursor-selection order preserves that.
        return Ok(last_ts_ns);
    }

    match message {
        Message::Event { clock_snapshot, .. }
        | Message::PacketBeginning { clock_snapshot, .. }
        | Message::PacketEnd { clock_snapshot, .. }
        | Message::DiscardedEvents {
            begin_clock_snapshot: clock_snapshot,
            ..
        }
        | Message::DiscardedPackets {
            begin_clock_snapshot: clock_snapshot,
            ..
        } => match clock_snapshot {
            Some(cs) => cs.ns_from_origin(),
            // Only reachable if a stream's class claims a clock class but
            // an individual message fails to carry the snapshot it
            // implies; outside the `None` regime (handled above) that's a
            // contract violation, not a legitimate clockless message.
            None => Err(MuxerError::TimestampExtraction(
                "message carries no clock snapshot outside the clockless regime".to_string(),
            )),
        },

        Message::MessageIteratorInactivity { clock_snapshot: Some(cs) } => cs.ns_from_origin(),

        Message::StreamActivityBeginning { clock_snapshot, .. }
        | Message::StreamActivityEnd { clock_snapshot, .. } => match clock_snapshot {
            ActivityClockSnapshot::Known(cs) => cs.ns_from_origin(),
            ActivityClockSnapshot::Unknown => Ok(last_ts_ns),
        },

        // Stream beginning/end and inactivity-with-no-snapshot "stick" to
        // the current time so they're emitted immediately before any
        // later message.
        Message::StreamBeginning { .. }
        | Message::StreamEnd { .. }
        | Message::MessageIteratorInactivity { clock_snapshot: None }
        | Message::Other => Ok(last_ts_ns),
    }
}
