//! The k-way merge itself.

use crate::clock::ClockPolicy;
use crate::cursor::{
    PullOutcome,
    SeekOutcome,
    UpstreamCursor,
    UpstreamIterator,
};
use crate::error::MuxerError;
use crate::message::Message;
use crate::timestamp::timestamp_ns;

/// How many messages an upstream is asked for at a time when its cursor's
/// queue runs dry. Unrelated to the caller-supplied capacity of
/// [`MuxerIterator::next`], which bounds the muxer's own output batch.
const UPSTREAM_PULL_BATCH: usize = 64;

/// A single emitted message, or a non-erroneous reason none is available
/// right now.
enum NextOutcome {
    Message(Message),
    Again,
    End,
}

/// Why [`MuxerIterator::next`] stopped before filling its batch to
/// capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextBatchStatus {
    Again,
    End,
}

/// A fatal condition discovered while filling a batch after some messages
/// had already been produced; delivered on the following call instead of
/// being dropped.
enum Pending {
    Again,
    End,
    Error(MuxerError),
}

/// Whether cursor validation ran to completion or an upstream asked to be
/// retried partway through.
enum ValidateOutcome {
    Proceed,
    Again,
}

/// Merges the messages of every connected upstream into one time-ordered
/// stream.
///
/// Not `Sync`: a single iterator is driven by one cooperative caller at a
/// time, per the component contract in the module documentation.
pub struct MuxerIterator {
    active: Vec<UpstreamCursor>,
    ended: Vec<UpstreamCursor>,
    last_ts_ns: i64,
    clock_policy: ClockPolicy,
    pending: Option<Pending>,
}

impl MuxerIterator {
    pub(crate) fn new(upstreams: Vec<Box<dyn UpstreamIterator>>, assume_absolute_clocks: bool) -> Self {
        Self {
            active: upstreams.into_iter().map(UpstreamCursor::new).collect(),
            ended: Vec::new(),
            last_ts_ns: i64::MIN,
            clock_policy: ClockPolicy::new(assume_absolute_clocks),
            pending: None,
        }
    }

    /// Fills up to `capacity` messages (`capacity` must be at least one).
    ///
    /// Repeatedly selects and emits the youngest available message, and
    /// stops at the first non-progress status. If that status arrives
    /// after at least one message was already produced, the batch is
    /// returned with `Ok` and the status is replayed verbatim on the next
    /// call — it is never lost, and never reported twice.
    pub fn next(&mut self, capacity: usize) -> Result<(Vec<Message>, Option<NextBatchStatus>), MuxerError> {
        assert!(capacity >= 1, "capacity must be at least 1");

        if let Some(pending) = self.pending.take() {
            return match pending {
                Pending::Error(e) => Err(e),
                Pending::Again => Ok((Vec::new(), Some(NextBatchStatus::Again))),
                Pending::End => Ok((Vec::new(), Some(NextBatchStatus::End))),
            };
        }

        let mut out = Vec::new();
        while out.len() < capacity {
            match self.next_one() {
                Ok(NextOutcome::Message(msg)) => out.push(msg),
                Ok(NextOutcome::Again) => {
                    if out.is_empty() {
                        return Ok((out, Some(NextBatchStatus::Again)));
                    }
                    self.pending = Some(Pending::Again);
                    break;
                },
                Ok(NextOutcome::End) => {
                    if out.is_empty() {
                        return Ok((out, Some(NextBatchStatus::End)));
                    }
                    self.pending = Some(Pending::End);
                    break;
                },
                Err(e) => {
                    if out.is_empty() {
                        return Err(e);
                    }
                    self.pending = Some(Pending::Error(e));
                    break;
                },
            }
        }

        Ok((out, None))
    }

    fn next_one(&mut self) -> Result<NextOutcome, MuxerError> {
        if let ValidateOutcome::Again = self.validate_cursors()? {
            return Ok(NextOutcome::Again);
        }

        if self.active.is_empty() {
            return Ok(NextOutcome::End);
        }

        let winner_idx = self.select_youngest()?;
        let ts = timestamp_ns(self.active[winner_idx].peek(), self.clock_policy.expectation(), self.last_ts_ns)?;

        if ts < self.last_ts_ns {
            return Err(MuxerError::NonMonotonicTimestamp {
                previous: self.last_ts_ns,
                next: ts,
            });
        }

        let msg = self.active[winner_idx].pop();
        self.last_ts_ns = ts;
        Ok(NextOutcome::Message(msg))
    }

    /// Pulls every active cursor whose queue is empty. Moves cursors that
    /// report `End` into `ended` via a swap-remove, which does not preserve
    /// the relative order of the remaining active cursors. Order among
    /// active cursors carries no meaning beyond first-seen tie-breaking at
    /// selection time, which operates on whatever order survives here.
    fn validate_cursors(&mut self) -> Result<ValidateOutcome, MuxerError> {
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].has_queued() {
                i += 1;
                continue;
            }
            match self.active[i].pull(UPSTREAM_PULL_BATCH)? {
                // A single upstream asking to be retried aborts the whole
                // validation pass immediately: no partial progress.
                PullOutcome::Again => {
                    tracing::trace!(cursor = i, "upstream not ready, deferring batch");
                    return Ok(ValidateOutcome::Again);
                },
                PullOutcome::Progress => i += 1,
                PullOutcome::Ended => {
                    tracing::debug!(cursor = i, remaining_active = self.active.len() - 1, "upstream ended");
                    let cursor = self.active.swap_remove(i);
                    self.ended.push(cursor);
                    // don't advance i: a different cursor has taken slot i
                },
            }
        }
        Ok(ValidateOutcome::Proceed)
    }

    fn select_youngest(&mut self) -> Result<usize, MuxerError> {
        let mut winner: Option<(usize, i64)> = None;
        for idx in 0..self.active.len() {
            let head = self.active[idx].peek();
            let stream_id = head.stream().map(|s| s.0);
            match head {
                Message::StreamBeginning {
                    default_clock_class,
                    stream_class,
                    ..
                } => {
                    self.clock_policy
                        .validate_new_stream(default_clock_class.as_ref(), stream_id, Some(stream_class.0))?;
                },
                Message::MessageIteratorInactivity {
                    clock_snapshot: Some(snapshot),
                } => {
                    self.clock_policy.validate_clock_class(&snapshot.clock_class, stream_id, None)?;
                },
                _ => {},
            }

            let ts = timestamp_ns(self.active[idx].peek(), self.clock_policy.expectation(), self.last_ts_ns)?;
            let is_new_winner = match winner {
                None => true,
                Some((_, winner_ts)) => ts < winner_ts,
            };
            if is_new_winner {
                winner = Some((idx, ts));
            }
        }

        Ok(winner.expect("active is non-empty; a winner must have been selected").0)
    }

    pub fn can_seek_beginning(&self) -> bool {
        self.active.iter().all(UpstreamCursor::can_seek_beginning)
            && self.ended.iter().all(UpstreamCursor::can_seek_beginning)
    }

    /// Seeks every upstream this iterator has ever touched back to its
    /// beginning, then restores ended cursors to active and resets
    /// timestamp/clock-policy state.
    ///
    /// All-or-nothing in effect but not atomic in execution: if a cursor
    /// partway through reports `Again`, the iterator is left with a mix of
    /// sought and not-yet-sought cursors, and the only safe recourse is to
    /// discard it.
    pub fn seek_beginning(&mut self) -> Result<SeekOutcome, MuxerError> {
        tracing::debug!(
            active = self.active.len(),
            ended = self.ended.len(),
            "seeking every upstream to its beginning"
        );
        for cursor in self.ended.iter_mut().chain(self.active.iter_mut()) {
            match cursor.seek_beginning()? {
                SeekOutcome::Again => {
                    tracing::warn!("upstream asked to retry mid-seek; iterator left in a mixed state");
                    return Ok(SeekOutcome::Again);
                },
                SeekOutcome::Done => {},
            }
        }

        self.active.append(&mut self.ended);
        self.last_ts_ns = i64::MIN;
        self.clock_policy.reset();
        Ok(SeekOutcome::Done)
    }
}
