//! The per-upstream buffered handle the muxer pulls from.

use std::collections::VecDeque;

use crate::error::MuxerError;
use crate::message::Message;

/// Outcome of asking an upstream iterator for its next batch of messages.
pub enum UpstreamNext {
    /// At least one message is ready. A batch must never be empty.
    Batch(Vec<Message>),
    /// No message is ready yet; try again later.
    Again,
    /// The upstream is exhausted.
    End,
}

/// Outcome of asking an upstream iterator to seek to its beginning.
pub enum SeekOutcome {
    Done,
    Again,
}

/// The contract the muxer consumes from every upstream message iterator.
///
/// This mirrors the framework's own message-iterator interface; the muxer
/// only ever calls these three methods on each of its upstreams.
pub trait UpstreamIterator: Send {
    fn next(&mut self, capacity: usize) -> Result<UpstreamNext, MuxerError>;
    fn can_seek_beginning(&self) -> bool;
    fn seek_beginning(&mut self) -> Result<SeekOutcome, MuxerError>;
}

/// Result of pulling on a cursor: either messages landed in its queue, it
/// asked to be retried, or its upstream just reported `End`.
pub(crate) enum PullOutcome {
    Progress,
    Again,
    Ended,
}

/// One upstream iterator plus its FIFO of buffered, not-yet-emitted
/// messages.
///
/// The upstream handle is retained even after the cursor's stream has
/// ended: a muxer iterator that later seeks to the beginning needs to seek
/// every upstream it has ever touched, not just the ones still producing.
pub(crate) struct UpstreamCursor {
    iter: Box<dyn UpstreamIterator>,
    queue: VecDeque<Message>,
}

impl UpstreamCursor {
    pub(crate) fn new(iter: Box<dyn UpstreamIterator>) -> Self {
        Self {
            iter,
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Invokes the upstream's batch-next. Does nothing to `queue` on
    /// `Again` or `End`; appends every message in the batch to the tail on
    /// progress.
    pub(crate) fn pull(&mut self, capacity: usize) -> Result<PullOutcome, MuxerError> {
        match self.iter.next(capacity)? {
            UpstreamNext::Batch(batch) => {
                assert!(
                    !batch.is_empty(),
                    "upstream iterator contract violated: returned an empty batch"
                );
                self.queue.extend(batch);
                Ok(PullOutcome::Progress)
            },
            UpstreamNext::Again => Ok(PullOutcome::Again),
            UpstreamNext::End => Ok(PullOutcome::Ended),
        }
    }

    /// Head of the queue. Panics if the queue is empty: callers must only
    /// peek a cursor they've just confirmed has queued messages.
    pub(crate) fn peek(&self) -> &Message {
        self.queue.front().expect("peek on a cursor with an empty queue")
    }

    /// Pops the head of the queue. Same precondition as `peek`.
    pub(crate) fn pop(&mut self) -> Message {
        self.queue.pop_front().expect("pop on a cursor with an empty queue")
    }

    pub(crate) fn can_seek_beginning(&self) -> bool {
        self.iter.can_seek_beginning()
    }

    /// Asks the upstream to seek to its beginning and, on success, drops
    /// every buffered message.
    pub(crate) fn seek_beginning(&mut self) -> Result<SeekOutcome, MuxerError> {
        match self.iter.seek_beginning()? {
            SeekOutcome::Done => {
                self.queue.clear();
                Ok(SeekOutcome::Done)
            },
            SeekOutcome::Again => Ok(SeekOutcome::Again),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StreamId;

    struct ScriptedUpstream {
        steps: VecDeque<UpstreamNext>,
        can_seek: bool,
    }

    impl UpstreamIterator for ScriptedUpstream {
        fn next(&mut self, _capacity: usize) -> Result<UpstreamNext, MuxerError> {
            Ok(self.steps.pop_front().unwrap_or(UpstreamNext::End))
        }

        fn can_seek_beginning(&self) -> bool {
            self.can_seek
        }

        fn seek_beginning(&mut self) -> Result<SeekOutcome, MuxerError> {
            Ok(SeekOutcome::Done)
        }
    }

    fn stream_end(id: u64) -> Message {
        Message::StreamEnd { stream: StreamId(id) }
    }

    #[test]
    fn pull_appends_batch_in_order() {
        let mut cursor = UpstreamCursor::new(Box::new(ScriptedUpstream {
            steps: VecDeque::from([UpstreamNext::Batch(vec![stream_end(1), stream_end(2)])]),
            can_seek: true,
        }));
        assert!(matches!(cursor.pull(8).unwrap(), PullOutcome::Progress));
        assert!(matches!(cursor.peek(), Message::StreamEnd { stream: StreamId(1) }));
        cursor.pop();
        assert!(matches!(cursor.peek(), Message::StreamEnd { stream: StreamId(2) }));
    }

    #[test]
    fn pull_again_leaves_queue_untouched() {
        let mut cursor = UpstreamCursor::new(Box::new(ScriptedUpstream {
            steps: VecDeque::from([UpstreamNext::Again]),
            can_seek: true,
        }));
        assert!(matches!(cursor.pull(8).unwrap(), PullOutcome::Again));
        assert!(!cursor.has_queued());
    }

    #[test]
    fn pull_end_reports_ended_without_touching_queue() {
        let mut cursor = UpstreamCursor::new(Box::new(ScriptedUpstream {
            steps: VecDeque::from([UpstreamNext::End]),
            can_seek: true,
        }));
        assert!(matches!(cursor.pull(8).unwrap(), PullOutcome::Ended));
        assert!(!cursor.has_queued());
    }

    #[test]
    fn seek_beginning_drops_queued_messages() {
        let mut cursor = UpstreamCursor::new(Box::new(ScriptedUpstream {
            steps: VecDeque::from([UpstreamNext::Batch(vec![stream_end(1)])]),
            can_seek: true,
        }));
        cursor.pull(8).unwrap();
        assert!(cursor.has_queued());
        cursor.seek_beginning().unwrap();
        assert!(!cursor.has_queued());
    }
}
