//! Outbound line queue
//!
//! Holds lines waiting for the BLE notification path to open. The queue is
//! bounded and never rejects a push: when full, the oldest line is evicted to
//! make room, so the newest state always gets through.

use heapless::{Deque, String};
use songlink_protocol::MAX_LINE_LEN;

use crate::text::truncate;

/// Default number of queued lines
pub const QUEUE_CAPACITY: usize = 12;

/// Extra flush iterations beyond the capacity
const FLUSH_SLACK: usize = 4;

/// A queued line, at most `MAX_LINE_LEN - 1` bytes plus room for `\n`
pub type QueuedLine = String<MAX_LINE_LEN>;

/// Result of [`OutboundQueue::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushOutcome {
    /// Line appended
    Queued,
    /// Line appended after evicting the oldest entry
    Evicted,
    /// Empty line, nothing queued
    Ignored,
}

/// Result of [`OutboundQueue::flush`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlushOutcome {
    /// Lines handed to the sender successfully
    pub sent: usize,
    /// The sender refused a line; it was re-queued at the tail
    pub stalled: bool,
}

/// Bounded FIFO with drop-oldest overflow
#[derive(Debug)]
pub struct OutboundQueue<const C: usize = QUEUE_CAPACITY> {
    lines: Deque<QueuedLine, C>,
}

impl<const C: usize> Default for OutboundQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize> OutboundQueue<C> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            lines: Deque::new(),
        }
    }

    /// Append a line, evicting the oldest one if the queue is full
    ///
    /// Lines longer than `MAX_LINE_LEN - 1` bytes are truncated.
    pub fn push(&mut self, line: &str) -> PushOutcome {
        if line.is_empty() {
            return PushOutcome::Ignored;
        }

        let mut entry = QueuedLine::new();
        // Cannot fail: truncated below capacity
        let _ = entry.push_str(truncate(line, MAX_LINE_LEN - 1));

        let outcome = if self.lines.is_full() {
            self.lines.pop_front();
            PushOutcome::Evicted
        } else {
            PushOutcome::Queued
        };

        // Room was made above
        let _ = self.lines.push_back(entry);
        outcome
    }

    /// Remove the oldest line
    pub fn pop(&mut self) -> Option<QueuedLine> {
        self.lines.pop_front()
    }

    /// Hand queued lines to `send` in FIFO order
    ///
    /// Runs at most `C + 4` iterations. When `send` returns `false` the line
    /// is pushed back at the tail (behind lines still waiting) and the flush
    /// stops until the next call.
    pub fn flush<F>(&mut self, mut send: F) -> FlushOutcome
    where
        F: FnMut(&str) -> bool,
    {
        let mut outcome = FlushOutcome {
            sent: 0,
            stalled: false,
        };

        for _ in 0..C + FLUSH_SLACK {
            let Some(line) = self.lines.pop_front() else {
                break;
            };
            if send(&line) {
                outcome.sent += 1;
            } else {
                // Just popped, so there is room
                let _ = self.lines.push_back(line);
                outcome.stalled = true;
                break;
            }
        }

        outcome
    }

    /// Drop every queued line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of queued lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of queued lines
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Iterate queued lines, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;
    use std::string::String as StdString;
    use std::vec::Vec as StdVec;

    fn contents<const C: usize>(queue: &OutboundQueue<C>) -> StdVec<StdString> {
        queue.iter().map(StdString::from).collect()
    }

    #[test]
    fn test_push_thirteen_keeps_newest_twelve() {
        let mut queue = OutboundQueue::<QUEUE_CAPACITY>::new();
        for i in 1..=12 {
            assert_eq!(queue.push(&format!("L{}", i)), PushOutcome::Queued);
        }
        assert_eq!(queue.push("L13"), PushOutcome::Evicted);

        assert_eq!(queue.len(), 12);
        let expected: StdVec<StdString> = (2..=13).map(|i| format!("L{}", i)).collect();
        assert_eq!(contents(&queue), expected);
    }

    #[test]
    fn test_empty_line_ignored() {
        let mut queue = OutboundQueue::<4>::new();
        assert_eq!(queue.push(""), PushOutcome::Ignored);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_long_line_truncated() {
        let mut queue = OutboundQueue::<4>::new();
        let long: StdString = core::iter::repeat('x').take(400).collect();
        queue.push(&long);
        let line = queue.pop().unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN - 1);
    }

    #[test]
    fn test_flush_sends_in_order() {
        let mut queue = OutboundQueue::<4>::new();
        queue.push("A");
        queue.push("B");
        queue.push("C");

        let mut sent = StdVec::new();
        let outcome = queue.flush(|line| {
            sent.push(StdString::from(line));
            true
        });

        assert_eq!(outcome, FlushOutcome { sent: 3, stalled: false });
        assert_eq!(sent, ["A", "B", "C"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_flush_failure_requeues_at_tail() {
        let mut queue = OutboundQueue::<4>::new();
        queue.push("A");
        queue.push("B");
        queue.push("C");

        let mut calls = 0;
        let outcome = queue.flush(|_| {
            calls += 1;
            calls < 2
        });

        assert_eq!(outcome, FlushOutcome { sent: 1, stalled: true });
        assert_eq!(contents(&queue), ["C", "B"]);
    }

    #[test]
    fn test_flush_bounded_when_sender_always_fails() {
        let mut queue = OutboundQueue::<4>::new();
        queue.push("A");
        let mut calls = 0;
        let outcome = queue.flush(|_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
        assert!(outcome.stalled);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = OutboundQueue::<4>::new();
        queue.push("A");
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 4);
    }

    proptest::proptest! {
        #[test]
        fn test_never_exceeds_capacity(lines in proptest::collection::vec("[a-z]{1,8}", 0..40)) {
            let mut queue = OutboundQueue::<QUEUE_CAPACITY>::new();
            for line in &lines {
                queue.push(line);
                proptest::prop_assert!(queue.len() <= QUEUE_CAPACITY);
            }
            let keep = lines.len().saturating_sub(QUEUE_CAPACITY);
            proptest::prop_assert_eq!(contents(&queue), lines[keep..].to_vec());
        }
    }
}
