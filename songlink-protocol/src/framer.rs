//! Byte stream to line reassembly.
//!
//! Line format:
//! - CONTENT (1..N bytes): ASCII text, no `\n`
//! - TERMINATOR: `\n`, optionally preceded by `\r`
//!
//! Each transport owns a private [`LineFramer`]. Content accumulates across
//! calls until a terminator arrives. Empty lines are never emitted. A line
//! that does not fit the buffer is discarded whole: the framer drops bytes
//! until the next terminator and then reports [`FrameEvent::Truncated`].

use heapless::Vec;

/// Inbound buffer capacity of the wired serial transport
pub const WIRED_RX_CAPACITY: usize = 1024;

/// Inbound buffer capacity of each BLE write characteristic
pub const BLE_RX_CAPACITY: usize = 4096;

/// Line terminator byte
pub const LINE_TERMINATOR: u8 = b'\n';

const CARRIAGE_RETURN: u8 = b'\r';

/// Outcome of a completed (or discarded) line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameEvent<'a> {
    /// A complete line, terminator stripped
    Line(&'a str),
    /// An oversized line was discarded at its terminator
    Truncated {
        /// Number of content bytes thrown away
        dropped: usize,
    },
    /// A complete line that was not valid UTF-8 and was discarded
    InvalidUtf8,
}

/// Completion recorded by [`LineFramer::step`] before the buffer is borrowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Line,
    Truncated { dropped: usize },
}

/// Reassembles newline-terminated lines from a byte stream
#[derive(Debug, Clone)]
pub struct LineFramer<const N: usize> {
    buffer: Vec<u8, N>,
    /// `\r` bytes held back until the next non-`\r` byte
    pending_cr: usize,
    /// Overflowed; dropping bytes until the next terminator
    discarding: bool,
    dropped: usize,
    /// The buffer holds a line that was handed out and must be cleared
    emitted: bool,
}

impl<const N: usize> Default for LineFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineFramer<N> {
    /// Create an empty framer
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            pending_cr: 0,
            discarding: false,
            dropped: 0,
            emitted: false,
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending_cr = 0;
        self.discarding = false;
        self.dropped = 0;
        self.emitted = false;
    }

    /// Bytes of the current partial line
    pub fn buffered(&self) -> usize {
        if self.emitted {
            0
        } else {
            self.buffer.len()
        }
    }

    /// True while an oversized line is being skipped
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Feed a single byte
    ///
    /// Returns `Some(event)` when the byte terminates a line, `None` when more
    /// bytes are needed.
    pub fn push(&mut self, byte: u8) -> Option<FrameEvent<'_>> {
        let completion = self.step(byte)?;
        Some(self.event(completion))
    }

    /// Feed a chunk of bytes
    ///
    /// The returned cursor yields the lines completed by this chunk, in order.
    /// Bytes after the last terminator stay buffered for the next call.
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> Lines<'a, N> {
        Lines {
            framer: self,
            bytes,
            pos: 0,
        }
    }

    /// Feed a chunk of bytes and hand every event to `f`
    pub fn feed_with<F>(&mut self, bytes: &[u8], mut f: F)
    where
        F: FnMut(FrameEvent<'_>),
    {
        let mut lines = self.feed(bytes);
        while let Some(event) = lines.next_event() {
            f(event);
        }
    }

    fn step(&mut self, byte: u8) -> Option<Completion> {
        if self.emitted {
            self.buffer.clear();
            self.emitted = false;
        }

        match byte {
            LINE_TERMINATOR => {
                self.pending_cr = 0;
                if self.discarding {
                    let dropped = self.dropped;
                    self.discarding = false;
                    self.dropped = 0;
                    self.buffer.clear();
                    return Some(Completion::Truncated { dropped });
                }
                if self.buffer.is_empty() {
                    return None;
                }
                self.emitted = true;
                Some(Completion::Line)
            }
            CARRIAGE_RETURN => {
                // Stripped if the terminator follows
                self.pending_cr += 1;
                None
            }
            _ => {
                let held = core::mem::take(&mut self.pending_cr);
                // `\r` at line start belongs to the previous terminator
                if !self.buffer.is_empty() || self.discarding {
                    for _ in 0..held {
                        self.store(CARRIAGE_RETURN);
                    }
                }
                self.store(byte);
                None
            }
        }
    }

    fn store(&mut self, byte: u8) {
        if self.discarding {
            self.dropped += 1;
            return;
        }
        if self.buffer.push(byte).is_err() {
            self.discarding = true;
            self.dropped = self.buffer.len() + 1;
            self.buffer.clear();
        }
    }

    fn event(&self, completion: Completion) -> FrameEvent<'_> {
        match completion {
            Completion::Line => match core::str::from_utf8(&self.buffer) {
                Ok(line) => FrameEvent::Line(line),
                Err(_) => FrameEvent::InvalidUtf8,
            },
            Completion::Truncated { dropped } => FrameEvent::Truncated { dropped },
        }
    }
}

/// Cursor over the events produced by one [`LineFramer::feed`] call
///
/// Each yielded line borrows the framer buffer, so the cursor hands out one
/// event at a time instead of implementing `Iterator`.
pub struct Lines<'a, const N: usize> {
    framer: &'a mut LineFramer<N>,
    bytes: &'a [u8],
    pos: usize,
}

impl<const N: usize> Lines<'_, N> {
    /// Advance to the next completed line or discard
    pub fn next_event(&mut self) -> Option<FrameEvent<'_>> {
        let mut completion = None;
        while self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            self.pos += 1;
            if let Some(done) = self.framer.step(byte) {
                completion = Some(done);
                break;
            }
        }
        completion.map(|done| self.framer.event(done))
    }

    /// Bytes of this chunk not yet consumed
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
