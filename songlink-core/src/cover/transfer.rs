//! Chunked cover-art transfer
//!
//! ```text
//! Idle ──BEGIN──► Receiving ──END (complete)──► Committed
//!   ▲                 │      ──END (short)────► Discarded
//!   └──── BEGIN / clear ◄─────────────────────────┘
//! ```
//!
//! Pixels land in a back buffer. A complete transfer is published by flipping
//! which buffer is the front, so readers never see a half-written cover. An
//! incomplete one leaves the previous cover in place but marks it invalid.
//! There is no checksum: a corrupted chunk yields wrong pixels, not an error.

use songlink_protocol::pixel::{quartets, COVER_PIXELS};

/// Transfer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoverPhase {
    Idle,
    Receiving,
    Committed,
    Discarded,
}

/// Resolution of an `END`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoverOutcome {
    /// All pixels arrived; the cover is now the front buffer
    Committed { count: usize },
    /// Pixels missing; the front buffer is unchanged
    Discarded { count: usize, expected: usize },
}

impl CoverOutcome {
    /// Pixels received before `END`
    pub fn count(&self) -> usize {
        match *self {
            CoverOutcome::Committed { count } | CoverOutcome::Discarded { count, .. } => count,
        }
    }
}

/// Cover receiver with front/back pixel buffers
pub struct CoverTransfer {
    buffers: [[u16; COVER_PIXELS]; 2],
    front: usize,
    phase: CoverPhase,
    index: usize,
    total: usize,
    valid: bool,
}

impl Default for CoverTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverTransfer {
    /// Create an empty receiver
    pub const fn new() -> Self {
        Self {
            buffers: [[0; COVER_PIXELS]; 2],
            front: 0,
            phase: CoverPhase::Idle,
            index: 0,
            total: 0,
            valid: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> CoverPhase {
        self.phase
    }

    /// True when the front buffer holds a complete cover
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Pixels stored so far in the running transfer
    pub fn received(&self) -> usize {
        self.index
    }

    /// Pixels expected by the running transfer
    pub fn expected(&self) -> usize {
        self.total
    }

    /// The published cover, row-major, panel byte order
    pub fn front(&self) -> &[u16; COVER_PIXELS] {
        &self.buffers[self.front]
    }

    /// `NP COV BEGIN w h`
    ///
    /// Expects `w * h` pixels when that is positive and below the buffer
    /// size, the full buffer otherwise.
    pub fn begin(&mut self, width: u16, height: u16) {
        let requested = usize::from(width) * usize::from(height);
        self.total = if requested > 0 && requested < COVER_PIXELS {
            requested
        } else {
            COVER_PIXELS
        };
        self.index = 0;
        self.buffers[1 - self.front] = [0; COVER_PIXELS];
        self.phase = CoverPhase::Receiving;
    }

    /// `NP COV DATA <hex>`
    ///
    /// Stores one pixel per valid hex quartet, byte-swapped for the panel.
    /// Invalid quartets are skipped; input past the expected count is
    /// ignored. Returns the number of pixels stored. Ignored outside a
    /// transfer.
    pub fn data(&mut self, hex: &str) -> usize {
        if self.phase != CoverPhase::Receiving {
            return 0;
        }

        let back = 1 - self.front;
        let start = self.index;
        for value in quartets(hex).flatten() {
            if self.index >= self.total {
                break;
            }
            self.buffers[back][self.index] = value.swap_bytes();
            self.index += 1;
        }
        self.index - start
    }

    /// `NP COV END`
    ///
    /// Returns `None` when no transfer is running.
    pub fn end(&mut self) -> Option<CoverOutcome> {
        if self.phase != CoverPhase::Receiving {
            return None;
        }

        if self.index >= self.total {
            self.front = 1 - self.front;
            self.valid = true;
            self.phase = CoverPhase::Committed;
            Some(CoverOutcome::Committed { count: self.index })
        } else {
            self.valid = false;
            self.phase = CoverPhase::Discarded;
            Some(CoverOutcome::Discarded {
                count: self.index,
                expected: self.total,
            })
        }
    }

    /// Drop the cover and any running transfer
    pub fn clear(&mut self) {
        self.buffers = [[0; COVER_PIXELS]; 2];
        self.phase = CoverPhase::Idle;
        self.index = 0;
        self.total = 0;
        self.valid = false;
    }
}
