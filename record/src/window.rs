use crate::{RecordError, WINDOW_SIZE};

/// `Window` is the 64-slot sliding replay window keyed on record sequence
/// numbers. Bit 0 of the bitmap tracks `max_seq`, bit k the sequence k slots
/// behind it.
///
/// Checking and committing are split: [`Window::check`] is consulted before
/// the expensive GCM work, and [`Window::commit`] moves the window only after
/// the frame has authenticated.
pub(crate) struct Window {
    size: u64,
    max_seq: u64,
    bitmap: u64,
}

impl Window {
    pub(crate) fn new() -> Self {
        Window {
            size: WINDOW_SIZE,
            max_seq: 0,
            bitmap: 0,
        }
    }

    // check classifies seq without mutating the window.
    pub(crate) fn check(&self, seq: u64) -> Result<(), RecordError> {
        if seq > self.max_seq {
            return Ok(());
        }
        let offset = self.max_seq - seq;
        if offset >= self.size {
            return Err(RecordError::TooOld);
        }
        if (self.bitmap >> offset) & 1 == 1 {
            return Err(RecordError::Replay);
        }
        Ok(())
    }

    // commit records seq as seen, sliding the window forward when seq is
    // beyond max_seq.
    pub(crate) fn commit(&mut self, seq: u64) {
        if seq > self.max_seq {
            let shift = seq - self.max_seq;
            if shift >= self.size {
                self.bitmap = 0;
            } else {
                self.bitmap <<= shift;
            }
            self.bitmap |= 1;
            self.max_seq = seq;
            return;
        }
        let offset = self.max_seq - seq;
        if offset < self.size {
            self.bitmap |= 1 << offset;
        }
    }
}
