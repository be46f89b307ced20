//! Transmission: submit symbols to a ready channel, wait for completion.
//!
//! The copy encoder streams symbols out of a channel buffer while the
//! hardware runs, so that buffer belongs to the peripheral until its frame is
//! done. Frames use the channel's buffers in rotation and complete in FIFO
//! order: with fewer than `TRANS_QUEUE_DEPTH` frames unfinished, the next
//! buffer in line is free. When all of them are still queued the submission
//! is refused; nothing here waits for the hardware.
//!
//! Submission failures are returned as they are, never retried here.

use crate::channel::Channel;
use crate::config::TRANS_QUEUE_DEPTH;
use crate::error::{Feature, HwError, Result, RmtError};
use crate::hal::{RmtBackend, Timeout, TransmitConfig};
use crate::logging::{EventKind, LogLevel};
use crate::pulse::{self, PulseSequence};
use crate::symbol::Symbol;

impl<B: RmtBackend> Channel<B> {
    /// Encode `seq` and queue it for transmission.
    ///
    /// Returns once the frame is queued, without waiting for earlier frames.
    /// Malformed input is rejected before any hardware interaction.
    ///
    /// # Errors
    ///
    /// `EmptySequence`, `LengthMismatch`, `NotSupported(Loop)` after a
    /// `set_loop(true)`, `NotReady` after teardown, `HardwareBusyOrRejected`
    /// when the queue is full or the driver refuses the frame (the channel
    /// stays usable).
    pub fn write_pulses(&mut self, seq: &PulseSequence<'_>) -> Result {
        seq.validate()?;
        self.check_can_send()?;
        let slot = self.free_buffer()?;

        let len = pulse::encode(seq, &mut self.buffers[slot])?.len();
        self.submit(slot, len)
    }

    /// Queue prebuilt symbols. They are copied into a channel buffer.
    ///
    /// Same errors as [`write_pulses`](Self::write_pulses); an empty slice is
    /// `EmptySequence`.
    pub fn transmit(&mut self, symbols: &[Symbol]) -> Result {
        if symbols.is_empty() {
            return Err(RmtError::EmptySequence);
        }
        self.check_can_send()?;
        let slot = self.free_buffer()?;

        let buffer = &mut self.buffers[slot];
        buffer.ensure_capacity(symbols.len());
        buffer.as_mut_slice()[..symbols.len()].copy_from_slice(symbols);
        self.submit(slot, symbols.len())
    }

    /// Block until every queued transmission is done or `timeout_ms`
    /// elapses. `0` waits forever.
    ///
    /// Returns `Ok(true)` on completion, `Ok(false)` on timeout. Does not
    /// change channel state; may be called repeatedly and concurrently.
    pub fn wait_done(&self, timeout_ms: u32) -> Result<bool> {
        let handles = self.handles()?;
        let done = self
            .backend
            .wait_all_done(&handles.channel, Timeout::from_millis(timeout_ms));

        if !done {
            self.log(LogLevel::Debug, EventKind::WaitTimeout, timeout_ms);
        }
        Ok(done)
    }

    /// Frames queued and not yet finished. `0` after teardown.
    pub fn queued(&self) -> usize {
        match &self.handles {
            Some(handles) => {
                let done = self.backend.completed_count(&handles.channel);
                self.submitted.wrapping_sub(done) as usize
            }
            None => 0,
        }
    }

    fn check_can_send(&self) -> Result {
        if self.loop_enabled {
            return Err(RmtError::NotSupported(Feature::Loop));
        }
        self.handles().map(|_| ())
    }

    /// Index of the buffer the next frame may fill.
    fn free_buffer(&self) -> Result<usize> {
        if self.queued() >= TRANS_QUEUE_DEPTH {
            self.log(LogLevel::Warn, EventKind::QueueFull, TRANS_QUEUE_DEPTH as u32);
            return Err(RmtError::HardwareBusyOrRejected(HwError::INVALID_STATE));
        }
        Ok(self.next_buffer)
    }

    /// Queue the first `len` symbols of buffer `slot`.
    fn submit(&mut self, slot: usize, len: usize) -> Result {
        let handles = self.handles()?;
        let symbols = self.buffers[slot].prefix(len);
        let tx_cfg = TransmitConfig {
            eot_level: self.config.idle_level,
        };

        // SAFETY: `slot` comes back into rotation after TRANS_QUEUE_DEPTH
        // submissions and is only written with fewer than that many frames
        // unfinished, so (FIFO) this frame is done by then. Teardown disables
        // the channel before releasing the buffers.
        let result = unsafe {
            self.backend
                .transmit(&handles.channel, &handles.encoder, symbols, &tx_cfg)
        };

        match result {
            Ok(()) => {
                self.log(LogLevel::Debug, EventKind::Transmit, len as u32);
                self.submitted = self.submitted.wrapping_add(1);
                self.next_buffer = (slot + 1) % TRANS_QUEUE_DEPTH;
                Ok(())
            }
            Err(err) => {
                self.log(LogLevel::Error, EventKind::TransmitRejected, err.code() as u32);
                Err(RmtError::HardwareBusyOrRejected(err))
            }
        }
    }
}
