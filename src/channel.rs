//! RMT TX channel lifecycle.
//!
//! ```text
//! create() ──▶ Ready (enabled) ──▶ teardown() / drop ──▶ Torn down
//!                 │    ▲
//!                 └────┘ write_pulses / transmit / wait_done
//! ```
//!
//! A ready channel holds exactly one hardware channel and exactly one copy
//! encoder bound to it. Creation either acquires both and enables the
//! channel, or releases whatever it got and fails. Teardown is idempotent
//! and also runs on drop.
//!
//! Transmission lives in [`crate::tx`].
//!
//! Each queue slot of the hardware channel has its own symbol buffer. Frames
//! take the buffers in rotation, so a buffer is written again only after the
//! `TRANS_QUEUE_DEPTH - 1` frames queued behind it.

use crate::config::{ChannelConfig, MEM_BLOCK_SYMBOLS, SOURCE_CLOCK_HZ, TRANS_QUEUE_DEPTH};
use crate::error::{Feature, HwError, Result, RmtError};
use crate::hal::{RmtBackend, TxChannelConfig};
use crate::log_globals::RMT_EVENTS;
use crate::logging::{Event, EventKind, LogLevel};
use crate::symbol::SymbolBuffer;

/// Hardware channel plus the encoder bound to it.
pub(crate) struct Handles<B: RmtBackend> {
    pub(crate) channel: B::Channel,
    pub(crate) encoder: B::Encoder,
}

/// One RMT TX channel driving one pin.
///
/// Not meant for concurrent `write_pulses` from several contexts: serialise
/// access (it takes `&mut self`). `wait_done` takes `&self` and may be called
/// from several contexts at once.
pub struct Channel<B: RmtBackend> {
    pub(crate) backend: B,
    pub(crate) config: ChannelConfig,
    pub(crate) resolution_hz: u32,
    pub(crate) handles: Option<Handles<B>>,
    /// One buffer per queue slot.
    pub(crate) buffers: [SymbolBuffer; TRANS_QUEUE_DEPTH],
    /// Buffer the next frame goes into.
    pub(crate) next_buffer: usize,
    /// Frames accepted by the driver (wrapping, compared with
    /// `completed_count`).
    pub(crate) submitted: u32,
    pub(crate) loop_enabled: bool,
}

impl<B: RmtBackend> Channel<B> {
    /// Allocate a TX channel and copy encoder on `config.pin`, then enable it.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig`: divider outside 1..=255 or negative pin
    /// - `NotSupported(Carrier)`: carrier requested
    /// - `HardwareAllocation`: channel, encoder or enable failed; anything
    ///   already acquired has been released
    pub fn create(backend: B, config: ChannelConfig) -> Result<Self> {
        if let Err(err) = config.validate() {
            if err == RmtError::NotSupported(Feature::Carrier) {
                log_event(&backend, config.channel_id, LogLevel::Warn, EventKind::CarrierRejected, 0);
            }
            return Err(err);
        }

        let resolution_hz = config.resolution_hz();
        let tx_cfg = TxChannelConfig {
            gpio: config.pin,
            resolution_hz,
            mem_block_symbols: MEM_BLOCK_SYMBOLS,
            trans_queue_depth: TRANS_QUEUE_DEPTH,
        };

        let handles = acquire(&backend, &tx_cfg).map_err(|err| {
            log_event(&backend, config.channel_id, LogLevel::Error, EventKind::AllocFailed, err.code() as u32);
            RmtError::HardwareAllocation(err)
        })?;

        log_event(&backend, config.channel_id, LogLevel::Info, EventKind::Created, resolution_hz);

        Ok(Self {
            backend,
            config,
            resolution_hz,
            handles: Some(handles),
            buffers: core::array::from_fn(|_| SymbolBuffer::new()),
            next_buffer: 0,
            submitted: 0,
            loop_enabled: false,
        })
    }

    /// Disable the channel (aborting anything in flight), then release the
    /// encoder, the channel and the symbol buffers.
    ///
    /// Safe to call repeatedly; later calls do nothing. Driver errors on this
    /// path are ignored.
    pub fn teardown(&mut self) {
        let Some(Handles { channel, encoder }) = self.handles.take() else {
            return;
        };

        let was_enabled = self.backend.disable(&channel).is_ok();
        let _ = self.backend.del_encoder(encoder);
        let _ = self.backend.del_channel(channel);

        for buffer in &mut self.buffers {
            buffer.release();
        }
        self.next_buffer = 0;
        self.submitted = 0;
        self.loop_enabled = false;

        self.log(LogLevel::Info, EventKind::TornDown, was_enabled as u32);
    }

    /// Request hardware looping. Only `false` is accepted.
    ///
    /// A `true` request is remembered so that every following
    /// `write_pulses` fails with `NotSupported(Loop)` until looping is
    /// switched off again.
    pub fn set_loop(&mut self, enabled: bool) -> Result {
        self.loop_enabled = enabled;
        if enabled {
            self.log(LogLevel::Warn, EventKind::LoopRejected, 0);
            return Err(RmtError::NotSupported(Feature::Loop));
        }
        Ok(())
    }

    /// Rate of the clock feeding the divider, in Hz.
    #[inline]
    pub const fn source_frequency() -> u32 {
        SOURCE_CLOCK_HZ
    }

    #[inline]
    pub fn clock_divisor(&self) -> u8 {
        self.config.clock_div as u8
    }

    /// Ticks per second.
    #[inline]
    pub fn resolution_hz(&self) -> u32 {
        self.resolution_hz
    }

    #[inline]
    pub fn pin(&self) -> i32 {
        self.config.pin
    }

    /// Legacy channel label (display only).
    #[inline]
    pub fn channel_id(&self) -> i8 {
        self.config.channel_id
    }

    #[inline]
    pub fn idle_level(&self) -> bool {
        self.config.idle_level
    }

    #[inline]
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// `true` until torn down.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.handles.is_some()
    }

    /// Symbols allocated across all buffers.
    pub fn symbol_capacity(&self) -> usize {
        self.buffers.iter().map(SymbolBuffer::capacity).sum()
    }

    pub(crate) fn handles(&self) -> Result<&Handles<B>> {
        self.handles.as_ref().ok_or(RmtError::NotReady)
    }

    pub(crate) fn log(&self, level: LogLevel, kind: EventKind, arg: u32) {
        log_event(&self.backend, self.config.channel_id, level, kind, arg);
    }
}

impl<B: RmtBackend> Drop for Channel<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<B: RmtBackend> core::fmt::Display for Channel<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_ready() {
            write!(
                f,
                "RMT(channel={}, pin={}, source_freq={}, clock_div={}, resolution_hz={})",
                self.channel_id(),
                self.pin(),
                Self::source_frequency(),
                self.clock_divisor(),
                self.resolution_hz
            )
        } else {
            f.write_str("RMT()")
        }
    }
}

/// Channel, then encoder, then enable. Unwinds on failure.
fn acquire<B: RmtBackend>(backend: &B, tx_cfg: &TxChannelConfig) -> core::result::Result<Handles<B>, HwError> {
    let channel = backend.new_tx_channel(tx_cfg)?;

    let encoder = match backend.new_copy_encoder() {
        Ok(encoder) => encoder,
        Err(err) => {
            let _ = backend.del_channel(channel);
            return Err(err);
        }
    };

    if let Err(err) = backend.enable(&channel) {
        let _ = backend.del_encoder(encoder);
        let _ = backend.del_channel(channel);
        return Err(err);
    }

    Ok(Handles { channel, encoder })
}

fn log_event<B: RmtBackend>(backend: &B, channel_id: i8, level: LogLevel, kind: EventKind, arg: u32) {
    RMT_EVENTS.push(Event {
        timestamp_us: backend.now_us(),
        level,
        channel_id,
        kind,
        arg,
    });
}
