//! Hardware Abstraction Layer for the RMT TX path.
//!
//! Thin seam around the ESP-IDF 5.x RMT driver (`driver/rmt_tx.h`).
//! Channel lifecycle and encoding stay in core modules, the backend is just I/O.
//!
//! - [`esp_idf::EspRmt`]: real peripheral (`target_os = "espidf"` only)
//! - [`sim::SimRmt`]: simulated RMT group for host tests and the host demo

#[cfg(target_os = "espidf")]
pub mod esp_idf;
pub mod sim;

#[cfg(target_os = "espidf")]
pub use esp_idf::EspRmt;
pub use sim::SimRmt;

use crate::error::HwError;
use crate::symbol::Symbol;

/// Bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Forever,
    Millis(u32),
}

impl Timeout {
    /// `0` means wait forever.
    pub fn from_millis(ms: u32) -> Self {
        if ms == 0 {
            Timeout::Forever
        } else {
            Timeout::Millis(ms)
        }
    }
}

/// Parameters for `rmt_new_tx_channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxChannelConfig {
    pub gpio: i32,
    /// Ticks per second.
    pub resolution_hz: u32,
    pub mem_block_symbols: usize,
    pub trans_queue_depth: usize,
}

/// Per-transmission parameters. Loop count is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransmitConfig {
    /// Output level after the last symbol.
    pub eot_level: bool,
}

/// RMT TX driver operations.
///
/// Handles are owned values: deleting a handle consumes it, so a deleted
/// channel or encoder cannot be used again.
pub trait RmtBackend {
    type Channel;
    type Encoder;

    fn new_tx_channel(&self, config: &TxChannelConfig) -> Result<Self::Channel, HwError>;

    /// Encoder that forwards symbol words verbatim.
    fn new_copy_encoder(&self) -> Result<Self::Encoder, HwError>;

    fn enable(&self, channel: &Self::Channel) -> Result<(), HwError>;

    /// Stops the channel, aborting any queued transmissions.
    fn disable(&self, channel: &Self::Channel) -> Result<(), HwError>;

    fn del_encoder(&self, encoder: Self::Encoder) -> Result<(), HwError>;

    /// Channel must be disabled.
    fn del_channel(&self, channel: Self::Channel) -> Result<(), HwError>;

    /// Queue `symbols` for transmission. Returns once queued, not once sent.
    ///
    /// # Safety
    ///
    /// The peripheral keeps reading `symbols` after this returns. The memory
    /// must stay valid and unmodified until `completed_count` covers this
    /// transmission, `wait_all_done` reports `true`, or the channel is
    /// disabled.
    unsafe fn transmit(
        &self,
        channel: &Self::Channel,
        encoder: &Self::Encoder,
        symbols: &[Symbol],
        config: &TransmitConfig,
    ) -> Result<(), HwError>;

    /// Transmissions finished on `channel` since it was allocated, in
    /// submission order. Wraps. Never blocks.
    fn completed_count(&self, channel: &Self::Channel) -> u32;

    /// `true` once every queued transmission has finished, `false` on timeout
    /// or driver error.
    fn wait_all_done(&self, channel: &Self::Channel, timeout: Timeout) -> bool;

    /// Monotonic time in microseconds, used for event timestamps.
    fn now_us(&self) -> i64;
}
