//! Simulated RMT group.
//!
//! Behaves like the ESP-IDF TX driver closely enough to exercise the channel
//! lifecycle on the host:
//! - a fixed number of TX channels, allocation beyond that fails
//! - per-channel FIFO queue bounded by `trans_queue_depth`
//! - transmit needs an enabled channel, delete needs a disabled one
//! - disable aborts whatever is still queued
//!
//! Time is simulated. `wait_all_done` advances a µs clock by the air time of
//! the frames it completes (ticks / resolution), up to the timeout. With
//! `Timeout::Forever` every queued frame completes.
//!
//! Clones share the same peripheral, so a test can keep one handle for
//! inspection while a channel owns another.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::TX_CHANNELS;
use crate::error::HwError;
use crate::hal::{RmtBackend, Timeout, TransmitConfig, TxChannelConfig};
use crate::symbol::Symbol;

/// Handle to an allocated simulated channel.
#[derive(Debug, PartialEq, Eq)]
pub struct SimChannel {
    slot: usize,
}

impl SimChannel {
    /// Hardware slot index.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Handle to a simulated copy encoder.
#[derive(Debug, PartialEq, Eq)]
pub struct SimEncoder {
    id: u32,
}

/// One transmission as the peripheral saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimFrame {
    pub slot: usize,
    pub symbols: Vec<Symbol>,
    pub eot_level: bool,
}

impl SimFrame {
    /// Total length in ticks.
    pub fn ticks(&self) -> u64 {
        self.symbols.iter().map(|s| s.ticks() as u64).sum()
    }

    fn air_time_us(&self, resolution_hz: u32) -> u64 {
        let ticks = self.ticks() * 1_000_000;
        let res = resolution_hz.max(1) as u64;
        ticks.div_ceil(res)
    }
}

struct SimChannelState {
    config: TxChannelConfig,
    enabled: bool,
    queue: VecDeque<SimFrame>,
    /// Air time already spent on the frame at the head of the queue.
    head_elapsed_us: u64,
    /// Frames finished on this channel.
    done: u32,
}

struct SimState {
    clock_us: u64,
    slots: Vec<Option<SimChannelState>>,
    encoders: usize,
    next_encoder_id: u32,
    submitted: Vec<SimFrame>,
    completed: Vec<SimFrame>,
    aborted: usize,
    fail_channel_alloc: Option<HwError>,
    fail_encoder_alloc: Option<HwError>,
    fail_enable: Option<HwError>,
    reject_transmit: Option<HwError>,
}

impl SimState {
    fn channel_mut(&mut self, slot: usize) -> Result<&mut SimChannelState, HwError> {
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(HwError::INVALID_ARG)
    }
}

/// Simulated RMT peripheral.
#[derive(Clone)]
pub struct SimRmt {
    state: Arc<Mutex<RefCell<SimState>>>,
}

impl Default for SimRmt {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRmt {
    /// Peripheral with the target's number of TX channels.
    pub fn new() -> Self {
        Self::with_tx_channels(TX_CHANNELS)
    }

    pub fn with_tx_channels(channels: usize) -> Self {
        let mut slots = Vec::with_capacity(channels);
        slots.resize_with(channels, || None);

        Self {
            state: Arc::new(Mutex::new(RefCell::new(SimState {
                clock_us: 0,
                slots,
                encoders: 0,
                next_encoder_id: 0,
                submitted: Vec::new(),
                completed: Vec::new(),
                aborted: 0,
                fail_channel_alloc: None,
                fail_encoder_alloc: None,
                fail_enable: None,
                reject_transmit: None,
            }))),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    // --- Fault injection ---

    /// Next `new_tx_channel` fails with `err`.
    pub fn fail_next_channel_alloc(&self, err: HwError) {
        self.with(|st| st.fail_channel_alloc = Some(err));
    }

    /// Next `new_copy_encoder` fails with `err`.
    pub fn fail_next_encoder_alloc(&self, err: HwError) {
        self.with(|st| st.fail_encoder_alloc = Some(err));
    }

    /// Next `enable` fails with `err`.
    pub fn fail_next_enable(&self, err: HwError) {
        self.with(|st| st.fail_enable = Some(err));
    }

    /// Next `transmit` is refused with `err`.
    pub fn reject_next_transmit(&self, err: HwError) {
        self.with(|st| st.reject_transmit = Some(err));
    }

    // --- Inspection ---

    /// Allocated TX channels.
    pub fn live_channels(&self) -> usize {
        self.with(|st| st.slots.iter().filter(|s| s.is_some()).count())
    }

    /// Allocated encoders.
    pub fn live_encoders(&self) -> usize {
        self.with(|st| st.encoders)
    }

    pub fn is_enabled(&self, slot: usize) -> bool {
        self.with(|st| {
            st.slots
                .get(slot)
                .and_then(Option::as_ref)
                .is_some_and(|ch| ch.enabled)
        })
    }

    /// Frames queued on `slot` and not yet completed.
    pub fn pending(&self, slot: usize) -> usize {
        self.with(|st| {
            st.slots
                .get(slot)
                .and_then(Option::as_ref)
                .map_or(0, |ch| ch.queue.len())
        })
    }

    pub fn channel_config(&self, slot: usize) -> Option<TxChannelConfig> {
        self.with(|st| st.slots.get(slot).and_then(Option::as_ref).map(|ch| ch.config))
    }

    /// Every accepted frame, in submission order.
    pub fn submitted(&self) -> Vec<SimFrame> {
        self.with(|st| st.submitted.clone())
    }

    /// Every finished frame, in completion order.
    pub fn completed(&self) -> Vec<SimFrame> {
        self.with(|st| st.completed.clone())
    }

    /// Frames dropped by `disable`.
    pub fn aborted(&self) -> usize {
        self.with(|st| st.aborted)
    }

    /// Simulated time.
    pub fn clock_us(&self) -> u64 {
        self.with(|st| st.clock_us)
    }
}

impl RmtBackend for SimRmt {
    type Channel = SimChannel;
    type Encoder = SimEncoder;

    fn new_tx_channel(&self, config: &TxChannelConfig) -> Result<SimChannel, HwError> {
        self.with(|st| {
            if let Some(err) = st.fail_channel_alloc.take() {
                return Err(err);
            }
            if config.resolution_hz == 0
                || config.mem_block_symbols == 0
                || config.trans_queue_depth == 0
            {
                return Err(HwError::INVALID_ARG);
            }

            let slot = st
                .slots
                .iter()
                .position(Option::is_none)
                .ok_or(HwError::NOT_FOUND)?;

            st.slots[slot] = Some(SimChannelState {
                config: *config,
                enabled: false,
                queue: VecDeque::with_capacity(config.trans_queue_depth),
                head_elapsed_us: 0,
                done: 0,
            });
            Ok(SimChannel { slot })
        })
    }

    fn new_copy_encoder(&self) -> Result<SimEncoder, HwError> {
        self.with(|st| {
            if let Some(err) = st.fail_encoder_alloc.take() {
                return Err(err);
            }
            st.encoders += 1;
            st.next_encoder_id += 1;
            Ok(SimEncoder {
                id: st.next_encoder_id,
            })
        })
    }

    fn enable(&self, channel: &SimChannel) -> Result<(), HwError> {
        self.with(|st| {
            if let Some(err) = st.fail_enable.take() {
                return Err(err);
            }
            let ch = st.channel_mut(channel.slot)?;
            if ch.enabled {
                return Err(HwError::INVALID_STATE);
            }
            ch.enabled = true;
            Ok(())
        })
    }

    fn disable(&self, channel: &SimChannel) -> Result<(), HwError> {
        self.with(|st| {
            let ch = st.channel_mut(channel.slot)?;
            if !ch.enabled {
                return Err(HwError::INVALID_STATE);
            }
            ch.enabled = false;
            ch.head_elapsed_us = 0;
            let dropped = ch.queue.len();
            ch.queue.clear();
            st.aborted += dropped;
            Ok(())
        })
    }

    fn del_encoder(&self, encoder: SimEncoder) -> Result<(), HwError> {
        self.with(|st| {
            if st.encoders == 0 || encoder.id == 0 {
                return Err(HwError::INVALID_ARG);
            }
            st.encoders -= 1;
            Ok(())
        })
    }

    fn del_channel(&self, channel: SimChannel) -> Result<(), HwError> {
        self.with(|st| {
            if st.channel_mut(channel.slot)?.enabled {
                return Err(HwError::INVALID_STATE);
            }
            st.slots[channel.slot] = None;
            Ok(())
        })
    }

    unsafe fn transmit(
        &self,
        channel: &SimChannel,
        _encoder: &SimEncoder,
        symbols: &[Symbol],
        config: &TransmitConfig,
    ) -> Result<(), HwError> {
        self.with(|st| {
            if let Some(err) = st.reject_transmit.take() {
                return Err(err);
            }
            let ch = st.channel_mut(channel.slot)?;
            if !ch.enabled || ch.queue.len() >= ch.config.trans_queue_depth {
                return Err(HwError::INVALID_STATE);
            }

            let frame = SimFrame {
                slot: channel.slot,
                symbols: symbols.to_vec(),
                eot_level: config.eot_level,
            };
            ch.queue.push_back(frame.clone());
            st.submitted.push(frame);
            Ok(())
        })
    }

    fn completed_count(&self, channel: &SimChannel) -> u32 {
        self.with(|st| {
            st.slots
                .get(channel.slot)
                .and_then(Option::as_ref)
                .map_or(0, |ch| ch.done)
        })
    }

    fn wait_all_done(&self, channel: &SimChannel, timeout: Timeout) -> bool {
        self.with(|st| {
            let SimState {
                slots,
                completed,
                clock_us,
                ..
            } = st;

            let Some(ch) = slots.get_mut(channel.slot).and_then(Option::as_mut) else {
                return false;
            };

            let budget_us = match timeout {
                Timeout::Forever => None,
                Timeout::Millis(ms) => Some(ms as u64 * 1000),
            };
            let resolution = ch.config.resolution_hz;
            let mut spent = 0u64;

            while let Some(head) = ch.queue.front() {
                let remaining = head.air_time_us(resolution).saturating_sub(ch.head_elapsed_us);

                if let Some(budget) = budget_us {
                    if spent + remaining > budget {
                        ch.head_elapsed_us += budget - spent;
                        spent = budget;
                        break;
                    }
                }

                spent += remaining;
                ch.head_elapsed_us = 0;
                if let Some(frame) = ch.queue.pop_front() {
                    ch.done = ch.done.wrapping_add(1);
                    completed.push(frame);
                }
            }

            *clock_us += spent;
            ch.queue.is_empty()
        })
    }

    fn now_us(&self) -> i64 {
        self.clock_us() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(resolution_hz: u32) -> TxChannelConfig {
        TxChannelConfig {
            gpio: 4,
            resolution_hz,
            mem_block_symbols: 64,
            trans_queue_depth: 4,
        }
    }

    #[test]
    fn test_channel_slots_exhaust() {
        let sim = SimRmt::with_tx_channels(2);
        let a = sim.new_tx_channel(&config(1_000_000)).unwrap();
        let _b = sim.new_tx_channel(&config(1_000_000)).unwrap();
        assert_eq!(sim.new_tx_channel(&config(1_000_000)), Err(HwError::NOT_FOUND));

        sim.del_channel(a).unwrap();
        assert!(sim.new_tx_channel(&config(1_000_000)).is_ok());
    }

    #[test]
    fn test_air_time_advances_clock() {
        let sim = SimRmt::new();
        let ch = sim.new_tx_channel(&config(1_000_000)).unwrap(); // 1 µs ticks
        let enc = sim.new_copy_encoder().unwrap();
        sim.enable(&ch).unwrap();

        let symbols = [Symbol::new(true, 300, false, 200)];
        unsafe { sim.transmit(&ch, &enc, &symbols, &TransmitConfig::default()) }.unwrap();

        assert!(sim.wait_all_done(&ch, Timeout::Forever));
        assert_eq!(sim.clock_us(), 500);
        assert_eq!(sim.completed().len(), 1);
    }

    #[test]
    fn test_partial_wait_resumes() {
        let sim = SimRmt::new();
        let ch = sim.new_tx_channel(&config(1_000)).unwrap(); // 1 ms ticks
        let enc = sim.new_copy_encoder().unwrap();
        sim.enable(&ch).unwrap();

        let symbols = [Symbol::new(true, 3, false, 2)]; // 5 ms
        unsafe { sim.transmit(&ch, &enc, &symbols, &TransmitConfig::default()) }.unwrap();

        assert!(!sim.wait_all_done(&ch, Timeout::Millis(3)));
        assert_eq!(sim.clock_us(), 3000);
        assert_eq!(sim.pending(ch.slot()), 1);

        assert!(sim.wait_all_done(&ch, Timeout::Millis(3)));
        assert_eq!(sim.clock_us(), 5000);
        assert_eq!(sim.pending(ch.slot()), 0);
    }

    #[test]
    fn test_completed_count_follows_waits() {
        let sim = SimRmt::new();
        let ch = sim.new_tx_channel(&config(1_000)).unwrap(); // 1 ms ticks
        let enc = sim.new_copy_encoder().unwrap();
        sim.enable(&ch).unwrap();

        let symbols = [Symbol::new(true, 1, false, 1)]; // 2 ms
        for _ in 0..3 {
            unsafe { sim.transmit(&ch, &enc, &symbols, &TransmitConfig::default()) }.unwrap();
        }
        assert_eq!(sim.completed_count(&ch), 0);

        assert!(!sim.wait_all_done(&ch, Timeout::Millis(5)));
        assert_eq!(sim.completed_count(&ch), 2);

        assert!(sim.wait_all_done(&ch, Timeout::Forever));
        assert_eq!(sim.completed_count(&ch), 3);
    }

    #[test]
    fn test_full_queue_rejects() {
        let sim = SimRmt::new();
        let ch = sim.new_tx_channel(&config(1_000_000)).unwrap();
        let enc = sim.new_copy_encoder().unwrap();
        sim.enable(&ch).unwrap();

        let symbols = [Symbol::new(true, 1, false, 1)];
        for _ in 0..4 {
            unsafe { sim.transmit(&ch, &enc, &symbols, &TransmitConfig::default()) }.unwrap();
        }
        let err = unsafe { sim.transmit(&ch, &enc, &symbols, &TransmitConfig::default()) };
        assert_eq!(err, Err(HwError::INVALID_STATE));
        assert_eq!(sim.pending(ch.slot()), 4);
    }

    #[test]
    fn test_delete_enabled_channel_rejected() {
        let sim = SimRmt::new();
        let ch = sim.new_tx_channel(&config(1_000_000)).unwrap();
        sim.enable(&ch).unwrap();
        assert_eq!(sim.disable(&ch), Ok(()));
        assert_eq!(sim.disable(&ch), Err(HwError::INVALID_STATE));
        assert_eq!(sim.del_channel(ch), Ok(()));
        assert_eq!(sim.live_channels(), 0);
    }
}
