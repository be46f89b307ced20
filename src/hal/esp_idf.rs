//! ESP-IDF 5.x RMT TX backend.
//!
//! Uses the "NG" driver (`driver/rmt_tx.h` + `driver/rmt_encoder.h`):
//! the driver picks the hardware channel, a copy encoder forwards the
//! symbol words as-is. Finished transmissions are counted from the
//! `on_trans_done` ISR callback.

use alloc::boxed::Box;
use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicU32, Ordering};

use esp_idf_svc::sys::{self, esp_err_t, rmt_channel_handle_t, rmt_encoder_handle_t};

use crate::error::HwError;
use crate::hal::{RmtBackend, Timeout, TransmitConfig, TxChannelConfig};
use crate::symbol::Symbol;

/// Live `rmt_channel_handle_t` plus its completion counter.
pub struct EspTxChannel {
    handle: rmt_channel_handle_t,
    /// Bumped by `on_trans_done`. Boxed: the driver keeps its address.
    done: Box<AtomicU32>,
}

// SAFETY: the RMT driver serialises access to a channel internally; the
// handle is a plain pointer into driver-owned memory and the counter is
// atomic.
unsafe impl Send for EspTxChannel {}
unsafe impl Sync for EspTxChannel {}

/// Live `rmt_encoder_handle_t` (copy encoder).
pub struct EspCopyEncoder(rmt_encoder_handle_t);

// SAFETY: the copy encoder holds no thread-affine state.
unsafe impl Send for EspCopyEncoder {}
unsafe impl Sync for EspCopyEncoder {}

/// The on-chip RMT group.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspRmt;

impl EspRmt {
    pub const fn new() -> Self {
        EspRmt
    }
}

/// Runs in ISR context.
unsafe extern "C" fn on_trans_done(
    _channel: rmt_channel_handle_t,
    _edata: *const sys::rmt_tx_done_event_data_t,
    user_ctx: *mut c_void,
) -> bool {
    // SAFETY: user_ctx is the channel's boxed counter, alive until the
    // channel is deleted.
    let done = unsafe { &*(user_ctx as *const AtomicU32) };
    done.fetch_add(1, Ordering::Release);
    false
}

#[inline]
fn check(err: esp_err_t) -> Result<(), HwError> {
    if err == sys::ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(HwError(err))
    }
}

impl RmtBackend for EspRmt {
    type Channel = EspTxChannel;
    type Encoder = EspCopyEncoder;

    fn new_tx_channel(&self, config: &TxChannelConfig) -> Result<EspTxChannel, HwError> {
        let tx_cfg = sys::rmt_tx_channel_config_t {
            gpio_num: config.gpio,
            clk_src: sys::soc_periph_rmt_clk_src_t_RMT_CLK_SRC_DEFAULT,
            resolution_hz: config.resolution_hz,
            mem_block_symbols: config.mem_block_symbols,
            trans_queue_depth: config.trans_queue_depth,
            ..Default::default()
        };

        let mut handle: rmt_channel_handle_t = ptr::null_mut();
        // SAFETY: both pointers are valid for the duration of the call.
        check(unsafe { sys::rmt_new_tx_channel(&tx_cfg, &mut handle) })?;

        let done = Box::new(AtomicU32::new(0));
        let cbs = sys::rmt_tx_event_callbacks_t {
            on_trans_done: Some(on_trans_done),
            ..Default::default()
        };
        // SAFETY: the channel is not enabled yet; the counter lives in the
        // returned EspTxChannel until del_channel.
        let registered = check(unsafe {
            sys::rmt_tx_register_event_callbacks(
                handle,
                &cbs,
                &*done as *const AtomicU32 as *mut c_void,
            )
        });
        if let Err(err) = registered {
            let _ = unsafe { sys::rmt_del_channel(handle) };
            return Err(err);
        }

        Ok(EspTxChannel { handle, done })
    }

    fn new_copy_encoder(&self) -> Result<EspCopyEncoder, HwError> {
        let enc_cfg = sys::rmt_copy_encoder_config_t::default();
        let mut handle: rmt_encoder_handle_t = ptr::null_mut();
        // SAFETY: both pointers are valid for the duration of the call.
        check(unsafe { sys::rmt_new_copy_encoder(&enc_cfg, &mut handle) })?;
        Ok(EspCopyEncoder(handle))
    }

    fn enable(&self, channel: &EspTxChannel) -> Result<(), HwError> {
        check(unsafe { sys::rmt_enable(channel.handle) })
    }

    fn disable(&self, channel: &EspTxChannel) -> Result<(), HwError> {
        check(unsafe { sys::rmt_disable(channel.handle) })
    }

    fn del_encoder(&self, encoder: EspCopyEncoder) -> Result<(), HwError> {
        check(unsafe { sys::rmt_del_encoder(encoder.0) })
    }

    fn del_channel(&self, channel: EspTxChannel) -> Result<(), HwError> {
        let EspTxChannel { handle, done } = channel;
        let result = check(unsafe { sys::rmt_del_channel(handle) });
        if result.is_err() {
            // The driver may still call back into the counter.
            let _ = Box::leak(done);
        }
        result
    }

    unsafe fn transmit(
        &self,
        channel: &EspTxChannel,
        encoder: &EspCopyEncoder,
        symbols: &[Symbol],
        config: &TransmitConfig,
    ) -> Result<(), HwError> {
        let mut tx_cfg = sys::rmt_transmit_config_t {
            loop_count: 0,
            ..Default::default()
        };
        tx_cfg.flags.set_eot_level(config.eot_level as u32);

        // Symbol is repr(transparent) over the 32-bit rmt_symbol_word_t.
        check(sys::rmt_transmit(
            channel.handle,
            encoder.0,
            symbols.as_ptr() as *const c_void,
            core::mem::size_of_val(symbols),
            &tx_cfg,
        ))
    }

    fn completed_count(&self, channel: &EspTxChannel) -> u32 {
        channel.done.load(Ordering::Acquire)
    }

    fn wait_all_done(&self, channel: &EspTxChannel, timeout: Timeout) -> bool {
        // rmt_tx_wait_all_done takes milliseconds, -1 blocks forever
        let timeout_ms = match timeout {
            Timeout::Forever => -1,
            Timeout::Millis(ms) => ms.min(i32::MAX as u32) as i32,
        };
        check(unsafe { sys::rmt_tx_wait_all_done(channel.handle, timeout_ms) }).is_ok()
    }

    fn now_us(&self) -> i64 {
        // SAFETY: esp_timer_get_time is always safe to call
        unsafe { sys::esp_timer_get_time() }
    }
}
