//! Legacy "bitstream channel" setting.
//!
//! The legacy RMT driver let callers reserve a numbered channel for
//! bitstream output. The ESP-IDF 5.x driver allocates channels itself, so
//! the value is only stored and reported back.
//!
//! **Deprecated**: no effect on allocation. Nothing in [`Channel`](crate::Channel)
//! reads it.

use core::sync::atomic::{AtomicI8, Ordering};

/// Process-wide, -1 = none.
static BITSTREAM_CHANNEL_ID: AtomicI8 = AtomicI8::new(-1);

/// Currently recorded bitstream channel, if any.
#[deprecated(note = "the ESP-IDF 5.x RMT driver allocates channels itself")]
pub fn bitstream_channel() -> Option<i8> {
    match BITSTREAM_CHANNEL_ID.load(Ordering::Relaxed) {
        id if id < 0 => None,
        id => Some(id),
    }
}

/// Record (or clear with `None`) the bitstream channel. A negative id clears.
#[deprecated(note = "the ESP-IDF 5.x RMT driver allocates channels itself")]
pub fn set_bitstream_channel(id: Option<i8>) {
    BITSTREAM_CHANNEL_ID.store(id.unwrap_or(-1), Ordering::Relaxed);
}
