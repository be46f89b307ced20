//! # rmt-pulse-tx
//!
//! Pulse-train output on the ESP32 RMT peripheral (ESP-IDF 5.x TX driver).
//!
//! ## Architecture
//!
//! ```text
//! PulseSequence ──▶ encode ──▶ SymbolBuffer ──▶ Channel::submit ──▶ RMT queue ──▶ pin
//!                                                                       │
//!                                           Channel::wait_done ◀────────┘
//! ```
//!
//! - [`pulse`]: pure encoder, three input shapes to RMT symbols
//! - [`channel`]: hardware channel + copy encoder lifecycle
//! - [`tx`]: submission and bounded completion wait
//! - [`hal`]: backend seam (ESP-IDF on target, simulated peripheral on host)
//!
//! Everything except [`hal::esp_idf`] runs on the host.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod channel;
pub mod compat;
pub mod config;
pub mod error;
pub mod hal;
pub mod log_globals;
pub mod logging;
pub mod pulse;
pub mod symbol;
pub mod tx;

pub use channel::Channel;
pub use config::{CarrierConfig, ChannelConfig, PULSE_MAX, SOURCE_CLOCK_HZ};
pub use error::{Feature, HwError, RmtError};
pub use hal::{RmtBackend, SimRmt, Timeout};
pub use log_globals::RMT_EVENTS;
pub use pulse::PulseSequence;
pub use symbol::{Symbol, SymbolBuffer};
