//! Module: config
//!
//! Purpose: Channel configuration and fixed RMT hardware parameters.
//!
//! Architecture:
//! - Constants: fixed properties of the RMT TX path (clock, memory block, queue)
//! - ChannelConfig: per-channel user configuration, validated before any
//!   hardware resource is touched

use crate::error::{Feature, Result, RmtError};

/// Source clock feeding the RMT divider (APB, 80 MHz on ESP32 / ESP32-S3).
pub const SOURCE_CLOCK_HZ: u32 = 80_000_000;

/// Default divider: 80 MHz / 8 = 100 ns ticks.
pub const DEFAULT_CLOCK_DIV: u32 = 8;

/// Legal clock divider range.
pub const CLOCK_DIV_MIN: u32 = 1;
pub const CLOCK_DIV_MAX: u32 = 255;

/// Size of a channel memory block, in symbols.
pub const MEM_BLOCK_SYMBOLS: usize = 64;

/// Transactions that can be queued on one channel.
pub const TRANS_QUEUE_DEPTH: usize = 4;

/// Longest single pulse in ticks (15-bit duration field).
pub const PULSE_MAX: u32 = 32767;

/// TX channels available in one RMT group.
#[cfg(feature = "esp32")]
pub const TX_CHANNELS: usize = 8;
#[cfg(not(feature = "esp32"))]
pub const TX_CHANNELS: usize = 4;

/// Carrier modulation request.
///
/// Carrier output is not implemented; this type only exists so that a
/// request can be expressed and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierConfig {
    pub freq_hz: u32,
    pub duty_percent: u8,
    pub level: bool,
}

/// RMT TX channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Legacy channel number, shown when printing only. The driver picks
    /// the hardware channel itself.
    pub channel_id: i8,
    /// Output GPIO number.
    pub pin: i32,
    /// Source clock divider, 1..=255.
    pub clock_div: u32,
    /// Output level once a transmission ends.
    pub idle_level: bool,
    /// Must be `None`.
    pub carrier: Option<CarrierConfig>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_id: 0,
            pin: 0,
            clock_div: DEFAULT_CLOCK_DIV,
            idle_level: false,
            carrier: None,
        }
    }
}

impl ChannelConfig {
    /// Default configuration on `pin`.
    pub fn new(pin: i32) -> Self {
        Self {
            pin,
            ..Self::default()
        }
    }

    pub fn channel_id(mut self, id: i8) -> Self {
        self.channel_id = id;
        self
    }

    pub fn clock_div(mut self, div: u32) -> Self {
        self.clock_div = div;
        self
    }

    pub fn idle_level(mut self, level: bool) -> Self {
        self.idle_level = level;
        self
    }

    pub fn carrier(mut self, carrier: CarrierConfig) -> Self {
        self.carrier = Some(carrier);
        self
    }

    /// Check the configuration without touching hardware.
    pub fn validate(&self) -> Result {
        if !(CLOCK_DIV_MIN..=CLOCK_DIV_MAX).contains(&self.clock_div) {
            return Err(RmtError::InvalidConfig);
        }
        if self.pin < 0 {
            return Err(RmtError::InvalidConfig);
        }
        if self.carrier.is_some() {
            return Err(RmtError::NotSupported(Feature::Carrier));
        }
        Ok(())
    }

    /// Tick rate after the divider. Only meaningful on a validated config.
    #[inline]
    pub fn resolution_hz(&self) -> u32 {
        SOURCE_CLOCK_HZ / self.clock_div.max(CLOCK_DIV_MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_100ns_ticks() {
        let config = ChannelConfig::new(18);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.resolution_hz(), 10_000_000);
    }

    #[test]
    fn test_clock_div_bounds() {
        assert_eq!(ChannelConfig::new(4).clock_div(0).validate(), Err(RmtError::InvalidConfig));
        assert_eq!(ChannelConfig::new(4).clock_div(256).validate(), Err(RmtError::InvalidConfig));
        assert_eq!(ChannelConfig::new(4).clock_div(1).validate(), Ok(()));
        assert_eq!(ChannelConfig::new(4).clock_div(255).validate(), Ok(()));
    }

    #[test]
    fn test_negative_pin_rejected() {
        assert_eq!(ChannelConfig::new(-1).validate(), Err(RmtError::InvalidConfig));
    }

    #[test]
    fn test_carrier_rejected() {
        let config = ChannelConfig::new(4).carrier(CarrierConfig {
            freq_hz: 38_000,
            duty_percent: 33,
            level: true,
        });
        assert_eq!(
            config.validate(),
            Err(RmtError::NotSupported(Feature::Carrier))
        );
    }

    #[test]
    fn test_divider_checked_before_carrier() {
        let config = ChannelConfig::new(4).clock_div(0).carrier(CarrierConfig {
            freq_hz: 38_000,
            duty_percent: 50,
            level: true,
        });
        assert_eq!(config.validate(), Err(RmtError::InvalidConfig));
    }
}
