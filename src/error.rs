//! Error types for the RMT pulse driver.
//!
//! Every failure is local and synchronous. Nothing here is retried
//! internally; retry policy belongs to the caller.

/// Raw ESP-IDF error code (`esp_err_t`) reported by the hardware layer.
///
/// Kept opaque: the driver only forwards it, it never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwError(pub i32);

impl HwError {
    pub const FAIL: HwError = HwError(-1);
    pub const NO_MEM: HwError = HwError(0x101);
    pub const INVALID_ARG: HwError = HwError(0x102);
    pub const INVALID_STATE: HwError = HwError(0x103);
    pub const NOT_FOUND: HwError = HwError(0x105);
    pub const TIMEOUT: HwError = HwError(0x107);

    /// Raw numeric code.
    #[inline]
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Symbolic name for the codes the RMT driver commonly returns.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::FAIL => "ESP_FAIL",
            Self::NO_MEM => "ESP_ERR_NO_MEM",
            Self::INVALID_ARG => "ESP_ERR_INVALID_ARG",
            Self::INVALID_STATE => "ESP_ERR_INVALID_STATE",
            Self::NOT_FOUND => "ESP_ERR_NOT_FOUND",
            Self::TIMEOUT => "ESP_ERR_TIMEOUT",
            _ => "ESP_ERR",
        }
    }
}

impl core::fmt::Display for HwError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.0)
    }
}

/// Features the RMT wrapper deliberately does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Carrier modulation of the output.
    Carrier,
    /// Hardware loop / repeat of a symbol buffer.
    Loop,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Carrier => "tx_carrier",
            Self::Loop => "loop mode",
        }
    }
}

/// RMT driver error with code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmtError {
    /// R01: Configuration out of legal range (clock divisor, pin)
    InvalidConfig,
    /// R02: Hardware channel or encoder could not be allocated
    HardwareAllocation(HwError),
    /// R03: Requested feature is not implemented on this driver
    NotSupported(Feature),
    /// R04: Pulse description contains no pulses
    EmptySequence,
    /// R05: Paired durations and levels differ in length
    LengthMismatch { durations: usize, levels: usize },
    /// R06: Transmission queue refused the submission
    HardwareBusyOrRejected(HwError),
    /// R07: Channel has been torn down
    NotReady,
}

impl RmtError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig => "R01",
            Self::HardwareAllocation(_) => "R02",
            Self::NotSupported(_) => "R03",
            Self::EmptySequence => "R04",
            Self::LengthMismatch { .. } => "R05",
            Self::HardwareBusyOrRejected(_) => "R06",
            Self::NotReady => "R07",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidConfig => "invalid configuration",
            Self::HardwareAllocation(_) => "hardware allocation failed",
            Self::NotSupported(_) => "not implemented on RMT NG in this wrapper",
            Self::EmptySequence => "no pulses",
            Self::LengthMismatch { .. } => "duration and data must have same length",
            Self::HardwareBusyOrRejected(_) => "transmission rejected",
            Self::NotReady => "channel not initialised",
        }
    }
}

impl core::fmt::Display for RmtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        match self {
            Self::HardwareAllocation(hw) | Self::HardwareBusyOrRejected(hw) => {
                write!(f, " ({})", hw)
            }
            Self::NotSupported(feature) => write!(f, " ({})", feature.as_str()),
            Self::LengthMismatch { durations, levels } => {
                write!(f, " ({} durations, {} levels)", durations, levels)
            }
            _ => Ok(()),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T = ()> = core::result::Result<T, RmtError>;
