//! Pulse descriptions and the symbol encoder.
//!
//! Pure logic, no hardware dependencies. Fully testable on host.
//!
//! # Modes
//!
//! - **Toggle**: N durations, level starts at `start_level` and flips after
//!   every pulse (continuous across symbol boundaries)
//! - **ConstantDuration**: one duration, N levels
//! - **Paired**: N durations and N levels
//!
//! Durations are ticks at the channel resolution. No scaling, clamping or
//! splitting is done here: pulses above [`PULSE_MAX`] must be split by the
//! caller. A longer duration wraps at 15 bits in release builds, and a
//! wrapped 0 ends the frame early. Debug builds assert instead.

use crate::config::PULSE_MAX;
use crate::error::{Result, RmtError};
use crate::symbol::{Symbol, SymbolBuffer};

/// What to transmit. Durations above `PULSE_MAX` do not fit a symbol, and a
/// zero duration ends the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseSequence<'a> {
    /// Durations with alternating levels, starting at `start_level`.
    Toggle {
        durations: &'a [u32],
        start_level: bool,
    },
    /// One duration shared by every level.
    ConstantDuration { duration: u32, levels: &'a [bool] },
    /// Explicit duration and level per pulse.
    Paired {
        durations: &'a [u32],
        levels: &'a [bool],
    },
}

impl<'a> PulseSequence<'a> {
    pub fn toggle(durations: &'a [u32], start_level: bool) -> Self {
        Self::Toggle {
            durations,
            start_level,
        }
    }

    pub fn constant_duration(duration: u32, levels: &'a [bool]) -> Self {
        Self::ConstantDuration { duration, levels }
    }

    pub fn paired(durations: &'a [u32], levels: &'a [bool]) -> Self {
        Self::Paired { durations, levels }
    }

    /// Number of logical pulses, after checking the shape.
    ///
    /// Fails with `LengthMismatch` for uneven paired input and
    /// `EmptySequence` when there is nothing to send.
    pub fn validate(&self) -> Result<usize> {
        let len = match *self {
            Self::Toggle { durations, .. } => durations.len(),
            Self::ConstantDuration { levels, .. } => levels.len(),
            Self::Paired { durations, levels } => {
                if durations.len() != levels.len() {
                    return Err(RmtError::LengthMismatch {
                        durations: durations.len(),
                        levels: levels.len(),
                    });
                }
                durations.len()
            }
        };

        if len == 0 {
            return Err(RmtError::EmptySequence);
        }
        Ok(len)
    }

    /// Level and duration of pulse `i`. `i` must be below the validated length.
    #[inline]
    fn pulse(&self, i: usize) -> (bool, u32) {
        match *self {
            // start ^ (i mod 2)
            Self::Toggle {
                durations,
                start_level,
            } => (start_level ^ ((i & 1) == 1), durations[i]),
            Self::ConstantDuration { duration, levels } => (levels[i], duration),
            Self::Paired { durations, levels } => (levels[i], durations[i]),
        }
    }
}

/// Symbols needed for `pulses` pulses (two per symbol).
#[inline]
pub const fn symbols_for(pulses: usize) -> usize {
    pulses / 2 + pulses % 2
}

/// Encode `seq` into `buffer`, growing it if needed.
///
/// Returns the filled prefix. On an odd pulse count the final symbol's
/// second half is `(level=0, duration=0)`, the end marker.
///
/// Validation happens before the buffer is touched.
pub fn encode<'b>(seq: &PulseSequence<'_>, buffer: &'b mut SymbolBuffer) -> Result<&'b [Symbol]> {
    let num_pulses = seq.validate()?;
    let num_symbols = symbols_for(num_pulses);

    buffer.ensure_capacity(num_symbols);

    for (i, slot) in buffer.as_mut_slice()[..num_symbols].iter_mut().enumerate() {
        let first = 2 * i;
        let (l0, d0) = seq.pulse(first);
        let (l1, d1) = if first + 1 < num_pulses {
            seq.pulse(first + 1)
        } else {
            (false, 0)
        };
        debug_assert!(
            d0 <= PULSE_MAX && d1 <= PULSE_MAX,
            "pulse duration exceeds PULSE_MAX"
        );
        *slot = Symbol::new(l0, d0, l1, d1);
    }

    Ok(buffer.prefix(num_symbols))
}
