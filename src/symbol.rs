//! RMT symbols and the per-channel symbol buffer.
//!
//! A symbol is the 32-bit word the RMT memory holds: two (level, duration)
//! pulses, 15-bit durations in ticks. The layout matches ESP-IDF's
//! `rmt_symbol_word_t`, so a `&[Symbol]` can be handed to the copy encoder
//! as raw bytes.

use alloc::vec::Vec;

const DURATION_MASK: u32 = 0x7FFF;
const LEVEL0_BIT: u32 = 1 << 15;
const LEVEL1_BIT: u32 = 1 << 31;

/// One RMT memory word: `level0/duration0` then `level1/duration1`.
///
/// A second pulse of duration 0 marks the end of the transmission.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// All-zero word (end marker).
    pub const EMPTY: Symbol = Symbol(0);

    /// Pack two pulses. Durations wrap at 15 bits, as in the hardware field.
    #[inline]
    pub const fn new(level0: bool, duration0: u32, level1: bool, duration1: u32) -> Self {
        let mut raw = (duration0 & DURATION_MASK) | ((duration1 & DURATION_MASK) << 16);
        if level0 {
            raw |= LEVEL0_BIT;
        }
        if level1 {
            raw |= LEVEL1_BIT;
        }
        Symbol(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn level0(self) -> bool {
        self.0 & LEVEL0_BIT != 0
    }

    #[inline]
    pub const fn duration0(self) -> u32 {
        self.0 & DURATION_MASK
    }

    #[inline]
    pub const fn level1(self) -> bool {
        self.0 & LEVEL1_BIT != 0
    }

    #[inline]
    pub const fn duration1(self) -> u32 {
        (self.0 >> 16) & DURATION_MASK
    }

    /// Total duration of both halves, in ticks.
    #[inline]
    pub const fn ticks(self) -> u32 {
        self.duration0() + self.duration1()
    }
}

impl core::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{{l0={},d0={},l1={},d1={}}}",
            self.level0() as u8,
            self.duration0(),
            self.level1() as u8,
            self.duration1()
        )
    }
}

/// Growable symbol storage owned by one channel.
///
/// Grows on demand and never shrinks, so repeated transmissions of similar
/// size do not reallocate. Growing may move the storage: do not hold a
/// slice across `ensure_capacity`.
#[derive(Debug, Default)]
pub struct SymbolBuffer {
    symbols: Vec<Symbol>,
}

impl SymbolBuffer {
    pub const fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Grow to at least `n_symbols`. No-op when already large enough.
    pub fn ensure_capacity(&mut self, n_symbols: usize) {
        if n_symbols > self.symbols.len() {
            self.symbols.resize(n_symbols, Symbol::EMPTY);
        }
    }

    /// Number of symbols currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.symbols.len()
    }

    /// First `len` symbols. `len` must not exceed `capacity()`.
    #[inline]
    pub fn prefix(&self, len: usize) -> &[Symbol] {
        &self.symbols[..len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Symbol] {
        &mut self.symbols
    }

    /// Free the storage (teardown).
    pub fn release(&mut self) {
        self.symbols = Vec::new();
    }
}
