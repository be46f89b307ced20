//! Non-blocking event log for the RMT driver.
//!
//! # Architecture
//!
//! ```text
//! Channel ops            EventLog             Drain (console/UART)
//! ───────────            ────────             ────────────────────
//!
//! push(Event) ────────▶ [E0][E1][E2] ──────▶ drain_to(writer)
//! O(1)                   lock-free            blocking ok
//! never blocks           ring buffer
//! ```
//!
//! Entries are structured (kind + numeric argument), not formatted text:
//! formatting happens on the drain side.
//!
//! # Rules
//!
//! - push never blocks and never allocates
//! - entries may be dropped when the ring is full; drops are counted

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Event buffer size (number of entries).
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// What happened. The meaning of [`Event::arg`] depends on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Channel allocated and enabled. arg = resolution in Hz.
    Created,
    /// Channel, encoder or enable failed. arg = esp_err_t.
    AllocFailed,
    /// Frame queued. arg = symbol count.
    Transmit,
    /// Frame refused by the driver. arg = esp_err_t.
    TransmitRejected,
    /// Every buffer still in flight. arg = queue depth.
    QueueFull,
    /// wait_done gave up. arg = timeout in ms.
    WaitTimeout,
    /// Handles released. arg = 1 if the channel was enabled.
    TornDown,
    /// Loop mode requested.
    LoopRejected,
    /// Carrier requested.
    CarrierRejected,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::AllocFailed => "alloc failed",
            EventKind::Transmit => "transmit",
            EventKind::TransmitRejected => "transmit rejected",
            EventKind::QueueFull => "queue full",
            EventKind::WaitTimeout => "wait timeout",
            EventKind::TornDown => "torn down",
            EventKind::LoopRejected => "loop rejected",
            EventKind::CarrierRejected => "carrier rejected",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Timestamp in microseconds (backend clock).
    pub timestamp_us: i64,
    pub level: LogLevel,
    /// Legacy channel label of the emitting channel.
    pub channel_id: i8,
    pub kind: EventKind,
    pub arg: u32,
}

impl Event {
    const EMPTY: Event = Event {
        timestamp_us: 0,
        level: LogLevel::Debug,
        channel_id: -1,
        kind: EventKind::Created,
        arg: 0,
    };
}

impl fmt::Display for Event {
    /// `[timestamp_us] LEVEL rmt<id>: kind arg`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:10}] {} rmt{}: {}",
            self.timestamp_us,
            self.level.as_str(),
            self.channel_id,
            self.kind.as_str()
        )?;
        match self.kind {
            EventKind::AllocFailed | EventKind::TransmitRejected => {
                write!(f, " (0x{:x})", self.arg as i32)
            }
            EventKind::LoopRejected | EventKind::CarrierRejected => Ok(()),
            _ => write!(f, " {}", self.arg),
        }
    }
}

struct Slot {
    /// `index + 1` once the entry for `index` is published.
    seq: AtomicU32,
    event: UnsafeCell<Event>,
}

/// Lock-free event ring (multiple producers, single consumer).
pub struct EventLog<const N: usize = EVENT_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: producers claim distinct indices with compare_exchange and publish
// through `seq`; the single consumer only reads published slots.
unsafe impl<const N: usize> Sync for EventLog<N> {}
unsafe impl<const N: usize> Send for EventLog<N> {}

impl<const N: usize> EventLog<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Event buffer size must be power of 2");

        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY_SLOT: Slot = Slot {
            seq: AtomicU32::new(0),
            event: UnsafeCell::new(Event::EMPTY),
        };

        Self {
            slots: [EMPTY_SLOT; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue an event. Returns `false` if it was dropped (ring full).
    pub fn push(&self, event: Event) -> bool {
        let mut write = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => write = current,
            }
        }

        let slot = &self.slots[(write as usize) & Self::MASK];
        // SAFETY: index `write` is owned by this producer until published.
        unsafe { *slot.event.get() = event };
        slot.seq.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Next published event, oldest first.
    pub fn drain(&self) -> Option<Event> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let slot = &self.slots[(read as usize) & Self::MASK];

        // Claimed but not yet published counts as empty.
        if slot.seq.load(Ordering::Acquire) != read.wrapping_add(1) {
            return None;
        }

        // SAFETY: single consumer, slot published for `read`.
        let event = unsafe { *slot.event.get() };
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(event)
    }

    /// Entries claimed and not yet drained.
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }
}

impl<const N: usize> Default for EventLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write every pending event to `out`, one per line, followed by a drop
/// report if anything was lost. Returns the number of events written.
pub fn drain_to<const N: usize, W: fmt::Write>(log: &EventLog<N>, out: &mut W) -> usize {
    let mut count = 0;
    while let Some(event) = log.drain() {
        let _ = writeln!(out, "{}", event);
        count += 1;
    }

    let dropped = log.dropped();
    if dropped > 0 {
        let _ = writeln!(out, "[WARN] Dropped: {}", dropped);
        log.reset_dropped();
    }
    count
}
