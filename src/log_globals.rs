//! Global event log instance.
//!
//! Single ring shared by every channel in the process: channels push,
//! one console or UART task drains.

use crate::logging::EventLog;

/// Events from all RMT channels.
pub static RMT_EVENTS: EventLog = EventLog::new();
