//! Bounded in-memory copy of recent records, for tests and operator tooling.
//!
//! Capture sees everything down to `Debug` regardless of the stderr level.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::{Level, LogRecord};

struct CaptureBuffer {
    capacity: usize,
    records: VecDeque<LogRecord>,
}

static CAPTURE_ON: AtomicBool = AtomicBool::new(false);
static CAPTURE: OnceLock<Mutex<CaptureBuffer>> = OnceLock::new();

fn buffer() -> &'static Mutex<CaptureBuffer> {
    CAPTURE.get_or_init(|| {
        Mutex::new(CaptureBuffer {
            capacity: 0,
            records: VecDeque::new(),
        })
    })
}

/// Starts capturing, keeping at most `capacity` records. Zero disables.
pub fn enable_capture(capacity: usize) {
    if capacity == 0 {
        disable_capture();
        return;
    }
    if let Ok(mut guard) = buffer().lock() {
        guard.capacity = capacity;
        while guard.records.len() > capacity {
            guard.records.pop_front();
        }
    }
    CAPTURE_ON.store(true, Ordering::Relaxed);
}

pub fn disable_capture() {
    CAPTURE_ON.store(false, Ordering::Relaxed);
}

pub fn clear_captured_logs() {
    if let Ok(mut guard) = buffer().lock() {
        guard.records.clear();
    }
}

/// Up to `limit` of the newest records, oldest first.
pub fn capture_snapshot(limit: usize) -> Vec<LogRecord> {
    let Ok(guard) = buffer().lock() else {
        return Vec::new();
    };
    let skip = guard.records.len().saturating_sub(limit);
    guard.records.iter().skip(skip).cloned().collect()
}

pub(crate) fn accepts(level: Level) -> bool {
    level <= Level::Debug && CAPTURE_ON.load(Ordering::Relaxed)
}

pub(crate) fn push(record: LogRecord) {
    let Ok(mut guard) = buffer().lock() else {
        return;
    };
    guard.records.push_back(record);
    while guard.records.len() > guard.capacity {
        guard.records.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_stderr_enabled;

    #[test]
    fn keeps_newest_records() {
        set_stderr_enabled(false);
        enable_capture(2);
        clear_captured_logs();
        crate::log_warn!("rejected {}", 0);
        crate::log_warn!("rejected {}", 1);
        crate::log_debug!("unresolved {}", "input");
        crate::log_trace!("never captured");

        let records = capture_snapshot(10);
        let messages: Vec<&str> = records.iter().map(|record| record.msg.as_str()).collect();
        assert_eq!(messages, ["rejected 1", "unresolved input"]);
        assert_eq!(records[1].level, Level::Debug);
        assert!(records[1].file.ends_with("capture.rs"));
        assert_eq!(capture_snapshot(1).len(), 1);

        disable_capture();
        crate::log_warn!("after disable");
        assert_eq!(capture_snapshot(10).len(), 2);
        clear_captured_logs();
        assert!(capture_snapshot(10).is_empty());
    }
}
