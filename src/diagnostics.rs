use log::Level;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEntry {
    pub level: String,
    pub message: String,
}

/// Bounded in-memory record of recent engine diagnostics.
///
/// Owned by whichever component wants to show recent warnings to the user. When full,
/// the oldest entry is dropped. Entries are also forwarded to the `log` facade.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    capacity: usize,
    entries: VecDeque<DiagnosticEntry>,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn append(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        log::log!(level, "{}", message);

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DiagnosticEntry {
            level: level.to_string(),
            message,
        });
    }

    /// Removes and returns every entry, oldest first.
    pub fn drain(&mut self) -> Vec<DiagnosticEntry> {
        self.entries.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_drops_oldest_when_full() {
        let mut log = DiagnosticLog::new(3);
        for i in 0..5 {
            log.append(Level::Warn, format!("warning {}", i));
        }

        assert_eq!(log.len(), 3);
        let messages: Vec<String> = log.drain().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["warning 2", "warning 3", "warning 4"]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_and_levels() {
        let mut log = DiagnosticLog::new(10);
        log.append(Level::Info, "imported 3 rows");
        log.append(Level::Warn, "row 4 skipped");

        let levels: Vec<&str> = log.iter().map(|e| e.level.as_str()).collect();
        assert_eq!(levels, vec!["INFO", "WARN"]);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 10);
    }

    #[test]
    fn test_zero_capacity_keeps_latest_entry() {
        let mut log = DiagnosticLog::new(0);
        log.append(Level::Debug, "a");
        log.append(Level::Debug, "b");
        assert_eq!(log.drain()[0].message, "b");
    }

    #[test]
    fn test_logs_are_independent() {
        let mut first = DiagnosticLog::new(5);
        let second = DiagnosticLog::new(5);
        first.append(Level::Error, "only here");
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
