//! Informational and warning events emitted while reading reports
//!
//! Components take an `&dyn EventSink` instead of logging on their own, so the
//! host decides where events go.

use std::cell::RefCell;

/// Event level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// Receiver of non-fatal events
pub trait EventSink {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Info)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn info(&self, message: &str) {
        log::info!("{}", message);
        self.events.borrow_mut().push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
        self.events.borrow_mut().push((Level::Warn, message.to_string()));
    }
}
