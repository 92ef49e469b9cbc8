//! Progress observers.
//!
//! Observers receive a side channel of events describing what the engine is
//! doing. They never influence control flow.

/// Event key for state resolution.
pub const EVENT_RESOLVE: &str = "resolve";
/// Event key for the filter chain.
pub const EVENT_FILTER: &str = "filter";
/// Event key for the whole unit of work.
pub const EVENT_MIGRATE: &str = "migrate";
/// Event key for a single migration.
pub const EVENT_MIGRATION: &str = "migration";

/// Receiver of structured progress events.
pub trait MigrationObserver {
    /// An operation identified by `key` started.
    fn event_begin(&mut self, key: &str, label: &str, detail: Option<&str>);

    /// The operation identified by `key` finished.
    fn event_end(&mut self, key: &str, label: &str);

    /// Free-form informational message.
    fn info(&mut self, message: &str);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl MigrationObserver for NullObserver {
    fn event_begin(&mut self, _key: &str, _label: &str, _detail: Option<&str>) {}
    fn event_end(&mut self, _key: &str, _label: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards events to the `log` facade at debug level and messages at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn event_begin(&mut self, key: &str, label: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => log::debug!("[{key}] begin {label} ({detail})"),
            None => log::debug!("[{key}] begin {label}"),
        }
    }

    fn event_end(&mut self, key: &str, label: &str) {
        log::debug!("[{key}] end {label}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }
}
