//! Terminal progress for `tern migrate`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tern_core::observer::{EVENT_MIGRATE, EVENT_MIGRATION};
use tern_core::MigrationObserver;

/// Spinner on stderr that follows the engine's progress events.
///
/// indicatif hides the spinner when stderr is not a terminal, so piped
/// output stays clean.
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} applied  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }
}

impl MigrationObserver for ProgressObserver {
    fn event_begin(&mut self, key: &str, label: &str, detail: Option<&str>) {
        match (key, detail) {
            (EVENT_MIGRATE, Some(detail)) => {
                self.bar.enable_steady_tick(Duration::from_millis(100));
                self.bar.set_message(format!("{label}: {detail}"));
            }
            (EVENT_MIGRATION, _) => self.bar.set_message(label.to_string()),
            _ => self.bar.set_message(format!("{key} {label}")),
        }
    }

    fn event_end(&mut self, key: &str, _label: &str) {
        match key {
            EVENT_MIGRATION => self.bar.inc(1),
            EVENT_MIGRATE => self.bar.finish_and_clear(),
            _ => {}
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        // A failed run never sends the closing migrate event.
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
