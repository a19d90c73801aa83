//! Reporter sinks consumed by the parser and library loaders
//!
//! Both sinks are optional everywhere they are accepted; passing `None`
//! must never change parsing results, only what gets reported.

use serde::Serialize;

/// Severity attached to a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Receives human-readable warnings and errors
pub trait Reporter {
    fn report(&mut self, message: &str, severity: Severity);
}

/// Receives phase and completion updates for long parses
pub trait ProgressReporter {
    fn begin_phase(&mut self, phase: &str);
    /// `fraction` is in `0.0..=1.0`
    fn set_progress(&mut self, fraction: f64);
}

/// Forwards every message to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
    }
}

/// Keeps reported messages in memory
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReportCollector {
    pub messages: Vec<(Severity, String)>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|(s, _)| *s == Severity::Warning)
            .map(|(_, m)| m.as_str())
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|(s, _)| *s == Severity::Error)
    }
}

impl Reporter for ReportCollector {
    fn report(&mut self, message: &str, severity: Severity) {
        self.messages.push((severity, message.to_string()));
    }
}

/// Send `message` to `reporter` if one is attached
pub(crate) fn emit(reporter: &mut Option<&mut dyn Reporter>, message: &str, severity: Severity) {
    if let Some(r) = reporter.as_deref_mut() {
        r.report(message, severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_filters_warnings() {
        let mut collector = ReportCollector::new();
        collector.report("clamped", Severity::Warning);
        collector.report("loaded", Severity::Info);
        assert_eq!(collector.warnings().collect::<Vec<_>>(), vec!["clamped"]);
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_emit_without_reporter_is_noop() {
        let mut none: Option<&mut dyn Reporter> = None;
        emit(&mut none, "ignored", Severity::Error);
    }
}
