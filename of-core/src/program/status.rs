//! Fan program status reporting

use std::fmt;

use tracing::{debug, info};

/// How prominently a status message should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine update
    Verbose,
    /// State change worth showing
    Notice,
    /// Program start or end
    Important,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verbose => "verbose",
            Self::Notice => "notice",
            Self::Important => "important",
        })
    }
}

/// Receives every status message of a fan program
pub type StatusCallback = Box<dyn FnMut(Severity, &str) + Send>;

/// Forwards status messages to the callback and to the log
#[derive(Default)]
pub(crate) struct StatusReporter {
    callback: Option<StatusCallback>,
}

impl StatusReporter {
    pub(crate) fn set_callback(&mut self, callback: Option<StatusCallback>) {
        self.callback = callback;
    }

    pub(crate) fn emit(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Verbose => debug!(target: "status", "{}", message),
            Severity::Notice | Severity::Important => info!(target: "status", "{}", message),
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(severity, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_reporter_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reporter = StatusReporter::default();
        reporter.emit(Severity::Verbose, "dropped");
        reporter.set_callback(Some(Box::new(move |severity: Severity, message: &str| {
            sink.lock().unwrap().push((severity, message.to_string()));
        })));
        reporter.emit(Severity::Notice, "hello");

        assert_eq!(*seen.lock().unwrap(), vec![(Severity::Notice, "hello".to_string())]);
    }
}
