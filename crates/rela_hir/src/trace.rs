//! Observational trace of resolution and typing decisions

/// Receives one line per decision: parameter binding, unit merge,
/// and the inferred type of each field, parameter and body.
pub trait TraceSink {
    fn trace(&mut self, line: String);
}

/// Forwards every line to the `log` facade at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn trace(&mut self, line: String) {
        log::debug!(target: "rela::trace", "{}", line);
    }
}

/// Collects lines in memory
impl TraceSink for Vec<String> {
    fn trace(&mut self, line: String) {
        self.push(line);
    }
}
