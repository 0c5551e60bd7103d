//! Executor configuration and run reporting
//!
//! - [`ExecutorConfig`]: knobs the executor reads once per run
//! - [`RunReport`]: per-action journal and per-phase stats
//! - [`RunFailure`]: the error that stopped a run plus the partial report

use crate::error::MigrationError;
use crate::state::ActionState;
use serde::Serialize;
use sitemig_symbol::RemoteId;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Stop after the schema phase
    pub skip_data: bool,
    /// Minimum time between progress lines within a phase
    pub progress_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            skip_data: false,
            progress_interval: Duration::from_secs(10),
        }
    }
}

impl ExecutorConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_skip_data(mut self, skip: bool) -> Self {
        self.skip_data = skip;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Human-readable identification of one action: kind plus alias or name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLabel {
    pub kind: &'static str,
    pub subject: String,
}

impl ActionLabel {
    #[inline]
    #[must_use]
    pub fn new(kind: &'static str, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }
}

impl Display for ActionLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.subject)
    }
}

/// Journal entry for one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub label: ActionLabel,
    /// Final state reached
    pub state: ActionState,
    /// Identity created or located, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
}

/// Summary of one phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseStats {
    pub phase: &'static str,
    pub processed: usize,
    pub elapsed: Duration,
}

impl PhaseStats {
    /// Items per second over the whole phase
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Elapsed wall time in whole milliseconds, saturating
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of a run, complete or partial
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub actions: Vec<ActionRecord>,
    pub phases: Vec<PhaseStats>,
    /// Aliases bound in the symbol table when the run ended
    pub symbols: usize,
}

impl RunReport {
    /// Actions that reached `Registered`
    #[must_use]
    pub fn registered(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.state == ActionState::Registered)
            .count()
    }

    /// Journal entry for the action labelled `subject`, if any
    #[must_use]
    pub fn action(&self, subject: &str) -> Option<&ActionRecord> {
        self.actions.iter().find(|a| a.label.subject == subject)
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "actions registered: {}/{}", self.registered(), self.actions.len())?;
        writeln!(f, "symbols bound:      {}", self.symbols)?;
        for phase in &self.phases {
            writeln!(
                f,
                "  {:<14} {:>6} items in {:>8.2?} ({:.1}/s)",
                phase.phase,
                phase.processed,
                phase.elapsed,
                phase.throughput()
            )?;
        }
        Ok(())
    }
}

/// A run stopped by `error` while processing `action`
#[derive(Debug, thiserror::Error)]
#[error("{action} failed: {error}")]
pub struct RunFailure {
    #[source]
    pub error: MigrationError,
    pub action: ActionLabel,
    /// Everything completed before the failure
    pub report: RunReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = ExecutorConfig::new()
            .with_skip_data(true)
            .with_progress_interval(Duration::from_secs(1));
        assert!(config.skip_data);
        assert_eq!(config.progress_interval, Duration::from_secs(1));
        assert!(!ExecutorConfig::default().skip_data);
    }

    #[test]
    fn elapsed_ms_saturates() {
        let stats = |elapsed| PhaseStats {
            phase: "clients",
            processed: 0,
            elapsed,
        };
        assert_eq!(stats(Duration::from_millis(1500)).elapsed_ms(), 1500);
        assert_eq!(stats(Duration::MAX).elapsed_ms(), u64::MAX);
    }

    #[test]
    fn failure_display_names_the_action() {
        let failure = RunFailure {
            error: MigrationError::StaffNotFound {
                email: "x@example.org".into(),
            },
            action: ActionLabel::new("staff", "staff:x"),
            report: RunReport::default(),
        };
        assert_eq!(
            failure.to_string(),
            "staff 'staff:x' failed: no existing staff member with email 'x@example.org'"
        );
    }

    #[test]
    fn registered_counts_only_terminal_successes() {
        let report = RunReport {
            actions: vec![
                ActionRecord {
                    label: ActionLabel::new("client", "c1"),
                    state: ActionState::Registered,
                    id: Some(RemoteId::new("1")),
                },
                ActionRecord {
                    label: ActionLabel::new("client", "c2"),
                    state: ActionState::Failed,
                    id: None,
                },
            ],
            ..RunReport::default()
        };
        assert_eq!(report.registered(), 1);
        assert_eq!(report.action("c2").unwrap().state, ActionState::Failed);
    }
}
