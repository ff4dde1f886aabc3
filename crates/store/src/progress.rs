use std::fmt;
use tracing::{info, warn};

/// Stage of a save or load a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SaveRaw,
    SaveBinary,
    LoadRaw,
    LoadBinary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SaveRaw => "save/raw",
            Phase::SaveBinary => "save/binary",
            Phase::LoadRaw => "load/raw",
            Phase::LoadBinary => "load/binary",
        };
        f.write_str(name)
    }
}

/// What happened to one key in one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored,
    /// Not natively storable; deferred to the binary pass.
    Rerouted,
    Loaded,
    /// Left out of the result; the operation continues.
    Skipped(String),
    /// The operation stops with an error for this key.
    Failed(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Stored | Outcome::Rerouted | Outcome::Loaded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Stored => f.write_str("stored"),
            Outcome::Rerouted => f.write_str("rerouted to binary"),
            Outcome::Loaded => f.write_str("loaded"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent<'a> {
    pub phase: Phase,
    pub key: &'a str,
    pub outcome: Outcome,
}

/// Receiver of per-key progress, only invoked in verbose mode.
pub trait Progress {
    fn report(&self, event: &ProgressEvent<'_>);
}

impl<F> Progress for F
where
    F: Fn(&ProgressEvent<'_>),
{
    fn report(&self, event: &ProgressEvent<'_>) {
        self(event)
    }
}

/// Default sink: one `tracing` event per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn report(&self, event: &ProgressEvent<'_>) {
        if event.outcome.is_ok() {
            info!(phase = %event.phase, key = event.key, "{}", event.outcome);
        } else {
            warn!(phase = %event.phase, key = event.key, "{}", event.outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn closures_are_sinks() {
        let seen = RefCell::new(Vec::new());
        let sink = |event: &ProgressEvent<'_>| {
            seen.borrow_mut().push(format!("{} {} {}", event.phase, event.key, event.outcome));
        };
        sink.report(&ProgressEvent {
            phase: Phase::SaveBinary,
            key: "k",
            outcome: Outcome::Skipped("bad blob".into()),
        });
        assert_eq!(seen.into_inner(), vec!["save/binary k skipped: bad blob"]);
    }

    #[test]
    fn outcome_ok_flags() {
        assert!(Outcome::Rerouted.is_ok());
        assert!(!Outcome::Failed("x".into()).is_ok());
    }
}
