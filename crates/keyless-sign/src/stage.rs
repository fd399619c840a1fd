//! Progress of a signing ceremony

use std::fmt;

/// A point in the ceremony, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Idle,
    Authenticated,
    KeyResolved,
    ProofSigned,
    CertificateIssued,
    ArtifactSigned,
    LogRecorded,
    Done,
}

impl Stage {
    /// The stage after this one, `None` once done
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Authenticated),
            Stage::Authenticated => Some(Stage::KeyResolved),
            Stage::KeyResolved => Some(Stage::ProofSigned),
            Stage::ProofSigned => Some(Stage::CertificateIssued),
            Stage::CertificateIssued => Some(Stage::ArtifactSigned),
            Stage::ArtifactSigned => Some(Stage::LogRecorded),
            Stage::LogRecorded => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Authenticated => "authenticated",
            Stage::KeyResolved => "key resolved",
            Stage::ProofSigned => "proof signed",
            Stage::CertificateIssued => "certificate issued",
            Stage::ArtifactSigned => "artifact signed",
            Stage::LogRecorded => "log recorded",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Where a ceremony stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    /// Last stage reached
    At(Stage),
    /// The step towards this stage failed; terminal
    Failed(Stage),
}

/// Forward-only record of a ceremony's progress
#[derive(Debug, Clone)]
pub(crate) struct Progress {
    state: CeremonyState,
    reached: Vec<Stage>,
}

impl Progress {
    pub(crate) fn new() -> Self {
        Self {
            state: CeremonyState::At(Stage::Idle),
            reached: vec![Stage::Idle],
        }
    }

    pub(crate) fn state(&self) -> CeremonyState {
        self.state
    }

    pub(crate) fn reached(&self) -> &[Stage] {
        &self.reached
    }

    /// The stage the next step is trying to reach
    pub(crate) fn pending(&self) -> Option<Stage> {
        match self.state {
            CeremonyState::At(stage) => stage.next(),
            CeremonyState::Failed(_) => None,
        }
    }

    /// Record that the pending stage was reached
    pub(crate) fn advance(&mut self) {
        if let Some(stage) = self.pending() {
            tracing::info!(%stage, "signing ceremony advanced");
            self.state = CeremonyState::At(stage);
            self.reached.push(stage);
        }
    }

    /// Record that the pending step failed
    pub(crate) fn fail(&mut self) -> Stage {
        let stage = self.pending().unwrap_or(Stage::Done);
        self.state = CeremonyState::Failed(stage);
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_are_ordered() {
        let mut stage = Stage::Idle;
        let mut count = 1;
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            count += 1;
        }
        assert_eq!(stage, Stage::Done);
        assert_eq!(count, 8);
    }

    #[test]
    fn test_failure_records_pending_stage() {
        let mut progress = Progress::new();
        progress.advance();
        progress.advance();
        assert_eq!(progress.state(), CeremonyState::At(Stage::KeyResolved));

        assert_eq!(progress.fail(), Stage::ProofSigned);
        assert_eq!(progress.state(), CeremonyState::Failed(Stage::ProofSigned));

        progress.advance();
        assert_eq!(progress.state(), CeremonyState::Failed(Stage::ProofSigned));
        assert_eq!(
            progress.reached(),
            &[Stage::Idle, Stage::Authenticated, Stage::KeyResolved]
        );
    }
}
