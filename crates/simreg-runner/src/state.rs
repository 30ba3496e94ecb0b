use std::fmt;

/// Progress of one case through the pipeline.
///
/// Valid transitions:
/// - `Init → Compiled → Staged → Configured → PreScripted → Executed → PostScripted → Done`
/// - any non-terminal state `→ Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseState {
    Init,
    Compiled,
    Staged,
    Configured,
    PreScripted,
    Executed,
    PostScripted,
    Done,
    /// A stage failed; absorbing.
    Failed,
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "Init",
            Self::Compiled => "Compiled",
            Self::Staged => "Staged",
            Self::Configured => "Configured",
            Self::PreScripted => "PreScripted",
            Self::Executed => "Executed",
            Self::PostScripted => "PostScripted",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

impl CaseState {
    /// State reached when the stage leaving `self` succeeds
    pub fn next(self) -> Self {
        match self {
            Self::Init => Self::Compiled,
            Self::Compiled => Self::Staged,
            Self::Staged => Self::Configured,
            Self::Configured => Self::PreScripted,
            Self::PreScripted => Self::Executed,
            Self::Executed => Self::PostScripted,
            Self::PostScripted => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    /// Name of the stage that leaves `self`; `None` once every stage has run
    pub fn phase(self) -> Option<&'static str> {
        match self {
            Self::Init => Some("compile"),
            Self::Compiled => Some("stage"),
            Self::Staged => Some("configure"),
            Self::Configured => Some("pre_script"),
            Self::PreScripted => Some("execute"),
            Self::Executed => Some("post_script"),
            Self::PostScripted | Self::Done | Self::Failed => None,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || next == self.next()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
