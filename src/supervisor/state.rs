//! Supervision run states

use std::fmt;

/// One supervision run, in order:
///
/// `Starting -> CapturingIdentity -> NotifyingIdentity -> CheckingBalance
/// -> [Funding -> ReCheckingBalance] -> WatchingHeartbeat -> Done`
///
/// Terminal: Done, LaunchFailed, IdentityFailed, Aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Replacing any previous instance and launching the node
    Starting,

    /// Waiting for the burner announcement
    CapturingIdentity,

    /// Terminal: node never announced its burner
    IdentityFailed,

    /// Terminal: node could not be launched
    LaunchFailed,

    NotifyingIdentity,

    CheckingBalance,

    /// Transfer from the owner wallet in flight
    Funding,

    ReCheckingBalance,

    WatchingHeartbeat,

    /// Terminal: run completed, with or without a heartbeat
    Done,

    /// Terminal: balance query failed or the run was cancelled
    Aborted,
}

impl RunState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Done | RunState::LaunchFailed | RunState::IdentityFailed | RunState::Aborted
        )
    }

    /// Whether the run may move from `self` to `next`
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (_, Aborted) => !self.is_terminal(),
            (Starting, CapturingIdentity | LaunchFailed) => true,
            (CapturingIdentity, NotifyingIdentity | IdentityFailed) => true,
            (NotifyingIdentity, CheckingBalance) => true,
            (CheckingBalance, Funding | WatchingHeartbeat) => true,
            (Funding, ReCheckingBalance) => true,
            (ReCheckingBalance, WatchingHeartbeat) => true,
            (WatchingHeartbeat, Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Starting => "STARTING",
            RunState::CapturingIdentity => "CAPTURING_IDENTITY",
            RunState::IdentityFailed => "IDENTITY_FAILED",
            RunState::LaunchFailed => "LAUNCH_FAILED",
            RunState::NotifyingIdentity => "NOTIFYING_IDENTITY",
            RunState::CheckingBalance => "CHECKING_BALANCE",
            RunState::Funding => "FUNDING",
            RunState::ReCheckingBalance => "RECHECKING_BALANCE",
            RunState::WatchingHeartbeat => "WATCHING_HEARTBEAT",
            RunState::Done => "DONE",
            RunState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
