//! Transition tables for the two lifecycles
//!
//! Every status lists its outgoing edges in an exhaustive match, so adding
//! a status without deciding its edges does not compile.

use shared::{EngagementStatus, IdeaStatus, InvalidTransitionError, RecordKind, Result};

/// A status type with a fixed transition graph
pub trait Lifecycle: Copy + Eq + std::fmt::Display + 'static {
    /// Record kind reported in errors
    const KIND: RecordKind;

    /// Statuses reachable in one step
    fn allowed_targets(self) -> &'static [Self];

    fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    fn can_transition_to(self, to: Self) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Ok if `self -> to` is an edge, otherwise `InvalidTransition`
    fn check_transition(self, to: Self) -> Result<()> {
        if self.can_transition_to(to) {
            return Ok(());
        }
        Err(InvalidTransitionError {
            kind: Self::KIND,
            from: self.to_string(),
            to: to.to_string(),
            allowed: self
                .allowed_targets()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
        .into())
    }
}

impl Lifecycle for IdeaStatus {
    const KIND: RecordKind = RecordKind::Idea;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            IdeaStatus::Submitted => &[IdeaStatus::UnderReview],
            IdeaStatus::UnderReview => &[IdeaStatus::Approved, IdeaStatus::Rejected],
            IdeaStatus::Approved => &[IdeaStatus::Converted],
            IdeaStatus::Rejected | IdeaStatus::Converted => &[],
        }
    }
}

impl Lifecycle for EngagementStatus {
    const KIND: RecordKind = RecordKind::Engagement;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            EngagementStatus::Draft => &[EngagementStatus::Active, EngagementStatus::Cancelled],
            EngagementStatus::Active => &[
                EngagementStatus::Paused,
                EngagementStatus::Completed,
                EngagementStatus::Cancelled,
            ],
            EngagementStatus::Paused => &[EngagementStatus::Active, EngagementStatus::Cancelled],
            EngagementStatus::Completed | EngagementStatus::Cancelled => &[],
        }
    }
}

/// Next step of an idea on its way to conversion
///
/// Follows the approving branch only; `None` once the idea can no longer
/// be converted.
pub fn promotion_step(status: IdeaStatus) -> Option<IdeaStatus> {
    match status {
        IdeaStatus::Submitted => Some(IdeaStatus::UnderReview),
        IdeaStatus::UnderReview => Some(IdeaStatus::Approved),
        IdeaStatus::Approved => Some(IdeaStatus::Converted),
        IdeaStatus::Rejected | IdeaStatus::Converted => None,
    }
}
