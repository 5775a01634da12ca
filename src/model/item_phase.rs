/// Phase definitions for the per-item pipeline
///
/// An item moves `Probing → Discovering → Fetching → Ingesting → Completing → Done`.
/// A failed probe is the only way out early, into `Abandoned`. A probe whose
/// page count cannot be read skips straight from `Discovering` to `Completing`.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemPhase {
    /// Fetching page 1 to learn the page count
    Probing,

    /// Reading the page count from the probe body
    Discovering,

    /// Fetching all pages concurrently
    Fetching,

    /// Parsing page bodies and inserting reviews
    Ingesting,

    /// Marking the item as crawled
    Completing,

    // ===== Terminal States =====
    /// The item was marked as crawled
    Done,

    /// The probe failed; the item stays eligible for the next run
    Abandoned,
}

impl ItemPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Abandoned)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: ItemPhase) -> bool {
        matches!(
            (self, next),
            (Self::Probing, Self::Discovering)
                | (Self::Probing, Self::Abandoned)
                | (Self::Discovering, Self::Fetching)
                | (Self::Discovering, Self::Completing)
                | (Self::Fetching, Self::Ingesting)
                | (Self::Ingesting, Self::Completing)
                | (Self::Completing, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probing => "probing",
            Self::Discovering => "discovering",
            Self::Fetching => "fetching",
            Self::Ingesting => "ingesting",
            Self::Completing => "completing",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for ItemPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
