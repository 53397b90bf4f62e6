/// Walk state definitions for one chapter's page traversal
///
/// A chapter walk cycles `Fetching -> Extracting -> Advancing` once per page
/// and leaves the cycle through `Done`.
use std::fmt;

/// Represents where a chapter walk currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    /// Retrieving the current page document
    Fetching,

    /// Pulling the image URL and navigation link out of the document
    Extracting,

    /// Deciding whether the navigation link continues the chapter
    Advancing,

    /// The chapter is complete (terminal)
    Done,
}

impl WalkState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// `Extracting -> Done` covers pages without a navigation link.
    pub fn can_transition_to(&self, next: WalkState) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Fetching, Self::Extracting)
                | (Self::Extracting, Self::Advancing)
                | (Self::Extracting, Self::Done)
                | (Self::Advancing, Self::Fetching)
                | (Self::Advancing, Self::Done)
        )
    }

    /// Short lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Advancing => "advancing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a chapter walk reached `Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The navigation link pointed back to the chapter index
    IndexLink,

    /// The last page had no navigation link at all
    NoNavigation,
}
