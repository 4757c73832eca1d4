use serde::{Deserialize, Serialize};

/// Which match wins when one scanned region yields several numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    #[default]
    First,
    Last,
}

impl MatchPolicy {
    pub fn pick<T>(self, items: impl IntoIterator<Item = T>) -> Option<T> {
        match self {
            MatchPolicy::First => items.into_iter().next(),
            MatchPolicy::Last => items.into_iter().last(),
        }
    }
}

/// What the drawer controller does with a drawer after reading it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawerClosePolicy {
    #[default]
    LeaveOpen,
    CloseIfOpened,
}
