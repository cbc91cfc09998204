use std::str::FromStr;

use anyhow::anyhow;

use crate::PostId;

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
pub enum GroupingMode {
    #[default]
    Week,
    Author,
    Location,
}

impl GroupingMode {
    pub const ALL: [GroupingMode; 3] = [
        GroupingMode::Week,
        GroupingMode::Author,
        GroupingMode::Location,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GroupingMode::Week => "week",
            GroupingMode::Author => "author",
            GroupingMode::Location => "location",
        }
    }
}

impl std::fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<GroupingMode> {
        GroupingMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown grouping mode {s:?}, expected week, author or location"))
    }
}

/// Order of the branches of a tree
///
/// Note that `Descending` yields branches in increasing key order, and
/// `Ascending` in decreasing key order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Branch {
    /// Human-readable label shared by all the posts of this branch
    pub key: String,

    /// Most recent post first
    pub post_ids: Vec<PostId>,
}

impl Branch {
    pub fn new(key: impl Into<String>, post_ids: Vec<PostId>) -> Branch {
        Branch {
            key: key.into(),
            post_ids,
        }
    }
}

pub type Tree = Vec<Branch>;
