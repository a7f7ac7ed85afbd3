//! Common types used across CDP

use crate::error::CommonError;
use serde::{Deserialize, Serialize};

/// A catalog collection, one per dump archive.
///
/// Every dump release ships one archive per collection; the archive root
/// element carries the collection name and each direct child of the root is
/// one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Artists,
    Labels,
    Masters,
    Releases,
}

impl Collection {
    /// All known collections, in import order.
    pub const ALL: [Collection; 4] = [
        Collection::Artists,
        Collection::Labels,
        Collection::Masters,
        Collection::Releases,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Artists => "artists",
            Collection::Labels => "labels",
            Collection::Masters => "masters",
            Collection::Releases => "releases",
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "artists" => Ok(Collection::Artists),
            "labels" => Ok(Collection::Labels),
            "masters" => Ok(Collection::Masters),
            "releases" => Ok(Collection::Releases),
            _ => Err(CommonError::UnknownCollection(s.to_string())),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
