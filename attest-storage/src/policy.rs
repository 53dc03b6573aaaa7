//! The fixed sensitivity-to-policy table.

use serde::{Deserialize, Serialize};

/// Sensitivity classification of a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Public,
    Internal,
    Confidential,
    Restricted,
}

/// Which tier a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// Survives across sessions.
    Durable,
    /// Cleared at session end.
    Session,
}

/// Storage policy for a classification. Callers cannot override it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoragePolicy {
    pub encrypt: bool,
    pub tier: Tier,
}

impl Sensitivity {
    /// The fixed policy table. Restricted data is always encrypted and
    /// session-scoped; confidential data is encrypted but durable.
    pub fn policy(self) -> StoragePolicy {
        match self {
            Sensitivity::Public | Sensitivity::Internal => StoragePolicy {
                encrypt: false,
                tier: Tier::Durable,
            },
            Sensitivity::Confidential => StoragePolicy {
                encrypt: true,
                tier: Tier::Durable,
            },
            Sensitivity::Restricted => StoragePolicy {
                encrypt: true,
                tier: Tier::Session,
            },
        }
    }
}
