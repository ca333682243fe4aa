//! Tree node types stored in a [`Workspace`](crate::Workspace) arena.

mod entry;
mod group;

pub use entry::{Entry, CANONICAL_PROPERTIES};
pub use group::Group;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! node_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Parse a transport identifier. Malformed strings yield `None`,
            /// which callers treat the same as an unknown id.
            pub fn parse(s: &str) -> Option<Self> {
                Uuid::parse_str(s.trim()).ok().map(Self)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }
    };
}

node_id!(
    /// Identifier of a [`Group`].
    GroupId
);

node_id!(
    /// Identifier of an [`Entry`].
    EntryId
);
