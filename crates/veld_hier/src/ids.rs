//! Opaque ID newtypes for all hierarchy entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`. IDs are created by
//! [`Arena::alloc`](crate::arena::Arena::alloc) and act as non-owning
//! references between nodes of the elaborated tree.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a registered definition.
    DefId
);

define_id!(
    /// Opaque, copyable ID for a configuration block.
    ConfigId
);

define_id!(
    /// Opaque, copyable ID for a source library.
    LibraryId
);

define_id!(
    /// Opaque, copyable ID for a symbol in the elaborated tree.
    SymbolId
);

define_id!(
    /// Opaque, copyable ID for an instance body.
    BodyId
);

define_id!(
    /// Opaque, copyable ID for a hierarchy-override trie node.
    OverrideNodeId
);

define_id!(
    /// Opaque, copyable ID for a per-traversal resolved configuration.
    ResolvedConfigId
);
