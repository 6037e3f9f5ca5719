//! Opaque ID newtypes for all model entities.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// ID of an expression node.
    ExprId, "e"
);

define_id!(
    /// ID of a statement.
    StmtId, "s"
);

define_id!(
    /// ID of a signal (wire, reg, event, genvar, parameter, port).
    SignalId, "sig"
);

define_id!(
    /// ID of a functional unit (module, function, task, named block).
    FunitId, "fu"
);

define_id!(
    /// ID of a generate item.
    GenItemId, "gi"
);

define_id!(
    /// ID of an elaborated instance.
    InstId, "inst"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        assert_eq!(ExprId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(GenItemId::from_raw(1));
        set.insert(GenItemId::from_raw(2));
        set.insert(GenItemId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(format!("{}", StmtId::from_raw(3)), "s3");
        assert_eq!(format!("{}", InstId::from_raw(0)), "inst0");
    }

    #[test]
    fn serde_is_bare_number() {
        let json = serde_json::to_string(&FunitId::from_raw(9)).unwrap();
        assert_eq!(json, "9");
    }
}
