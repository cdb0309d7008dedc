//! Strongly typed identifier wrappers.
//!
//! Both IDs are `Copy + Ord + Hash` so they can be used as map keys and
//! sorted collection elements without ceremony.  `NodeId` wraps the OSM node
//! identifier as-is — node IDs are sparse external identities, not dense
//! array indices, so lookups go through hash maps keyed by the wrapper.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }
    };
}

typed_id! {
    /// OSM identifier of a road-network node.
    ///
    /// Non-negative in every real network.  The value `0` is never an OSM
    /// node and is reserved for the synthetic escape-tree root ([`NodeId::ROOT`]).
    pub struct NodeId(i64);
}

impl NodeId {
    /// The synthetic escape-tree root standing in for the last known position.
    pub const ROOT: NodeId = NodeId(0);

    /// `true` for the synthetic root, `false` for every real graph node.
    #[inline(always)]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

typed_id! {
    /// Identifier of a pursuer vehicle, unique within one planning request.
    pub struct VehicleId(u32);
}
