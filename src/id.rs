//! Identifier types.
//!
//! Items, rarities and gachas are all keyed by caller-supplied strings.
//! Each gets its own interned `Arc<str>` newtype so they cannot be mixed
//! up, and so clones made while building pools and tallies stay cheap.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a new identifier from a string slice.
            pub fn from_str(s: &str) -> Self {
                Self(Arc::from(s))
            }

            /// Get the string representation of this identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok($name::from(s))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_str(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a catalog item.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use gachaplan::ItemId;
    ///
    /// let a = ItemId::from_str("item-001");
    /// let b: ItemId = "item-001".into();
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "item-001");
    /// ```
    ItemId
);

define_id!(
    /// Identifier of a rarity tier (for example `"SSR"`).
    RarityId
);

define_id!(
    /// Identifier of a gacha (one catalog with its own rarity list).
    GachaId
);
