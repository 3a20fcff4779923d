//! Newtype IDs for type-safe document references.
//!
//! Documents are keyed by opaque strings. Use the `define_id!` macro to create
//! wrappers that prevent passing a `StoreId` where a `ProductId` is expected.

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `generate()` for a fresh UUID v4 based ID
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use souq_core::define_id;
/// define_id!(CartId);
/// define_id!(InvoiceId);
///
/// let cart = CartId::new("c-1");
/// let invoice = InvoiceId::generate();
/// assert_eq!(cart.as_str(), "c-1");
/// assert_eq!(invoice.as_str().len(), 36);
///
/// // These are different types, so this won't compile:
/// // let _: CartId = invoice;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().to_string())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(StoreId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(CouponId);
define_id!(ReviewId);
define_id!(WishlistItemId);

impl WishlistItemId {
    /// Deterministic wishlist item ID for a (user, product) pair.
    ///
    /// Using a composite key makes "add to wishlist" idempotent: a second add
    /// for the same product finds the existing document.
    #[must_use]
    pub fn for_pair(user_id: &UserId, product_id: &ProductId) -> Self {
        Self(format!("{user_id}_{product_id}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_transparent() {
        let id = StoreId::new("store-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"store-1\"");
        let parsed: StoreId = serde_json::from_str("\"store-1\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_wishlist_item_id_for_pair() {
        let id = WishlistItemId::for_pair(&UserId::new("u1"), &ProductId::new("p9"));
        assert_eq!(id.as_str(), "u1_p9");
    }
}
