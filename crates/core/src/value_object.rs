//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attribute values
/// (a manifest quantity, a supplier's contact details). To "modify" one, build
/// a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Quantity(i64);
///
/// impl ValueObject for Quantity {}
///
/// assert_eq!(Quantity(10), Quantity(10));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
