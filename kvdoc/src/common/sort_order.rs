/// Specifies the direction for sorting documents.
///
/// # Variants
/// - `Ascending`: Sort from smallest to largest value (A to Z, 0 to 9)
/// - `Descending`: Sort from largest to smallest value (Z to A, 9 to 0)
///
/// # Usage
/// Used with `order_by()` when querying collections:
/// ```text
/// let options = order_by("age", SortOrder::Ascending);
/// let cursor = collection.find_with_options(filter!{ "role": "CTO" }, &options)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z)
    #[default]
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A)
    Descending,
}
