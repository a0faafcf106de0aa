//! Text normalization for searchable fields.
//!
//! Every free-text value that ends up in the index goes through the same fold:
//! lowercase, canonical decomposition (NFD), removal of combining marks, trim.
//! Queries built against those fields must use the same function so that
//! `"Crème"` and `"creme"` meet in the middle.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a string into its searchable form.
///
/// The result is a fixed point: `normalize_text(&normalize_text(s)) == normalize_text(s)`.
///
/// # Example
///
/// ```
/// use order_sync_shared::normalize_text;
///
/// assert_eq!(normalize_text("  Nguyễn Văn Ánh "), "nguyen van anh");
/// ```
pub fn normalize_text(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}
