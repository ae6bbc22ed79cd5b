//! # Composite Keys
//!
//! Auxiliary records (transfer agreements) live in the same partition as
//! the assets they refer to. To keep them from colliding with asset ids,
//! they are stored under composite keys:
//!
//! ```text
//! U+0000 tag U+0000 part_1 U+0000 ... part_n U+0000
//! ```
//!
//! The encoding is the one used by the surrounding ledger platform, so keys
//! written by other implementations decode here and vice versa. Plain keys
//! may never start with `U+0000`; that prefix is reserved for this
//! namespace. Range scans over plain keys therefore start at `U+0001`.

use crate::config::{COMPOSITE_KEY_DELIMITER, MAX_UNICODE_RUNE};
use crate::error::{LedgerError, LedgerResult};

/// Check that a tag or part may appear inside a composite key.
fn validate_component(component: &str) -> LedgerResult<()> {
    if component.contains(COMPOSITE_KEY_DELIMITER) || component.contains(MAX_UNICODE_RUNE) {
        return Err(LedgerError::InvalidKey(format!(
            "composite key component {component:?} contains a reserved character"
        )));
    }
    Ok(())
}

/// Encode a namespace tag and ordered parts into a single key.
///
/// # Example
///
/// ```
/// use cloister_protocol::storage::keys::create_composite_key;
///
/// let key = create_composite_key("transferAgreement", &["asset1"]).unwrap();
/// assert_eq!(key, "\u{0}transferAgreement\u{0}asset1\u{0}");
/// ```
pub fn create_composite_key<S: AsRef<str>>(tag: &str, parts: &[S]) -> LedgerResult<String> {
    if tag.is_empty() {
        return Err(LedgerError::InvalidKey(
            "composite key tag must be non-empty".into(),
        ));
    }
    validate_component(tag)?;

    let mut key = String::with_capacity(
        2 + tag.len() + parts.iter().map(|p| p.as_ref().len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_DELIMITER);
    key.push_str(tag);
    key.push(COMPOSITE_KEY_DELIMITER);
    for part in parts {
        let part = part.as_ref();
        validate_component(part)?;
        key.push_str(part);
        key.push(COMPOSITE_KEY_DELIMITER);
    }
    Ok(key)
}

/// Decode a composite key back into its tag and parts.
pub fn split_composite_key(key: &str) -> LedgerResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .ok_or_else(|| LedgerError::InvalidKey(format!("{key:?} is not a composite key")))?;
    let body = body
        .strip_suffix(COMPOSITE_KEY_DELIMITER)
        .ok_or_else(|| LedgerError::InvalidKey(format!("{key:?} is not terminated")))?;

    let mut components = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_string);
    let tag = components
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LedgerError::InvalidKey(format!("{key:?} has no tag")))?;
    Ok((tag, components.collect()))
}

/// Whether `key` lives in the composite-key namespace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_DELIMITER)
}

/// Validate a caller-supplied plain key such as an asset id.
pub fn validate_simple_key(key: &str) -> LedgerResult<()> {
    if key.is_empty() {
        return Err(LedgerError::InvalidKey("key must be non-empty".into()));
    }
    if is_composite_key(key) {
        return Err(LedgerError::InvalidKey(format!(
            "key {key:?} starts with the reserved composite-key prefix"
        )));
    }
    Ok(())
}
