//! The store's search index cuts string values at the first `+`, so a filter
//! containing one never matches. Filters are cut the same way before they are
//! sent. Remove this module once the index handles `+`.

use tracing::warn;

use crate::error::{Error, Result};

/// Values whose `+` comes this early would match almost anything once cut.
const MIN_KEPT_CHARS: usize = 3;

pub(super) fn truncate(value: &str) -> Result<&str> {
    let Some(index) = value.find('+') else {
        return Ok(value);
    };
    let kept = &value[..index];
    if kept.chars().count() < MIN_KEPT_CHARS {
        return Err(Error::value(format!(
            "cannot use '{value}' as filter, contains invalid characters"
        )));
    }
    warn!(target: "kg::filter", value, truncated = kept, "truncating filter value");
    Ok(kept)
}
