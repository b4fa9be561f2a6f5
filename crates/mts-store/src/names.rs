//! Topic name validation and the topic <-> filename mapping.
//!
//! Valid topic names:
//! - Must be non-empty
//! - Must not contain a path separator (`/` or `\`)
//! - Must not contain control characters (tabs, newlines, NUL)
//! - Must not contain the reserved log file suffix
//!
//! A topic `cpu` is stored as `cpu.topic.metrics.data.txt`.

use crate::error::{StoreError, StoreResult};

/// Suffix appended to a topic name to form its log filename.
pub const TOPIC_FILE_SUFFIX: &str = ".topic.metrics.data.txt";

/// Characters that are forbidden anywhere in a topic name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\'];

/// Validate a topic name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use mts_store::names::validate_topic_name;
///
/// assert!(validate_topic_name("cpu").is_ok());
/// assert!(validate_topic_name("host-1.load").is_ok());
/// assert!(validate_topic_name("").is_err());
/// assert!(validate_topic_name("../etc").is_err());
/// ```
pub fn validate_topic_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "topic name must not be empty".into()));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains path separator: {ch:?}")));
        }
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(invalid(name, format!("contains control character: {ch:?}")));
    }

    if name.contains(TOPIC_FILE_SUFFIX) {
        return Err(invalid(
            name,
            format!("must not contain the reserved suffix {TOPIC_FILE_SUFFIX:?}"),
        ));
    }

    Ok(())
}

/// Map a topic name to its log filename.
pub fn encode(topic: &str) -> StoreResult<String> {
    validate_topic_name(topic)?;
    Ok(format!("{topic}{TOPIC_FILE_SUFFIX}"))
}

/// Map a log filename back to its topic name.
///
/// Returns `None` for any filename [`encode`] could not have produced, so
/// directory listings can skip foreign files.
pub fn decode(file_name: &str) -> Option<&str> {
    let topic = file_name.strip_suffix(TOPIC_FILE_SUFFIX)?;
    validate_topic_name(topic).ok()?;
    Some(topic)
}

fn invalid(name: &str, reason: String) -> StoreError {
    StoreError::InvalidTopicName {
        name: name.to_string(),
        reason,
    }
}
