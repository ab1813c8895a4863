//! DR resource naming

use crate::{CoreError, Result};
use drsite_api::DR_SUFFIX;

/// Longest resource name GCP accepts (RFC 1035 label)
pub const MAX_NAME_LEN: usize = 63;

/// DR counterpart of a resource name.
///
/// Names already carrying the suffix are returned unchanged, so applying
/// this twice gives the same result as applying it once.
pub fn dr_name(name: &str) -> Result<String> {
    let renamed = with_suffix(name);
    if renamed.len() > MAX_NAME_LEN {
        return Err(CoreError::TransformPolicy(format!(
            "DR name '{}' exceeds {} characters",
            renamed, MAX_NAME_LEN
        )));
    }
    Ok(renamed)
}

/// Suffix free-form labels (display names); empty labels stay empty
pub fn dr_label(label: &str) -> String {
    if label.is_empty() {
        return String::new();
    }
    with_suffix(label)
}

fn with_suffix(name: &str) -> String {
    if name.ends_with(DR_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, DR_SUFFIX)
    }
}
