//! HTTP methods accepted by the dispatcher.

use serde::{Deserialize, Serialize};

/// HTTP request method.
///
/// # Examples
///
/// ```
/// use sluice_core::Method;
/// use std::str::FromStr;
///
/// assert_eq!(Method::from_str("patch").unwrap(), Method::Patch);
/// assert_eq!(Method::Delete.to_string(), "DELETE");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Uppercase wire name of the method.
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}
