//! Rate-limit bucket keys.
//!
//! The upstream API accounts rate limits per endpoint family, scoped by the
//! channel and guild a request touches. Other identifiers in the path (message
//! ids, user ids, emoji) do not split a bucket, so the key keeps them as
//! unsubstituted placeholders.

use crate::{CHANNEL_ID, GUILD_ID, Method, render};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Partition key for rate-limit accounting.
///
/// # Examples
///
/// ```
/// use sluice_core::{BucketPolicy, Method};
/// use std::collections::BTreeMap;
///
/// let mut params = BTreeMap::new();
/// params.insert("channel_id".to_string(), "C1".to_string());
/// params.insert("message_id".to_string(), "M1".to_string());
///
/// let key = BucketPolicy::default().derive(
///     Method::Delete,
///     "/channels/{channel_id}/messages/{message_id}",
///     &params,
/// );
/// assert_eq!(key.to_string(), "C1:none:/channels/C1/messages/{message_id}");
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_getters::Getters,
)]
pub struct BucketKey {
    /// Channel scope, when the route names one
    channel_id: Option<String>,
    /// Guild scope, when the route names one
    guild_id: Option<String>,
    /// Method, when the policy splits buckets by method
    method: Option<Method>,
    /// Template with only the scoping parameters substituted
    path: String,
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(method) = &self.method {
            write!(f, "{} ", method)?;
        }
        write!(
            f,
            "{}:{}:{}",
            self.channel_id.as_deref().unwrap_or("none"),
            self.guild_id.as_deref().unwrap_or("none"),
            self.path
        )
    }
}

/// How bucket keys are derived from a request.
///
/// Whether two methods on the same path share a bucket is not settled by the
/// upstream documentation, so it is a switch. The default shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketPolicy {
    /// Put the HTTP method in the key
    #[serde(default)]
    pub include_method: bool,
}

impl BucketPolicy {
    /// Policy that splits buckets by method.
    pub fn per_method() -> Self {
        Self {
            include_method: true,
        }
    }

    /// Derive the bucket key for a request.
    pub fn derive(
        &self,
        method: Method,
        template: &str,
        params: &BTreeMap<String, String>,
    ) -> BucketKey {
        let channel_id = params.get(CHANNEL_ID).cloned();
        let guild_id = params.get(GUILD_ID).cloned();
        let path = render(template, |name| match name {
            CHANNEL_ID => channel_id.as_deref(),
            GUILD_ID => guild_id.as_deref(),
            _ => None,
        });

        BucketKey {
            channel_id,
            guild_id,
            method: self.include_method.then_some(method),
            path,
        }
    }
}
