//! Request path rendering for the wire.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sluice_core::{RequestDescriptor, render_all};
use std::collections::BTreeMap;

/// Bytes left unescaped in a path parameter: the RFC 3986 unreserved set.
const SEGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode one path parameter value.
///
/// # Example
///
/// ```
/// use sluice_http::encode_segment;
///
/// assert_eq!(encode_segment("41771983423143937"), "41771983423143937");
/// assert_eq!(encode_segment("blob:123"), "blob%3A123");
/// assert_eq!(encode_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
/// ```
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT_SAFE).to_string()
}

/// The descriptor's path with every parameter value percent-encoded.
///
/// The bucket key keeps the raw values; only the sent path is encoded.
pub(crate) fn wire_path(descriptor: &RequestDescriptor) -> String {
    let encoded: BTreeMap<String, String> = descriptor
        .params()
        .iter()
        .map(|(name, value)| (name.clone(), encode_segment(value)))
        .collect();
    render_all(descriptor.template(), &encoded)
}
