//! Path template rendering.
//!
//! Templates name their parameters in braces, e.g.
//! `/channels/{channel_id}/messages/{message_id}`.

use std::collections::BTreeMap;

/// Path parameter carrying the channel scope of a bucket.
pub const CHANNEL_ID: &str = "channel_id";
/// Path parameter carrying the guild scope of a bucket.
pub const GUILD_ID: &str = "guild_id";

/// Names of every `{placeholder}` in a template, in order of appearance.
///
/// # Examples
///
/// ```
/// use sluice_core::placeholders;
///
/// let names = placeholders("/channels/{channel_id}/messages/{message_id}");
/// assert_eq!(names, vec!["channel_id", "message_id"]);
/// ```
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

/// Render a template, substituting the placeholders `lookup` resolves.
///
/// Placeholders `lookup` returns `None` for are left in place, braces included.
pub fn render<'a, F>(template: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match lookup(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Render a template with every parameter from `params`.
///
/// # Examples
///
/// ```
/// use sluice_core::render_all;
/// use std::collections::BTreeMap;
///
/// let mut params = BTreeMap::new();
/// params.insert("channel_id".to_string(), "41771983423143937".to_string());
/// assert_eq!(
///     render_all("/channels/{channel_id}/typing", &params),
///     "/channels/41771983423143937/typing"
/// );
/// ```
pub fn render_all(template: &str, params: &BTreeMap<String, String>) -> String {
    render(template, |name| params.get(name).map(String::as_str))
}
