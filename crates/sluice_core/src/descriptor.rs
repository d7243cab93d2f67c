//! Request descriptors handed to the dispatcher.

use crate::{BucketKey, BucketPolicy, Method, placeholders, render_all};
use serde_json::Value as JsonValue;
use sluice_error::{BuilderError, BuilderErrorKind};
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything the dispatcher needs to send one logical call.
///
/// Descriptors are immutable once built. The bucket key is derived once, at
/// build time, from the method, template and scoping parameters.
///
/// # Examples
///
/// ```
/// use sluice_core::{Method, RequestDescriptor};
///
/// let descriptor = RequestDescriptor::builder()
///     .method(Method::Post)
///     .template("/channels/{channel_id}/messages")
///     .param("channel_id", 41771983423143937u64)
///     .body(serde_json::json!({ "content": "hello" }))
///     .reason("welcome message")
///     .build()?;
///
/// assert_eq!(descriptor.path(), "/channels/41771983423143937/messages");
/// assert_eq!(descriptor.bucket().channel_id().as_deref(), Some("41771983423143937"));
/// # Ok::<(), sluice_error::BuilderError>(())
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct RequestDescriptor {
    /// HTTP method.
    method: Method,

    /// Path template, e.g. `/channels/{channel_id}/messages/{message_id}`.
    template: String,

    /// Values for the template's placeholders.
    #[builder(default, setter(custom))]
    params: BTreeMap<String, String>,

    /// Query string pairs, in order.
    #[builder(default, setter(custom))]
    query: Vec<(String, String)>,

    /// JSON request body.
    #[builder(default, setter(into, strip_option))]
    body: Option<JsonValue>,

    /// Audit-log reason, sent percent-encoded.
    #[builder(default, setter(into, strip_option))]
    reason: Option<String>,

    /// Extra headers, overriding the standing ones on conflict.
    #[builder(default, setter(custom))]
    headers: BTreeMap<String, String>,

    /// Deadline for the whole call, retries included.
    #[builder(default, setter(into, strip_option))]
    timeout: Option<Duration>,

    /// Policy used to derive [`RequestDescriptor::bucket`].
    #[builder(default)]
    policy: BucketPolicy,

    /// Derived rate-limit bucket.
    #[builder(setter(skip))]
    bucket: BucketKey,
}

impl RequestDescriptor {
    /// Creates a new descriptor builder.
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    /// Shorthand for a descriptor with no parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the template contains placeholders.
    pub fn new(method: Method, template: impl Into<String>) -> Result<Self, BuilderError> {
        Self::builder().method(method).template(template).build()
    }

    /// Path with every parameter substituted.
    pub fn path(&self) -> String {
        render_all(&self.template, &self.params)
    }
}

impl RequestDescriptorBuilder {
    /// Set one path parameter.
    pub fn param(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.to_string());
        self
    }

    /// Append one query pair.
    pub fn query(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.to_string()));
        self
    }

    /// Set one extra header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Build the descriptor and derive its bucket key.
    ///
    /// # Errors
    ///
    /// Returns an error if the method or template is missing, or if a template
    /// placeholder has no parameter.
    pub fn build(&self) -> Result<RequestDescriptor, BuilderError> {
        let mut descriptor = self.build_internal().map_err(|e| match e {
            RequestDescriptorBuilderError::UninitializedField(field) => {
                BuilderError::new(BuilderErrorKind::MissingField(field.to_string()))
            }
            other => BuilderError::new(BuilderErrorKind::ValidationFailed(other.to_string())),
        })?;

        if let Some(name) = placeholders(&descriptor.template)
            .into_iter()
            .find(|name| !descriptor.params.contains_key(*name))
        {
            return Err(BuilderError::new(BuilderErrorKind::UnresolvedParameter {
                name: name.to_string(),
                template: descriptor.template.clone(),
            }));
        }

        descriptor.bucket =
            descriptor
                .policy
                .derive(descriptor.method, &descriptor.template, &descriptor.params);
        Ok(descriptor)
    }
}
