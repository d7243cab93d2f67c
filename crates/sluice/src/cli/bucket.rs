//! The `bucket` command.

use sluice::{DispatchConfig, Method, RequestDescriptor, SluiceResult};

/// Print the bucket key a request would be serialized under.
pub fn show_bucket(
    config: &DispatchConfig,
    method: Method,
    template: &str,
    params: &[(String, String)],
) -> SluiceResult<()> {
    let mut builder = RequestDescriptor::builder();
    builder
        .method(method)
        .template(template)
        .policy(config.bucket_policy());
    for (name, value) in params {
        builder.param(name.as_str(), value);
    }
    let descriptor = builder.build()?;

    println!("path:   {}", descriptor.path());
    println!("bucket: {}", descriptor.bucket());
    Ok(())
}
