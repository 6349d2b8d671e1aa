//! The seam between the collector and whatever produces rendered HTML.

use std::time::Duration;

use async_trait::async_trait;

use crate::Error;

/// Anything that can turn a URL into the HTML a browser would see.
///
/// An empty string means "no HTML for this page"; callers treat it the same
/// as an error and stop paginating.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    async fn fetch_rendered(&self, url: &str, timeout: Duration) -> Result<String, Error>;
}
