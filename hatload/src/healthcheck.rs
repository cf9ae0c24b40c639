//! Single-request liveness check against the storefront.

use anyhow::{Context, Result};

use crate::http::{HttpRemote, Response};

/// Requests the storefront homepage once.
///
/// Fails if the storefront is unreachable or answers with a status of 400 or above.
pub async fn healthcheck(remote: &HttpRemote) -> Result<Response> {
    tracing::debug!("sending healthcheck request to {}", remote.url("/"));
    let response = remote
        .get("/")
        .await
        .with_context(|| format!("healthcheck against {} failed", remote.host()))?;

    tracing::info!(status = %response.status, "OK");
    Ok(response)
}
