use std::{sync::Arc, time::Duration};

use crate::{
    ice::{IceConfig, IceServer},
    log::LogSink,
    sink_info, sink_warn,
    turn::{
        provision_error::ProvisionError,
        relay_credentials::{RelayCredentialProvider, RelayCredentials},
    },
    util,
};

const REQUEST_USERNAME_LEN: usize = 10;

/// Makes sure `ice` has a TURN server before any endpoint is built.
///
/// Nothing is requested when one is already configured. Otherwise asks
/// `provider` for `<base_url>?username=<random>` and appends the relay it
/// returns. Returns whether a server was added.
///
/// # Errors
/// `Timeout` when the provider does not answer within `timeout`, or
/// whatever the provider or the response parsing reports. `ice` is left
/// untouched on error.
pub async fn provision_relay(
    ice: &mut IceConfig,
    provider: &dyn RelayCredentialProvider,
    base_url: &str,
    timeout: Duration,
    logger: &Arc<dyn LogSink>,
) -> Result<bool, ProvisionError> {
    if ice.has_turn() {
        sink_info!(logger, "TURN server already configured");
        return Ok(false);
    }

    let url = format!(
        "{base_url}?username={}",
        util::random_base36(REQUEST_USERNAME_LEN)
    );
    sink_info!(logger, "Getting TURN server from {base_url}");
    let body = match tokio::time::timeout(timeout, provider.fetch_relay_credentials(&url)).await {
        Ok(response) => response,
        Err(_) => Err(ProvisionError::Timeout(timeout)),
    }
    .inspect_err(|e| sink_warn!(logger, "{e}"))?;
    let creds = RelayCredentials::from_json(&body).inspect_err(|e| sink_warn!(logger, "{e}"))?;

    sink_info!(logger, "Got TURN server: {}", creds.url());
    ice.servers.push(IceServer {
        urls: creds.url(),
        username: Some(creds.username),
        credential: Some(creds.password),
    });
    Ok(true)
}
