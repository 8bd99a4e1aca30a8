use async_trait::async_trait;
use serde::Deserialize;

use crate::turn::provision_error::ProvisionError;

/// Relay server plus the short-lived credentials issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayCredentials {
    pub username: String,
    pub password: String,
    /// `host:port` of the relay.
    #[serde(rename = "turn")]
    pub relay_host: String,
}

impl RelayCredentials {
    /// Parses `{"username": .., "password": .., "turn": ..}`. Extra keys are
    /// ignored.
    ///
    /// # Errors
    /// `Malformed` if a key is missing or the text is not JSON.
    pub fn from_json(body: &str) -> Result<Self, ProvisionError> {
        serde_json::from_str(body).map_err(|e| ProvisionError::Malformed(e.to_string()))
    }

    /// ICE url for this relay: `turn:<username>@<host>`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("turn:{}@{}", self.username, self.relay_host)
    }
}

/// Fetches relay credentials over whatever request/response transport the
/// application has. Only the response body matters here.
#[async_trait]
pub trait RelayCredentialProvider: Send + Sync {
    /// Returns the raw response body for `url`.
    async fn fetch_relay_credentials(&self, url: &str) -> Result<String, ProvisionError>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn parses_service_response() {
        let c = RelayCredentials::from_json(
            r#"{"username":"1700000000:ab12","password":"s3cr3t","turn":"10.0.0.5:3478","ttl":86400}"#,
        )
        .unwrap();
        assert_eq!(c.relay_host, "10.0.0.5:3478");
        assert_eq!(c.url(), "turn:1700000000:ab12@10.0.0.5:3478");

        assert!(matches!(
            RelayCredentials::from_json(r#"{"username":"x"}"#),
            Err(ProvisionError::Malformed(_))
        ));
    }
}
