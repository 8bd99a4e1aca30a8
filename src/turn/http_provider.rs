use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::turn::{provision_error::ProvisionError, relay_credentials::RelayCredentialProvider};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Plain HTTP GET against the credential service.
#[derive(Debug, Clone)]
pub struct HttpCredentialProvider {
    client: Client,
}

impl HttpCredentialProvider {
    /// `timeout` bounds a whole request. The caller's own deadline still
    /// applies on top of it.
    ///
    /// # Errors
    /// `Fetch` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| ProvisionError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RelayCredentialProvider for HttpCredentialProvider {
    async fn fetch_relay_credentials(&self, url: &str) -> Result<String, ProvisionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProvisionError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Fetch(format!("service answered {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| ProvisionError::Fetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::ice::IceConfig;
    use crate::log::{LogSink, NoopLogSink};
    use crate::turn::provision_relay;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    /// Serves one connection on a loopback port. `reply` of `None` accepts
    /// and then never answers.
    fn serve_once(reply: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2048];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    return;
                }
                seen.extend_from_slice(&buf[..n]);
            }
            match reply {
                Some(raw) => {
                    let _ = stream.write_all(raw.as_bytes());
                }
                None => thread::sleep(Duration::from_secs(5)),
            }
        });
        format!("http://{addr}/turn")
    }

    const OK_REPLY: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
        Content-Length: 56\r\nConnection: close\r\n\r\n\
        {\"username\":\"u1\",\"password\":\"p1\",\"turn\":\"10.0.0.9:3478\"}";

    #[tokio::test]
    async fn returns_the_response_body() {
        let url = serve_once(Some(OK_REPLY));
        let provider = HttpCredentialProvider::new(Duration::from_secs(2)).unwrap();
        let body = provider.fetch_relay_credentials(&url).await.unwrap();
        assert!(body.contains("\"turn\":\"10.0.0.9:3478\""));
    }

    #[tokio::test]
    async fn error_status_is_a_fetch_failure() {
        let url = serve_once(Some(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ));
        let provider = HttpCredentialProvider::new(Duration::from_secs(2)).unwrap();
        let err = provider.fetch_relay_credentials(&url).await.unwrap_err();
        assert!(
            matches!(err, ProvisionError::Fetch(ref m) if m.contains("503")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn refused_connection_is_a_fetch_failure() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let provider = HttpCredentialProvider::new(Duration::from_secs(2)).unwrap();
        let err = provider
            .fetch_relay_credentials(&format!("http://127.0.0.1:{port}/turn"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Fetch(_)));
    }

    #[tokio::test]
    async fn silent_service_times_out_and_leaves_ice_untouched() {
        let url = serve_once(None);
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let provider = HttpCredentialProvider::new(Duration::from_secs(5)).unwrap();
        let mut ice = IceConfig::default();
        let before = ice.servers.len();

        let err = provision_relay(
            &mut ice,
            &provider,
            &url,
            Duration::from_millis(150),
            &logger,
        )
        .await
        .unwrap_err();

        assert_eq!(err, ProvisionError::Timeout(Duration::from_millis(150)));
        assert_eq!(ice.servers.len(), before);
    }
}
