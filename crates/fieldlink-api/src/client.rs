// Radio HTTP client
//
// Wraps `reqwest::Client` with the radio's URL layout and response
// handling. The radio speaks plain HTTP with no auth, so the transport
// concerns here are timeouts and turning non-2xx responses into typed
// errors that preserve the body text.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ConfigurationPayload, RadioUpdate};

/// HTTP client for one field radio.
///
/// Cheap to clone; all clones share the underlying connection pool. Every
/// request carries the client-wide timeout, so a wedged radio surfaces as
/// [`Error::Transport`] instead of a hung caller.
#[derive(Debug, Clone)]
pub struct RadioClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RadioClient {
    /// Create a client for the radio at `base_url` (e.g. `http://10.0.100.2`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// The radio base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch and validate one full status snapshot (`GET /status`).
    ///
    /// The raw body is decoded fail-closed and then structurally
    /// validated; any failure rejects the snapshot wholesale.
    pub async fn status(&self) -> Result<RadioUpdate, Error> {
        let url = self.url("/status")?;
        debug!(%url, "GET status");
        let body = self.checked(self.http.get(url).send().await?).await?;

        let update: RadioUpdate =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;
        update.validate()?;
        Ok(update)
    }

    /// Apply a configuration (`POST /configuration`).
    pub async fn post_configuration(&self, payload: &ConfigurationPayload) -> Result<(), Error> {
        let url = self.url("/configuration")?;
        debug!(%url, "POST configuration");
        self.checked(self.http.post(url).json(payload).send().await?)
            .await?;
        Ok(())
    }

    /// Kick off a channel scan (`GET /scan/start`).
    pub async fn scan_start(&self) -> Result<(), Error> {
        let url = self.url("/scan/start")?;
        debug!(%url, "GET scan start");
        self.checked(self.http.get(url).send().await?).await?;
        Ok(())
    }

    /// Fetch the current scan report as plain text (`GET /scan/result`).
    pub async fn scan_result(&self) -> Result<String, Error> {
        let url = self.url("/scan/result")?;
        debug!(%url, "GET scan result");
        self.checked(self.http.get(url).send().await?).await
    }

    /// Read the body, turning a non-2xx status into [`Error::Api`].
    async fn checked(&self, response: reqwest::Response) -> Result<String, Error> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
