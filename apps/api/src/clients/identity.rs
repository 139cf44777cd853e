/// Identity store client. The auth gateway resolves callers on the way in;
/// this client writes the free-usage counter back after a successful
/// usage-gated generation.
///
/// The read (gateway header) and this write are not a single atomic operation;
/// see `quota` for the accepted race.
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity store error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Stores the caller's new free-usage count.
    pub async fn set_free_usage(&self, user_id: &str, free_usage: u32) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(format!("{}/users/{}/free-usage", self.base_url, user_id))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "free_usage": free_usage }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
