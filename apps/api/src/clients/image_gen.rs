/// Text-to-image client. Posts the prompt as a multipart form and receives the
/// generated image as raw bytes.
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Upper bound on the image response body.
pub const MAX_IMAGE_BYTES: usize = 15 * 1024 * 1024;
/// Image generation is slow; everything else uses client defaults.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image generation failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response received from image generation service")]
    EmptyResponse,

    #[error("Image response exceeded {MAX_IMAGE_BYTES} bytes")]
    TooLarge,
}

impl ImageGenError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ImageGenError::Api { status, .. } => Some(*status),
            ImageGenError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ImageGenError::Http(e) if e.is_timeout())
    }
}

#[derive(Clone)]
pub struct ImageGenClient {
    client: Client,
    url: String,
    api_key: String,
}

impl ImageGenClient {
    pub fn new(url: String, api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            url,
            api_key,
        })
    }

    /// Generates an image for `prompt` (already trimmed by the caller).
    /// Statuses in [200,500) are read for inspection; anything but 200 becomes
    /// an `Api` error carrying the upstream status and body text.
    pub async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageGenError> {
        let form = reqwest::multipart::Form::new().text("prompt", prompt.to_string());

        let mut response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("accept", "image/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Read the body in chunks so an oversized response is dropped as soon
        // as it crosses the cap, not after it has been fully buffered.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(ImageGenError::TooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ImageGenError::EmptyResponse);
        }

        debug!("Image generated ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = ImageGenError::Api {
            status: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_timeout());
    }

    #[test]
    fn non_api_errors_have_no_status() {
        assert_eq!(ImageGenError::EmptyResponse.status(), None);
        assert_eq!(ImageGenError::TooLarge.status(), None);
    }

    async fn serve_image(body: Vec<u8>) -> String {
        let app = axum::Router::new().route(
            "/text-to-image",
            axum::routing::post(move || async move { body }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/text-to-image")
    }

    #[tokio::test]
    async fn generate_returns_body_within_cap() {
        let url = serve_image(vec![7u8; 64]).await;
        let client = ImageGenClient::new(url, "test-key".to_string()).unwrap();
        let bytes = client.generate("a lighthouse").await.unwrap();
        assert_eq!(bytes, vec![7u8; 64]);
    }

    #[tokio::test]
    async fn generate_aborts_oversized_response() {
        let url = serve_image(vec![0u8; MAX_IMAGE_BYTES + 1]).await;
        let client = ImageGenClient::new(url, "test-key".to_string()).unwrap();
        assert!(matches!(
            client.generate("a lighthouse").await,
            Err(ImageGenError::TooLarge)
        ));
    }
}
