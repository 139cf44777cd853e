/// Asset host client: signed image uploads with optional transformations
/// (Cloudinary-compatible upload API).
use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Folder generated images are uploaded into.
pub const GENERATED_IMAGES_FOLDER: &str = "ai-generated-images";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Asset host error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Asset host response missing secure_url")]
    MissingUrl,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Clone)]
pub struct AssetClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl AssetClient {
    pub fn new(base_url: String, cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// Uploads raw image bytes (a generated PNG) and returns the secure URL.
    pub async fn upload_image_bytes(
        &self,
        bytes: Vec<u8>,
        folder: &str,
    ) -> Result<String, AssetError> {
        let mut params = BTreeMap::new();
        params.insert("folder".to_string(), folder.to_string());
        self.upload(bytes, "image.png", params).await
    }

    /// Uploads an image with the object-removal transformation applied by the
    /// asset host, returning the URL of the transformed asset.
    pub async fn upload_with_object_removal(
        &self,
        bytes: Vec<u8>,
        object: &str,
    ) -> Result<String, AssetError> {
        let mut params = BTreeMap::new();
        params.insert(
            "transformation".to_string(),
            removal_transformation(object),
        );
        self.upload(bytes, "image.png", params).await
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<String, AssetError> {
        params.insert(
            "timestamp".to_string(),
            chrono::Utc::now().timestamp().to_string(),
        );
        let signature = sign_params(&params, &self.api_secret);

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(filename.to_string())
                .mime_str("image/png")
                .map_err(AssetError::Http)?,
        );
        for (key, value) in params {
            form = form.text(key, value);
        }
        form = form
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(format!(
                "{}/v1_1/{}/image/upload",
                self.base_url, self.cloud_name
            ))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let upload: UploadResponse = response.json().await?;
        let url = upload.secure_url.ok_or(AssetError::MissingUrl)?;
        debug!("Asset uploaded: {url}");
        Ok(url)
    }
}

/// Upload transformation that removes the labeled object from the image.
pub fn removal_transformation(object: &str) -> String {
    format!("e_gen_remove:{}", object.trim())
}

/// Signs upload parameters: keys sorted, joined `k=v&k=v`, secret appended,
/// SHA-256 hex digest. Excludes `file`, `api_key`, and the signature itself.
fn sign_params(params: &BTreeMap<String, String>, secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let digest = Sha256::digest(format!("{to_sign}{secret}").as_bytes());
    hex::encode(digest)
}
