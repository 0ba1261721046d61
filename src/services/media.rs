//! Cloudinary image hosting
//!
//! Uploads and deletes are signed: the request parameters are sorted,
//! joined as `k=v&k=v`, suffixed with the API secret and hashed with SHA-256.

use std::collections::BTreeMap;

use axum::body::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image hosting is not configured")]
    NotConfigured,

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Cloudinary request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudinary returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// An image received in a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn validate(&self) -> Result<(), MediaError> {
        if !self.content_type.starts_with("image/") {
            return Err(MediaError::InvalidFile(format!("{} is not an image ({})", self.filename, self.content_type)));
        }
        if self.bytes.is_empty() {
            return Err(MediaError::InvalidFile(format!("{} is empty", self.filename)));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(MediaError::InvalidFile(format!("{} is larger than 5 MB", self.filename)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    config: Option<CloudinaryConfig>,
}

impl MediaService {
    pub fn new(http: reqwest::Client, config: Option<CloudinaryConfig>) -> Self { Self { http, config } }

    fn config(&self) -> Result<&CloudinaryConfig, MediaError> { self.config.as_ref().ok_or(MediaError::NotConfigured) }

    #[tracing::instrument(skip(self, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn upload(&self, upload: ImageUpload, folder: &str) -> Result<UploadedImage, MediaError> {
        upload.validate()?;
        let config = self.config()?;
        let timestamp = Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", timestamp);
        let signature = sign_params(&params, config.api_secret.expose_secret());

        let file = Part::bytes(upload.bytes.to_vec()).file_name(upload.filename).mime_str(&upload.content_type)?;
        let mut form = Form::new()
            .part("file", file)
            .text("api_key", config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = format!("https://api.cloudinary.com/v1_1/{}/image/upload", config.cloud_name);
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api { status: status.as_u16(), message });
        }
        let image: UploadedImage = response.json().await?;
        tracing::info!(public_id = %image.public_id, "Image uploaded");
        Ok(image)
    }

    pub async fn upload_all(&self, uploads: Vec<ImageUpload>, folder: &str) -> Result<Vec<String>, MediaError> {
        let mut urls = Vec::with_capacity(uploads.len());
        for upload in uploads {
            urls.push(self.upload(upload, folder).await?.secure_url);
        }
        Ok(urls)
    }

    /// Deletes the asset behind a delivery URL. URLs not hosted here are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn destroy_by_url(&self, url: &str) -> Result<(), MediaError> {
        let Some(public_id) = public_id_from_url(url) else { return Ok(()) };
        let config = self.config()?;
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id);
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign_params(&params, config.api_secret.expose_secret());

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let url = format!("https://api.cloudinary.com/v1_1/{}/image/destroy", config.cloud_name);
        let response = self.http.post(url).form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(MediaError::Api { status, message: response.text().await.unwrap_or_default() });
        }
        Ok(())
    }
}

pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// `https://res.cloudinary.com/<cloud>/image/upload/v123/banners/abc.jpg` -> `banners/abc`
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = match rest.split_once('/') {
        Some((first, tail)) if first.starts_with('v') && first[1..].chars().all(|c| c.is_ascii_digit()) && first.len() > 1 => tail,
        _ => rest,
    };
    let id = match rest.rsplit_once('.') {
        Some((stem, _ext)) if !stem.ends_with('/') => stem,
        _ => rest,
    };
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload { filename: "a.png".into(), content_type: content_type.into(), bytes: Bytes::from(vec![0u8; len]) }
    }

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1712/banners/abc.jpg").as_deref(), Some("banners/abc"));
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/sample.png").as_deref(), Some("sample"));
        assert_eq!(public_id_from_url("https://cdn.example.com/a.png"), None);
    }

    #[test]
    fn test_signature_is_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("timestamp", "1315060510".to_string());
        a.insert("folder", "banners".to_string());
        let mut b = BTreeMap::new();
        b.insert("folder", "banners".to_string());
        b.insert("timestamp", "1315060510".to_string());
        assert_eq!(sign_params(&a, "secret"), sign_params(&b, "secret"));
        assert_ne!(sign_params(&a, "secret"), sign_params(&a, "other"));
        assert_eq!(sign_params(&a, "secret").len(), 64);
    }

    #[test]
    fn test_validate_upload() {
        assert!(upload("image/png", 10).validate().is_ok());
        assert!(matches!(upload("application/pdf", 10).validate(), Err(MediaError::InvalidFile(_))));
        assert!(upload("image/png", 0).validate().is_err());
        assert!(upload("image/png", MAX_IMAGE_BYTES + 1).validate().is_err());
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let media = MediaService::new(reqwest::Client::new(), None);
        assert!(matches!(media.upload(upload("image/png", 10), "banners").await, Err(MediaError::NotConfigured)));
    }
}
