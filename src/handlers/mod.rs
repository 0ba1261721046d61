//! HTTP handlers, one module per resource.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::ImageUpload;

pub mod admin;
pub mod auth;
pub mod banners;
pub mod cart;
pub mod categories;
pub mod favourites;
pub mod health;
pub mod newsletter;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reports;
pub mod reviews;
pub mod users;

/// `{"success": true, "message"?: ..., "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self { Self { success: true, message: None, data } }
    pub fn with_message(message: &'static str, data: T) -> Self { Self { success: true, message: Some(message), data } }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response { Json(self).into_response() }
}

/// JSON body whose rejections render as [`ApiError`] (400) instead of axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Runs the `validator` rules of a deserialized body.
pub fn validated<T: validator::Validate>(body: T) -> ApiResult<T> {
    body.validate()?;
    Ok(body)
}

/// Text fields and image files of a multipart request.
#[derive(Debug, Default)]
pub struct FormParts {
    fields: HashMap<String, String>,
    files: Vec<(String, ImageUpload)>,
}

impl FormParts {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut parts = FormParts::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        parts.files.push((name, ImageUpload { filename, content_type, bytes }));
                    }
                }
                None => {
                    let value = field.text().await?;
                    parts.fields.insert(name, value);
                }
            }
        }
        Ok(parts)
    }

    /// A non-blank text field, trimmed.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
    }

    pub fn required(&self, name: &str) -> ApiResult<String> {
        self.text(name).ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        self.text(name)
            .map(|v| v.parse::<T>().map_err(|_| ApiError::BadRequest(format!("Invalid value for {}", name))))
            .transpose()
    }

    /// A field carrying a JSON document, e.g. `variants` or `address`.
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> ApiResult<Option<T>> {
        self.text(name)
            .map(|v| serde_json::from_str::<T>(&v).map_err(|e| ApiError::BadRequest(format!("Invalid {}: {}", name, e))))
            .transpose()
    }

    pub fn take_images(&mut self, field: &str) -> Vec<ImageUpload> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files).into_iter().partition(|(name, _)| name == field);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }
}

/// Caller address: first `X-Forwarded-For` hop, else the socket peer.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(forwarded_for(&parts.headers).or(peer)))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
