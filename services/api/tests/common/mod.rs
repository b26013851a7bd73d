//! Test helpers: build the router over an in-memory config for integration tests.
//!
//! Run from workspace root: `cargo test -p api`.

#![allow(dead_code)]

use api_lib::adapters::ImageCrateDecoder;
use api_lib::config::{AuthConfig, Config, UploadLimits};
use api_lib::web::{auth::issue_token, router, state::AppState};
use async_trait::async_trait;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use axum::http::HeaderValue;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use site_report_core::{Bitmap, ImageAttachment, ImageDecoder, ReportResult};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "site-visit-2024";
pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub const MAX_IMAGE_BYTES: usize = 64 * 1024;
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;
pub const MAX_IMAGES: usize = 3;

/// Hashes with minimal Argon2 cost so tests stay fast.
fn cheap_hash(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        cors_allowed_origin: HeaderValue::from_static("http://localhost:3000"),
        auth: AuthConfig {
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password_hash: cheap_hash(ADMIN_PASSWORD),
            jwt_secret: JWT_SECRET.to_string(),
            token_ttl: Duration::minutes(30),
        },
        upload: UploadLimits {
            max_image_bytes: MAX_IMAGE_BYTES,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            max_images: MAX_IMAGES,
        },
    }
}

/// A server running the real adapters.
pub fn test_server() -> TestServer {
    let state = Arc::new(AppState::new(Arc::new(test_config())));
    TestServer::new(router(state)).expect("Failed to start test server")
}

/// A server whose image decoding goes through `decoder`.
pub fn test_server_with_decoder(decoder: Arc<dyn ImageDecoder>) -> TestServer {
    let state = AppState {
        image_decoder: decoder,
        ..AppState::new(Arc::new(test_config()))
    };
    TestServer::new(router(Arc::new(state))).expect("Failed to start test server")
}

/// Wraps the real decoder and counts how many attachments reach it.
#[derive(Default)]
pub struct CountingDecoder {
    inner: ImageCrateDecoder,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageDecoder for CountingDecoder {
    async fn decode(&self, attachment: ImageAttachment) -> ReportResult<Bitmap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(attachment).await
    }
}

/// A token signed with the test secret as if issued at `issued_at`.
pub fn token_issued_at(issued_at: DateTime<Utc>) -> String {
    issue_token(&test_config().auth, ADMIN_EMAIL, issued_at)
        .expect("Failed to sign test token")
        .0
}

pub fn valid_token() -> String {
    token_issued_at(Utc::now())
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// A solid-colour PNG encoded with the `image` crate.
pub fn png_fixture(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
    let buffer = ImageBuffer::from_pixel(width, height, Rgb(colour));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    bytes.into_inner()
}
