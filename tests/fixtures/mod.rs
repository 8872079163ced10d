//! Test fixtures: images, CSV bodies and a throwaway service-account key.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// RSA key generated for tests only. Never registered with Google.
pub const SERVICE_ACCOUNT_PEM: &str = include_str!("service_account_key.pem");

/// Public half of [`SERVICE_ACCOUNT_PEM`], for checking signed assertions.
pub const SERVICE_ACCOUNT_PUBLIC_PEM: &str = include_str!("service_account_key.pub.pem");

pub const SERVICE_ACCOUNT_EMAIL: &str = "uploader@test-project.iam.gserviceaccount.com";

pub const CSV_HEADER: &str = "S. No.,Product Name,Input Image Urls";

/// A small PNG with enough variation to be worth compressing.
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(48, 32, |x, y| {
        Rgb([(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding should succeed");
    bytes
}

/// CSV body with one row per `(serial, name, url)`.
pub fn product_csv(rows: &[(i64, &str, &str)]) -> String {
    let mut csv = format!("{CSV_HEADER}\n");
    for (serial, name, url) in rows {
        csv.push_str(&format!("{serial},{name},{url}\n"));
    }
    csv
}

/// Service-account JSON key pointing at `token_uri`.
pub fn service_account_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "client_email": SERVICE_ACCOUNT_EMAIL,
        "private_key": SERVICE_ACCOUNT_PEM,
        "token_uri": token_uri,
    })
    .to_string()
}
