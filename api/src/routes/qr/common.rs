use base64::{Engine as _, engine::general_purpose::STANDARD};
use db::models::qr_token;
use qrcode::{QrCode, render::svg};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQrReq {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub subject_id: i64,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be within [-180, 180]"))]
    pub longitude: f64,
    #[validate(range(min = 0.1, message = "radius_meters must be positive"))]
    pub radius_meters: Option<f64>,
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0, message = "max_uses cannot be negative"))]
    pub max_uses: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ScanQrReq {
    pub token: String,
    pub latitude: f64,
    pub longitude: f64,
    pub selfie_image_url: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct GeoResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

#[derive(Debug, Serialize, Default)]
pub struct QrCodeResponse {
    pub id: i64,
    pub token: String,
    pub title: String,
    pub subject_id: i64,
    pub expires_at: String,
    pub geo: GeoResponse,
    /// Scannable rendering of the opaque token, as a base64 SVG data URI.
    pub qr_image: String,
}

impl QrCodeResponse {
    pub fn from_token(m: qr_token::Model, qr_image: String) -> Self {
        Self {
            id: m.id,
            token: m.token,
            title: m.title,
            subject_id: m.subject_id,
            expires_at: m.expires_at.to_rfc3339(),
            geo: GeoResponse {
                latitude: m.latitude,
                longitude: m.longitude,
                radius_meters: m.radius_meters,
            },
            qr_image,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct DeactivateResponse {
    pub id: i64,
    pub title: String,
    pub active: bool,
    pub present: i64,
    pub absent: i64,
}

/// Renders the opaque token as a QR image. The token string is the sole
/// payload of the code.
pub fn qr_image_data_uri(token: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(token.as_bytes())?;
    let image = code
        .render()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}
