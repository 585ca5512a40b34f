//! Request/response shapes of the Cync REST collaborator.
//!
//! The core never issues these calls itself: credential refresh and the
//! device inventory belong to the host adapter. The shapes live here so
//! both sides of the boundary agree on the wire format.

use serde::{Deserialize, Serialize};

pub const API_BASE: &str = "https://api.gelighting.com/v2";

/// Vendor tenant id sent with every two-factor request.
pub const CORP_ID: &str = "1007d2ad150c4000";

/// `POST {API_BASE}/user/token/refresh`
#[derive(Clone, Debug, Serialize)]
pub struct TokenRefreshRequest {
    pub refresh_token: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
}

/// One home from `GET {API_BASE}/user/{user_id}/subscribe/devices`
/// (sent with the `Access-Token` header).
#[derive(Clone, Debug, Deserialize)]
pub struct Home {
    pub id: u32,
    pub product_id: u32,
}

/// `GET {API_BASE}/product/{product_id}/device/{home_id}/property`
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceProperties {
    #[serde(rename = "bulbsArray", default)]
    pub bulbs_array: Vec<InventoryBulb>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InventoryBulb {
    #[serde(rename = "deviceID")]
    pub device_id: u32,
    #[serde(rename = "switchID")]
    pub switch_id: u32,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "deviceType")]
    pub device_type: u8,
}

/// `POST {API_BASE}/two_factor/email/verifycode` — triggers the email code.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyCodeRequest<'a> {
    pub corp_id: &'a str,
    pub email: &'a str,
    pub local_lang: &'a str,
}

/// `POST {API_BASE}/user_auth/two_factor` — trades the emailed code for
/// the credential material (`user_id`, `authorize`, `refresh_token`).
#[derive(Clone, Debug, Serialize)]
pub struct TwoFactorRequest<'a> {
    pub corp_id: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub two_factor: &'a str,
    pub resource: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TwoFactorResponse {
    pub user_id: u32,
    pub authorize: String,
    pub refresh_token: String,
}
