use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub cloud: CloudConfig,
}

/// Cloud session credentials and endpoint. `user_id` and `authorize` go
/// into the AUTH frame; the refresh token is only handed to the REST
/// collaborator and never touches the TCP session. Host and port default
/// to the production cloud and exist for lab setups.
#[derive(Clone, Debug, Deserialize)]
pub struct CloudConfig {
    pub user_id: u32,
    pub authorize: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    cync_proto::CLOUD_HOST.to_string()
}

const fn default_port() -> u16 {
    cync_proto::CLOUD_PORT
}

pub fn parse(filename: &str) -> ApiResult<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(config::Environment::with_prefix("CYNC").separator("__"))
        .build()?;

    validate(settings.try_deserialize()?)
}

/// A bad token should fail at startup, not at the first connect.
fn validate(config: AppConfig) -> ApiResult<AppConfig> {
    if !config.cloud.authorize.is_ascii() || config.cloud.authorize.len() > 255 {
        return Err(ApiError::InvalidAuthorizeToken);
    }
    Ok(config)
}
