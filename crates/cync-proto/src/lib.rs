pub mod capability;
pub mod color;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod packet;
pub mod request;

/// Cloud endpoint the bridge maintains its TCP session against.
pub const CLOUD_HOST: &str = "cm.gelighting.com";
pub const CLOUD_PORT: u16 = 23778;
