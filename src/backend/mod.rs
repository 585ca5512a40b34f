pub mod cloud;

use async_trait::async_trait;

use crate::error::ApiResult;

/// A long-lived connection driver. `run_forever` owns its reconnect
/// policy and returns only on clean shutdown.
#[async_trait]
pub trait Backend {
    async fn run_forever(self) -> ApiResult<()>;
}
