use async_trait::async_trait;

use crate::device::Device;
use crate::error::Result;

/// Supplier of the current device list.
///
/// Implementations return a fresh list on every call and report failures
/// immediately; retry and timeout policy belong to the implementation.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch every device together with its current attribute readings.
    async fn devices(&self) -> Result<Vec<Device>>;
}
