use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::Result;
use crate::module_system::environment::Environment;

/// Hook for the component that installs modules from remote sources.
///
/// The manager attaches it once, after the primary environment exists. Any
/// transport lives entirely behind this trait.
#[async_trait]
pub trait InstallManager: Send + Sync {
    fn name(&self) -> &str;

    async fn attach(&self, environment: Arc<Environment>) -> Result<()>;
}
