pub mod dispatcher;
pub mod filesystem;
pub mod notify;
pub mod registry;
pub mod schema;
pub mod system;

pub use dispatcher::{ToolDispatcher, ToolInvocationRequest};
pub use filesystem::{ListSafeDirectory, ReadSafeFile, SafeDir};
pub use notify::SendNotification;
pub use registry::{
    Capability, CapabilityRegistry, ObservationMode, OutcomeOrigin, OutcomeStatus, ParamKind, ParamSpec, Parameters,
    ToolOutcome,
};
pub use schema::tool_call_schema_json;
pub use system::{CpuUsage, CurrentDatetime, DiskUsage, MemoryInfo, SystemUptime};

use crate::config::ToolsSection;
use crate::core::AgentError;

/// 注册内置的本地能力（文件、系统探针、时间、通知）
pub fn default_registry(settings: &ToolsSection) -> Result<CapabilityRegistry, AgentError> {
    let safe_dir = SafeDir::new(&settings.safe_dir);
    let mut registry = CapabilityRegistry::new();
    registry.register(ListSafeDirectory::new(safe_dir.clone()))?;
    registry.register(ReadSafeFile::new(safe_dir, settings.read_limit_chars))?;
    registry.register(CpuUsage)?;
    registry.register(MemoryInfo)?;
    registry.register(DiskUsage)?;
    registry.register(SystemUptime)?;
    registry.register(CurrentDatetime)?;
    registry.register(SendNotification::new(settings))?;
    Ok(registry)
}
