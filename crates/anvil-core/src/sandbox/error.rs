use crate::sandbox::permission::Permission;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// Strict-mode fault raised where the disallowed access was attempted
    #[error("Module '{module}' may not access '{capability}'")]
    Denied { module: String, capability: String },

    #[error("Module '{module}' lacks the {permission} permission for '{origin}'")]
    PermissionDenied {
        module: String,
        permission: Permission,
        origin: String,
    },

    #[error("Module '{module}' references non-API code and may not load native code: {}", .denied.join(", "))]
    TaintedModule { module: String, denied: Vec<String> },
}
