use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

static SECURITY_POLICY: OnceLock<SecurityPolicy> = OnceLock::new();

/// Process-wide record of strict-mode enforcement.
///
/// Installed at most once and never removed; strict providers report every
/// denial to it.
#[derive(Debug, Default)]
pub struct SecurityPolicy {
    denials: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyInstall {
    Installed,
    AlreadyInstalled,
}

impl SecurityPolicy {
    pub fn denial_count(&self) -> u64 {
        self.denials.load(Ordering::Relaxed)
    }
}

pub(crate) fn install() -> PolicyInstall {
    let mut outcome = PolicyInstall::AlreadyInstalled;
    SECURITY_POLICY.get_or_init(|| {
        outcome = PolicyInstall::Installed;
        SecurityPolicy::default()
    });
    if outcome == PolicyInstall::Installed {
        log::info!("Installed process-wide security policy");
    }
    outcome
}

pub fn installed() -> Option<&'static SecurityPolicy> {
    SECURITY_POLICY.get()
}

pub(crate) fn report_denial(module: &str, capability: &str) {
    if let Some(policy) = installed() {
        let count = policy.denials.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("Denial #{} recorded for {} -> {}", count, module, capability);
    }
}
