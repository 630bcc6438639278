use std::path::PathBuf;

use bindercall_opcode::ResolverConfig;
use bindercall_parcel::ParcelDialect;
use bindercall_shell::ShellConfig;

/// Where the helper binary lives unless configured otherwise.
pub const DEFAULT_HELPER_PATH: &str = "/data/local/tmp/anycall";

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Path of the helper binary on the device.
    pub helper: PathBuf,
    /// Parcel layout of the target OS release.
    pub dialect: ParcelDialect,
    pub resolver: ResolverConfig,
    /// Shell settings. The helper is always made executable on start.
    pub shell: ShellConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            helper: PathBuf::from(DEFAULT_HELPER_PATH),
            dialect: ParcelDialect::default(),
            resolver: ResolverConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_helper(mut self, helper: impl Into<PathBuf>) -> Self {
        self.helper = helper.into();
        self
    }

    pub fn with_dialect(mut self, dialect: ParcelDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Shorthand for `with_dialect(ParcelDialect::new(sdk))`.
    pub fn with_sdk(self, sdk: u32) -> Self {
        self.with_dialect(ParcelDialect::new(sdk))
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_shell(mut self, shell: ShellConfig) -> Self {
        self.shell = shell;
        self
    }
}
