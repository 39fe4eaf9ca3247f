/*!
 * API Types
 * Gateway configuration
 */

use crate::process::shell::{DEFAULT_CHUNK_SIZE, DEFAULT_SHELL};
use std::time::Duration;
use tracing::warn;

/// Pid of a namespace's init process
pub const INIT_PID: u32 = 1;

const SHUTDOWN_GRACE_ENV: &str = "RUNRPC_SHUTDOWN_GRACE_MS";

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Shell used for commands without explicit args and no shell override
    pub default_shell: String,
    /// Maximum bytes per Output message
    pub chunk_size: usize,
    /// Buffered Output messages per Shell call
    pub output_buffer: usize,
    /// How long in-flight calls may run after input closes
    pub shutdown_grace: Duration,
    /// Pid that marks the namespace init process
    pub init_pid: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_shell: DEFAULT_SHELL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_buffer: 64,
            shutdown_grace: Duration::from_secs(5),
            init_pid: INIT_PID,
        }
    }
}

impl GatewayConfig {
    /// Defaults, with overrides from the environment when they parse
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(SHUTDOWN_GRACE_ENV) {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) => config.with_shutdown_grace(Duration::from_millis(ms)),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Ignoring invalid {}", SHUTDOWN_GRACE_ENV);
                    config
                }
            },
            Err(_) => config,
        }
    }

    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_output_buffer(mut self, output_buffer: usize) -> Self {
        self.output_buffer = output_buffer.max(1);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_init_pid(mut self, pid: u32) -> Self {
        self.init_pid = pid;
        self
    }
}
