//! Per-worker launch options.

use std::collections::HashMap;

/// Environment variable carrying the worker's endpoint to its process.
pub const ENV_ENDPOINT: &str = "SONATA_ENDPOINT";

/// Environment variable carrying the worker's credentials to its process.
pub const ENV_CREDENTIALS: &str = "SONATA_CREDENTIALS";

/// Environment variable carrying the worker's buffer size to its process.
pub const ENV_BUFFER_SIZE: &str = "SONATA_BUFFER_SIZE";

/// How one worker is reached and, optionally, launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Address the worker listens on.
    pub endpoint: Option<String>,

    /// Opaque credentials passed through to the worker.
    pub credentials: Option<String>,

    /// Buffer size hint passed through to the worker.
    pub buffer_size: Option<usize>,

    /// External command to launch. `None` means the worker is managed
    /// outside this process.
    pub command: Option<String>,

    /// Arguments for `command`.
    pub args: Vec<String>,
}

impl WorkerOptions {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn command(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.command = Some(command.into());
        self.args = args;
        self
    }

    /// Environment handed to a launched process.
    pub fn environment(&self) -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        if let Some(endpoint) = &self.endpoint {
            env.insert(ENV_ENDPOINT, endpoint.clone());
        }
        if let Some(credentials) = &self.credentials {
            env.insert(ENV_CREDENTIALS, credentials.clone());
        }
        if let Some(buffer_size) = self.buffer_size {
            env.insert(ENV_BUFFER_SIZE, buffer_size.to_string());
        }
        env
    }
}

impl From<&crate::config::WorkerSettings> for WorkerOptions {
    fn from(settings: &crate::config::WorkerSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            credentials: settings.credentials.clone(),
            buffer_size: settings.buffer_size,
            command: settings.command.clone(),
            args: settings.args.clone(),
        }
    }
}
