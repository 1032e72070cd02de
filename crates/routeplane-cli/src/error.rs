use routeplane_kernel::ProvisionError;
use routeplane_provisioner::SetupError;

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for a failed run.
pub const EXIT_FAILURE: u8 = 1;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration:\n{0}")]
    InvalidConfig(String),

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] ProvisionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ConfigError(_)
            | CliError::InvalidConfig(_)
            | CliError::UnknownProvider(_) => EXIT_CONFIG,
            CliError::Setup(SetupError::HttpClient(_)) => EXIT_FAILURE,
            CliError::Setup(_) => EXIT_CONFIG,
            CliError::Gateway(_) | CliError::Io(_) | CliError::SerializationError(_) => {
                EXIT_FAILURE
            }
        }
    }
}
