use miette::Diagnostic;
use thiserror::Error;

/// Every failure in the provisioning pipeline is fatal — nothing is
/// retried automatically. Each variant maps to a distinct exit code so
/// scripts can tell failure kinds apart.
#[derive(Debug, Error, Diagnostic)]
pub enum WinupError {
    #[error("administrator rights are required")]
    #[diagnostic(help("re-run from an elevated prompt (Run as Administrator / sudo)"))]
    Privilege,

    #[error("toolchain setup failed: {message}")]
    #[diagnostic(help("run the package manager manually to verify the install"))]
    Toolchain { message: String },

    #[error("could not parse an ISO link from the download page")]
    #[diagnostic(help("the site layout may have changed; pass --iso with a local file instead"))]
    Parse,

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{command} exited with an error: {message}")]
    Tool { command: String, message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("io error while {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl WinupError {
    /// Process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            WinupError::Io { .. } => 1,
            WinupError::Privilege => 10,
            WinupError::Toolchain { .. } => 11,
            WinupError::Parse => 12,
            WinupError::Network { .. } => 13,
            WinupError::Tool { .. } => 14,
            WinupError::Config { .. } => 15,
        }
    }
}
