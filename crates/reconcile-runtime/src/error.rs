/// Result type for reconcile-runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds raised while loading configuration, resolving provenance, and running a
/// sync stage (§7). `Config`/`NotConfigured` map to exit code 2; everything else to 1.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no dataset configured for engagement dataset '{0}'")]
    NotConfigured(String),

    #[error(transparent)]
    Sources(#[from] reconcile_sources::Error),

    #[error(transparent)]
    Store(#[from] reconcile_store::Error),

    #[error(transparent)]
    Engine(#[from] reconcile_engine::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Maps an error to the process exit code it warrants (§6.3): configuration problems
    /// are exit 2, everything else that reaches `main` is exit 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::NotConfigured(_) | Error::TomlDe(_) => 2,
            _ => 1,
        }
    }
}
