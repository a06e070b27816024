use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fix file read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fix file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("location source error: {0}")]
    Platform(String),
}
