#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("template argument error: {0}")]
    TemplateArgument(String),
    #[error("lookup error: {0}")]
    Lookup(String),
    #[error("unable to find file: {0}")]
    NotFound(String),
    #[error("invalid glob pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("failed to create output directory {path}: {source}", path = path.display())]
    DirCreation {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse subject info: {0}")]
    SubjectInfoParse(serde_yaml::Error),
    #[error("file copy failed: {0}")]
    Files(#[from] nidata_files::FilesError),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
