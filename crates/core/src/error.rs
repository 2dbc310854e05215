#[derive(Debug, thiserror::Error)]
pub enum PromsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("followup action {0} not found")]
    NotFound(i64),
    #[error("a save is already in progress for this followup action")]
    SaveInProgress,
    #[error("unknown question '{question}' for form '{form}'")]
    UnknownQuestion { form: String, question: String },
    /// Failure reported by the update operation. Displays the message verbatim.
    #[error("{0}")]
    Service(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write followup action file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read followup action file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize followup action: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize followup action: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

pub type PromsResult<T> = std::result::Result<T, PromsError>;
