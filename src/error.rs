use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_display_string() {
        let err = AppError::Playback("buffer holds no audio frames".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Playback error: buffer holds no audio frames\"");
    }

    #[test]
    fn test_io_error_converts() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
