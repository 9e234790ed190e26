pub type PfpResult<T> = Result<T, PfpError>;

#[derive(thiserror::Error, Debug)]
pub enum PfpError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PfpError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PfpError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(PfpError::decode("x").to_string().contains("decode error:"));
        assert!(PfpError::render("x").to_string().contains("render error:"));
        assert!(PfpError::encode("x").to_string().contains("encode error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PfpError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
