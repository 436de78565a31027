/// Convenience result type used across the crate.
pub type ShatterResult<T> = Result<T, ShatterError>;

/// Top-level error taxonomy used by effect APIs.
#[derive(thiserror::Error, Debug)]
pub enum ShatterError {
    /// Invalid user-provided configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Errors while partitioning or building shard geometry.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Errors while compositing a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShatterError {
    /// Build a [`ShatterError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ShatterError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`ShatterError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ShatterError::config("x")
                .to_string()
                .contains("config error:")
        );
        assert!(
            ShatterError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
        assert!(
            ShatterError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ShatterError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
