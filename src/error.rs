use thiserror::Error;

use crate::annotation::TextId;

/// Errors raised by editor commands. None of them leave the session in a
/// half-applied state; the offending command simply has no effect.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot decode image: {0}")]
    ImageDecodeFailure(#[source] image::ImageError),
    #[error("text is empty")]
    EmptyTextRejected,
    #[error("no image loaded")]
    NoImageLoaded,
    #[error("no text object with id {0}")]
    UnknownText(TextId),
    #[error("render failed: {0}")]
    Render(String),
    #[error("cannot encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    /// Short notice for the person using the editor.
    pub fn to_user_facing(&self) -> String {
        match self {
            Self::ImageDecodeFailure(_) => "Failed to load the image.".into(),
            Self::EmptyTextRejected => "Enter some text first.".into(),
            Self::NoImageLoaded => "Load an image first.".into(),
            Self::UnknownText(_) => "That text no longer exists.".into(),
            Self::Render(_) => "The image could not be drawn.".into(),
            Self::Encode(_) => "The image could not be saved.".into(),
            Self::Io(err) => format!("File access failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditorError;

    #[test]
    fn notices_differ_from_log_messages() {
        let err = EditorError::UnknownText(7);
        assert_eq!(err.to_string(), "no text object with id 7");
        assert_eq!(err.to_user_facing(), "That text no longer exists.");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EditorError = io.into();
        assert!(matches!(err, EditorError::Io(_)));
        assert!(err.to_user_facing().contains("gone"));
    }
}
