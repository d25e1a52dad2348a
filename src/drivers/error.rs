use thiserror::Error;
#[derive(Debug, Error)]
pub enum SpectroError {
    #[error("device error: {0}")]
    Device(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    State(String),
    #[error("history index {index} out of range for {len} stored spectra")]
    Index { index: isize, len: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("curve length mismatch: expected {expected} points, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for SpectroError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        SpectroError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for SpectroError {
    fn from(value: image::ImageError) -> Self {
        SpectroError::Plot(value.to_string())
    }
}
