use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphics state stack underflow: no saved state to restore")]
    StateUnderflow,
    #[error("no current path available")]
    NoCurrentPath,
    #[error("requested page number is out of range: {index}; only {count} page(s) available")]
    PageOutOfRange { index: usize, count: usize },
    #[error("cannot allocate a {width}x{height} raster")]
    RasterAllocation { width: i64, height: i64 },
    #[error("no page could be rendered")]
    NoPagesRendered,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("image error: {0}")]
    Image(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
