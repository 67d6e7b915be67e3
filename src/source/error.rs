use std::fmt;

/// A convenient result type wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct LoadingError {
    pub path: String,
    pub detail: String,
}

#[derive(Debug)]
pub struct DecodeError {
    pub path: String,
    pub detail: String,
}

impl fmt::Display for LoadingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to read elevation raster {}: {}",
            self.path, self.detail
        )
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Raster {} is not a single-band elevation grid: {}",
            self.path, self.detail
        )
    }
}

impl std::error::Error for LoadingError {}

impl std::error::Error for DecodeError {}

/// Everything that can go wrong between a raster identifier and a mesh.
#[derive(Debug)]
pub enum Error {
    Loading(LoadingError),
    Decode(DecodeError),
}

impl Error {
    pub(crate) fn loading(path: &str, detail: impl fmt::Display) -> Self {
        Error::Loading(LoadingError {
            path: path.to_string(),
            detail: detail.to_string(),
        })
    }

    pub(crate) fn decode(path: &str, detail: impl fmt::Display) -> Self {
        Error::Decode(DecodeError {
            path: path.to_string(),
            detail: detail.to_string(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Loading(err) => err.fmt(f),
            Error::Decode(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Loading(err) => Some(err),
            Error::Decode(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Loading(LoadingError {
            path: "[UNKNOWN]".to_string(),
            detail: value.to_string(),
        })
    }
}

impl From<tiff::TiffError> for Error {
    fn from(value: tiff::TiffError) -> Self {
        Error::Decode(DecodeError {
            path: "[UNKNOWN]".to_string(),
            detail: value.to_string(),
        })
    }
}

impl From<image::ImageError> for Error {
    fn from(value: image::ImageError) -> Self {
        Error::Decode(DecodeError {
            path: "[UNKNOWN]".to_string(),
            detail: value.to_string(),
        })
    }
}
