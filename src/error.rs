use std::error::Error as StdError;
use std::fmt;
use std::result::Result as StdResult;
use std::sync::Arc;

/// Error type returned by registry operations that run caller code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A factory callback passed to [`Registry::try_get_or_create`] failed.
    ///
    /// Nothing was registered and the caller's cached key is untouched.
    ///
    /// [`Registry::try_get_or_create`]: crate::Registry::try_get_or_create
    ExternalError(Arc<dyn StdError + Send + Sync>),
}

/// A specialized `Result` type used by this crate's fallible operations.
pub type Result<T> = StdResult<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ExternalError(ref err) => write!(fmt, "{}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::ExternalError(ref err) => Some(&**err),
        }
    }
}

/// Trait for converting arbitrary error types into [`Error`].
pub trait ExternalError {
    fn into_registry_err(self) -> Error;
}

impl<E: Into<Box<dyn StdError + Send + Sync>>> ExternalError for E {
    fn into_registry_err(self) -> Error {
        let err: Box<dyn StdError + Send + Sync> = self.into();
        Error::ExternalError(err.into())
    }
}

/// Trait for converting results with arbitrary error types into [`Result`].
pub trait ExternalResult<T> {
    fn into_registry_err(self) -> Result<T>;
}

impl<T, E: ExternalError> ExternalResult<T> for StdResult<T, E> {
    fn into_registry_err(self) -> Result<T> {
        self.map_err(|err| err.into_registry_err())
    }
}
