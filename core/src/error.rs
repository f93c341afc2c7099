use crate::notation::NotationError;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Configuration-time failures. Everything here is surfaced immediately to
/// the caller; nothing is deferred into the dispatch path.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("undeclared mode: {name}"))]
    UndeclaredMode { name: String },

    #[snafu(display("unknown action label: {label}"))]
    UnknownAction { label: String },

    #[snafu(display("keymap config error: {message}"))]
    Config { message: String },

    #[snafu(display("key notation error: {source}"))]
    Notation { source: NotationError },
}

impl From<NotationError> for Error {
    fn from(source: NotationError) -> Self {
        Error::Notation { source }
    }
}
