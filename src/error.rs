use thiserror::Error;

/// Everything that can go wrong while interpreting a command string.
///
/// A failing command aborts the remaining expressions on that command line;
/// the caller keeps the state it held before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bad syntax")]
    BadSyntax,
    #[error("expected more tokens in this command")]
    NoTokens,
    #[error("expected a command")]
    CommandExpected,
    #[error("expected an address")]
    AddressExpected,
    #[error("expected token: {0}")]
    TokenExpected(String),
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("pipe error: {0}")]
    Pipe(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type Result<T> = std::result::Result<T, Error>;
