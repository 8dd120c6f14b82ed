//! Error types shared by the shell components.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while splitting an input line into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line contained no tokens at all.
    #[error("empty command line")]
    Empty,

    /// A quote was opened but never closed.
    #[error("unterminated {quote} quote starting at column {position}")]
    UnterminatedQuote { quote: char, position: usize },
}

/// Errors raised by the command registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("Command '{0}' not found")]
    CommandNotFound(String),

    #[error("Command '{name}' takes at least {min_params} params. ({given} given)")]
    InsufficientParams {
        name: String,
        min_params: usize,
        given: usize,
    },
}

/// Errors raised by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("no authentication answer within {0:?}")]
    AuthTimeout(Duration),

    #[error("connection closed")]
    Closed,

    #[error("frame codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("frame encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised by the completion engine.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A second request was issued while one is still awaiting its reply.
    #[error("request for '{requested}' issued while '{pending}' is still awaiting a reply")]
    ConcurrencyViolation { pending: String, requested: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
