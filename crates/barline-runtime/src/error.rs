#![forbid(unsafe_code)]

//! Failure types raised at the polling boundary.

use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// An error a poll producer returns instead of a fresh value.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid number: {0}")]
    Float(#[from] ParseFloatError),

    #[error("could not parse {what} from {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProducerError {
    pub fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Which half of a poll tick failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The producer returned an error or panicked.
    Producer,
    /// Storing the value ran a subscriber or derivation that panicked.
    Derivation,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Derivation => f.write_str("derivation"),
        }
    }
}

/// A failed poll tick, as handed to a
/// [`DiagnosticSink`](crate::diagnostics::DiagnosticSink).
#[derive(Debug, Error)]
pub enum PollError {
    #[error("producer failed: {0}")]
    Producer(#[from] ProducerError),

    #[error("producer panicked: {message}")]
    ProducerPanicked { message: String },

    #[error("derivation panicked: {message}")]
    DerivationPanicked { message: String },
}

impl PollError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Producer(_) | Self::ProducerPanicked { .. } => FailureKind::Producer,
            Self::DerivationPanicked { .. } => FailureKind::Derivation,
        }
    }
}
