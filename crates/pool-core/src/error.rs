//! Error types for job construction and share reconstruction.

use thiserror::Error;

use crate::config::ConfigError;
use crate::template::TemplateDecodeError;

/// Which extranonce a length check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtranonceKind {
    Extranonce1,
    Extranonce2,
}

impl core::fmt::Display for ExtranonceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExtranonceKind::Extranonce1 => write!(f, "extranonce1"),
            ExtranonceKind::Extranonce2 => write!(f, "extranonce2"),
        }
    }
}

/// Errors surfaced by this crate.
///
/// Every operation is deterministic, so none of these are transient.
#[derive(Debug, Error)]
pub enum Error {
    /// The block template had malformed hex or an undecodable transaction.
    #[error("block template decode failed: {0}")]
    TemplateDecode(#[from] TemplateDecodeError),

    /// The height needs more than the 4-byte script number BIP34 allows here.
    #[error("block height {height} does not fit a 4-byte coinbase height push")]
    UnsupportedHeightEncoding { height: u64 },

    /// A submitted extranonce does not match the size the job was split for.
    #[error("{kind} is {got} bytes, job expects {expected}")]
    ExtranonceLengthMismatch {
        kind: ExtranonceKind,
        expected: usize,
        got: usize,
    },

    /// Invalid pool configuration.
    #[error("invalid pool configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Convenient Result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;
