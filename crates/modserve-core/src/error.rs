use std::path::PathBuf;
use thiserror::Error;

use crate::dev::accept::AcceptSyntaxError;
use crate::dev::edit::EditError;
use crate::imports::ScanError;

/// Error loading configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal error aborting a single module transform.
///
/// Advisory conditions (unresolved imports, non-analyzable dynamic imports)
/// never surface here; they are reported through
/// [`RewriteOutput::warnings`](crate::dev::RewriteOutput) and `tracing`.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error(
        "Failed to parse {importer} for import analysis: {message} (offset {pos}). \
         The content may contain invalid JS syntax."
    )]
    Parse {
        importer: String,
        pos: usize,
        message: String,
    },

    #[error("{importer}: {source}")]
    AcceptSyntax {
        importer: String,
        #[source]
        source: AcceptSyntaxError,
    },

    #[error("Importer {0} is not registered in the module graph")]
    UnknownImporter(String),

    #[error("Invalid edit while rewriting {importer}: {source}")]
    Edit {
        importer: String,
        #[source]
        source: EditError,
    },
}

impl RewriteError {
    pub(crate) fn parse(importer: &str, err: ScanError) -> Self {
        Self::Parse {
            importer: importer.to_string(),
            pos: err.pos,
            message: err.message,
        }
    }

    /// Byte offset into the original source, when the error has one.
    #[must_use]
    pub fn pos(&self) -> Option<usize> {
        match self {
            Self::Parse { pos, .. } => Some(*pos),
            Self::AcceptSyntax { source, .. } => Some(source.pos),
            Self::Edit { source, .. } => Some(source.pos()),
            Self::UnknownImporter(_) => None,
        }
    }
}
