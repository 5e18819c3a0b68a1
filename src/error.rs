use shakmaty::san::SanError;
use std::io;
use std::path::PathBuf;

/// Hard failures of an ingestion call. Any of these discards every game
/// record collected so far in the same call.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed PGN near game {game}: {source}")]
    Syntax {
        game: usize,
        #[source]
        source: io::Error,
    },
    #[error("illegal move '{san}' at ply {ply} of game {game}: {source}")]
    IllegalMove {
        game: usize,
        ply: usize,
        san: String,
        #[source]
        source: SanError,
    },
    #[error("invalid setup position '{fen}' in game {game}: {reason}")]
    InvalidSetup {
        game: usize,
        fen: String,
        reason: String,
    },
}

impl IngestError {
    /// One-based index of the game unit that caused the failure.
    pub fn game(&self) -> usize {
        match self {
            Self::Syntax { game, .. }
            | Self::IllegalMove { game, .. }
            | Self::InvalidSetup { game, .. } => *game,
        }
    }
}

/// Failures while loading the sprite sheet or encoding a diagram.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("cannot read sprite sheet: {0}")]
    Io(#[from] io::Error),
    #[error("cannot decode sprite sheet: {0}")]
    Decode(#[from] image::ImageError),
    #[error("sprite sheet must be square with an edge of at least 8 pixels, got {width}x{height}")]
    Dimensions { width: u32, height: u32 },
    #[error("cannot encode diagram: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid path pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to open file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to initialize zstd decoder for '{}': {source}", .path.display())]
    Zstd {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid compression value '{0}'. Supported values: 'zstd' or omitted.")]
    Compression(String),
}

/// Collects soft diagnostics that never abort processing.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
