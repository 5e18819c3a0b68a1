//! Turns annotated PGN into narrative game records and renders FEN placements
//! as PNG diagrams.
//!
//! The two halves are independent: [`ingest`] replays every game in a PGN
//! stream and extracts one [`Card`] per commented ply plus the final position;
//! [`SpriteSheet::render`] draws any placement string from a sprite sheet
//! loaded once at startup.

pub mod board;
pub mod diagram;
pub mod error;
pub mod ingest;
pub mod input;
pub mod log;
pub mod sanitize;
pub mod types;
mod visitor;

pub use board::{BoardState, LastMove};
pub use diagram::{SpriteSheet, decode_placement};
pub use error::{DiagramError, IngestError, InputError};
pub use ingest::{DEFAULT_GAME_LIMIT, IngestConfig, IngestStatus, Ingested, ingest};
pub use sanitize::Autolinker;
pub use types::{Card, Diagram, GameRecord, TagSet};
