//! PGN ingestion: game units are parsed one at a time, replayed on a fresh
//! board, and turned into [`GameRecord`]s carrying one card per commented ply
//! plus the final position.
//!
//! The pipeline runs as a small state machine. Any hard failure moves it to
//! the aborted phase, which is terminal and drops every record collected so
//! far in the call.

use crate::board::BoardState;
use crate::error::IngestError;
use crate::log;
use crate::sanitize::Autolinker;
use crate::types::{Card, GameRecord};
use crate::visitor::{ParsedUnit, UnitVisitor};

use pgn_reader::Reader;
use std::io::{self, Read};
use std::mem;
use std::num::NonZeroUsize;

pub const DEFAULT_GAME_LIMIT: NonZeroUsize = NonZeroUsize::new(50).unwrap();

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of game records returned by one call.
    pub limit: NonZeroUsize,
    pub autolinker: Autolinker,
    /// Replay from the `FEN` tag instead of the standard starting position.
    pub honor_setup_tag: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_GAME_LIMIT,
            autolinker: Autolinker::default(),
            honor_setup_tag: false,
        }
    }
}

impl IngestConfig {
    pub fn with_limit(limit: NonZeroUsize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestStatus {
    /// Every game unit in the stream was ingested.
    Complete,
    /// The stream holds more games than the limit; only the first `limit` are returned.
    LimitExceeded,
}

#[derive(Debug)]
pub struct Ingested {
    pub games: Vec<GameRecord>,
    pub status: IngestStatus,
}

impl Ingested {
    pub fn is_limit_exceeded(&self) -> bool {
        self.status == IngestStatus::LimitExceeded
    }
}

/// Ingests every game in `input`, up to `config.limit`.
pub fn ingest<R: Read>(input: R, config: &IngestConfig) -> Result<Ingested, IngestError> {
    Pipeline::new(input, config).run()
}

#[derive(Debug)]
enum Phase {
    Idle,
    ParsingUnit,
    Replaying(ParsedUnit),
    Completed(IngestStatus),
    Aborted(IngestError),
}

struct Pipeline<'c, R: Read> {
    reader: Reader<R>,
    visitor: UnitVisitor,
    config: &'c IngestConfig,
    games: Vec<GameRecord>,
    units_seen: usize,
    phase: Phase,
}

impl<'c, R: Read> Pipeline<'c, R> {
    fn new(input: R, config: &'c IngestConfig) -> Self {
        Self {
            reader: Reader::new(input),
            visitor: UnitVisitor::new(),
            config,
            games: Vec::new(),
            units_seen: 0,
            phase: Phase::Idle,
        }
    }

    fn run(mut self) -> Result<Ingested, IngestError> {
        loop {
            match mem::replace(&mut self.phase, Phase::Idle) {
                Phase::Completed(status) => {
                    return Ok(Ingested {
                        games: self.games,
                        status,
                    });
                }
                Phase::Aborted(error) => {
                    log::warn(format!(
                        "Ingestion aborted, discarding {} parsed game(s): {}",
                        self.games.len(),
                        error
                    ));
                    return Err(error);
                }
                phase => self.phase = self.advance(phase),
            }
        }
    }

    fn advance(&mut self, phase: Phase) -> Phase {
        match phase {
            Phase::Idle => Phase::ParsingUnit,
            Phase::ParsingUnit => self.parse_unit(),
            Phase::Replaying(unit) => match replay(unit, self.config, self.units_seen) {
                Ok(game) => {
                    self.games.push(game);
                    if self.games.len() >= self.config.limit.get() {
                        Phase::Completed(self.peek_remaining())
                    } else {
                        Phase::ParsingUnit
                    }
                }
                Err(error) => Phase::Aborted(error),
            },
            terminal @ (Phase::Completed(_) | Phase::Aborted(_)) => terminal,
        }
    }

    fn parse_unit(&mut self) -> Phase {
        let game = self.units_seen + 1;
        match self.reader.read_game(&mut self.visitor) {
            Ok(Some(unit)) if unit.is_game() => {
                self.units_seen = game;
                Phase::Replaying(unit)
            }
            Ok(Some(_)) => Phase::Aborted(IngestError::Syntax {
                game,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    "no tag pairs, moves or result",
                ),
            }),
            Ok(None) => Phase::Completed(IngestStatus::Complete),
            Err(source) => Phase::Aborted(IngestError::Syntax { game, source }),
        }
    }

    /// Called once the limit is reached: looks for one more unit without replaying it.
    fn peek_remaining(&mut self) -> IngestStatus {
        match self.reader.read_game(&mut self.visitor) {
            Ok(None) => IngestStatus::Complete,
            Ok(Some(_)) | Err(_) => {
                log::warn(format!(
                    "Game limit of {} reached, ignoring the rest of the input",
                    self.config.limit
                ));
                IngestStatus::LimitExceeded
            }
        }
    }
}

/// Replays one parsed unit from its starting position and collects its cards.
fn replay(
    mut unit: ParsedUnit,
    config: &IngestConfig,
    game: usize,
) -> Result<GameRecord, IngestError> {
    if let Some(warnings) = unit.warnings.take() {
        log::warn(format!("Game {game}: {warnings}"));
    }

    let mut board = match unit.setup.as_deref() {
        Some(fen) if config.honor_setup_tag => {
            BoardState::from_fen(fen).map_err(|reason| IngestError::InvalidSetup {
                game,
                fen: fen.to_string(),
                reason,
            })?
        }
        _ => BoardState::new(),
    };

    let pgn = unit.to_pgn();
    let mut cards = Vec::new();

    for (index, ply) in unit.plies.iter().enumerate() {
        let played = board
            .play(&ply.san)
            .map_err(|source| IngestError::IllegalMove {
                game,
                ply: index + 1,
                san: ply.san.to_string(),
                source,
            })?;

        if let Some(comment) = ply.comment.as_deref() {
            let id = played.card_id();
            let title = played.card_title();
            cards.push(Card {
                id,
                title,
                fen: board.fen(),
                description: config.autolinker.render(comment),
            });
        }
    }

    cards.push(Card::final_position(board.fen()));

    Ok(GameRecord {
        tags: unit.tags,
        cards,
        pgn,
    })
}
