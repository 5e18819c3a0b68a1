use serde::Serialize;

/// Card id of the terminal snapshot every game record ends with.
pub const FINAL_CARD_ID: &str = "final";
pub const FINAL_CARD_TITLE: &str = "Final Position";

/// Metadata block of a game. Missing tags stay empty, numeric tags fall back to 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSet {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: i32,
    pub white: String,
    pub black: String,
    pub result: String,
    pub eco: String,
    pub annotator: String,
    pub white_elo: i32,
    pub black_elo: i32,
}

/// A narrative snapshot: the position after a commented ply, or the final one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    /// FEN of the position; the placement field comes first.
    pub fen: String,
    /// Escaped and autolinked annotation, empty for the final card.
    pub description: String,
}

impl Card {
    pub fn final_position(fen: String) -> Self {
        Self {
            id: FINAL_CARD_ID.to_string(),
            title: FINAL_CARD_TITLE.to_string(),
            fen,
            description: String::new(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.id == FINAL_CARD_ID
    }
}

/// One ingested game. Always carries at least the final card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub tags: TagSet,
    pub cards: Vec<Card>,
    /// The game re-exported as PGN (tags, mainline, comments, result).
    pub pgn: String,
}

impl GameRecord {
    /// The last commented card, or the final card for games without comments.
    pub fn headline_card(&self) -> Option<&Card> {
        self.cards
            .iter()
            .rev()
            .find(|card| !card.is_final())
            .or_else(|| self.cards.last())
    }
}

/// A rendered board diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    pub fen: String,
    pub png: Vec<u8>,
}
