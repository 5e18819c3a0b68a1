use shakmaty::fen::Fen;
use shakmaty::san::{SanError, SanPlus};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

/// The ply most recently applied to a [`BoardState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastMove {
    pub san: String,
    pub side: Color,
    pub number: u32,
}

impl LastMove {
    /// `"12w"` / `"12b"`.
    pub fn card_id(&self) -> String {
        match self.side {
            Color::White => format!("{}w", self.number),
            Color::Black => format!("{}b", self.number),
        }
    }

    /// `"12. Nf3"` / `"12... Nf6"`.
    pub fn card_title(&self) -> String {
        match self.side {
            Color::White => format!("{}. {}", self.number, self.san),
            Color::Black => format!("{}... {}", self.number, self.san),
        }
    }
}

/// Position of a single game during replay.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pos: Chess,
    last_move: Option<LastMove>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary setup given as a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let fen = Fen::from_ascii(fen.trim().as_bytes()).map_err(|e| e.to_string())?;
        let pos: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            pos,
            last_move: None,
        })
    }

    /// Applies one ply. The position is left untouched when the move is illegal.
    pub fn play(&mut self, san_plus: &SanPlus) -> Result<&LastMove, SanError> {
        let m = san_plus.san.to_move(&self.pos)?;
        let side = self.pos.turn();
        let number = self.pos.fullmoves().get();

        self.pos.play_unchecked(m);

        Ok(self.last_move.insert(LastMove {
            san: san_plus.to_string(),
            side,
            number,
        }))
    }

    pub fn last_move(&self) -> Option<&LastMove> {
        self.last_move.as_ref()
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }
}
