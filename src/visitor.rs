use crate::error::ErrorAccumulator;
use crate::types::TagSet;

use pgn_reader::{Nag, Outcome, RawComment, RawTag, SanPlus, Skip, Visitor};
use smallvec::SmallVec;
use std::fmt::Write;
use std::mem;
use std::ops::ControlFlow;

/// One ply of the mainline, with the comments that followed it.
#[derive(Debug, Clone)]
pub struct Ply {
    pub san: SanPlus,
    pub comment: Option<String>,
}

impl Ply {
    fn annotate(&mut self, text: &str) {
        match &mut self.comment {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(text);
            }
            None => self.comment = Some(text.to_string()),
        }
    }
}

pub type PlyList = SmallVec<[Ply; 64]>;

/// A syntactically valid game unit, not yet replayed.
#[derive(Debug, Default)]
pub struct ParsedUnit {
    pub tags: TagSet,
    /// Value of the `FEN` tag, if any.
    pub setup: Option<String>,
    pub plies: PlyList,
    pub warnings: ErrorAccumulator,
    header: String,
    movetext: String,
    partial_comment: String,
    outcome: Option<String>,
}

impl ParsedUnit {
    /// Whether the unit held at least one tag pair, mainline move or result.
    /// pgn-reader drops tokens it cannot read, so stray text surfaces as a
    /// unit with none of these.
    pub fn is_game(&self) -> bool {
        !self.header.is_empty() || !self.plies.is_empty() || self.outcome.is_some()
    }

    /// The game re-exported as PGN: tag pairs, blank line, movetext and result.
    pub fn to_pgn(&self) -> String {
        let result = self
            .outcome
            .as_deref()
            .or((!self.tags.result.is_empty()).then_some(self.tags.result.as_str()))
            .unwrap_or("*");

        let mut pgn = String::with_capacity(self.header.len() + self.movetext.len() + 8);
        pgn.push_str(&self.header);
        pgn.push('\n');
        if !self.movetext.is_empty() {
            pgn.push_str(&self.movetext);
            pgn.push(' ');
        }
        pgn.push_str(result);
        pgn.push('\n');
        pgn
    }
}

/// Tag fields collected before the movetext starts.
#[derive(Default)]
pub struct HeaderFields {
    event: Option<String>,
    site: Option<String>,
    date: Option<String>,
    round: Option<String>,
    white: Option<String>,
    black: Option<String>,
    result: Option<String>,
    eco: Option<String>,
    annotator: Option<String>,
    white_elo: Option<String>,
    black_elo: Option<String>,
    fen: Option<String>,
    header: String,
}

impl HeaderFields {
    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let raw = String::from_utf8_lossy(value.as_bytes());
        let _ = writeln!(
            self.header,
            "[{} \"{}\"]",
            String::from_utf8_lossy(key),
            raw
        );

        let slot = match key {
            b"Event" => &mut self.event,
            b"Site" => &mut self.site,
            b"Date" => &mut self.date,
            b"Round" => &mut self.round,
            b"White" => &mut self.white,
            b"Black" => &mut self.black,
            b"Result" => &mut self.result,
            b"ECO" => &mut self.eco,
            b"Annotator" => &mut self.annotator,
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            b"FEN" => &mut self.fen,
            _ => return,
        };

        if slot.is_none() {
            *slot = Some(raw.into_owned());
        }
    }

    fn parse_integer_field(
        raw: Option<String>,
        label: &str,
        warnings: &mut ErrorAccumulator,
    ) -> i32 {
        let Some(raw) = raw else { return 0 };
        let s = raw.trim();
        match s.parse::<i32>() {
            Ok(v) => v,
            Err(_) => {
                warnings.push(&format!("Conversion error: {label}='{s}' coerced to 0"));
                0
            }
        }
    }

    fn into_unit(self) -> ParsedUnit {
        let mut warnings = ErrorAccumulator::default();
        let round = Self::parse_integer_field(self.round, "Round", &mut warnings);
        let white_elo = Self::parse_integer_field(self.white_elo, "WhiteElo", &mut warnings);
        let black_elo = Self::parse_integer_field(self.black_elo, "BlackElo", &mut warnings);

        ParsedUnit {
            tags: TagSet {
                event: self.event.unwrap_or_default(),
                site: self.site.unwrap_or_default(),
                date: self.date.unwrap_or_default(),
                round,
                white: self.white.unwrap_or_default(),
                black: self.black.unwrap_or_default(),
                result: self.result.unwrap_or_default(),
                eco: self.eco.unwrap_or_default(),
                annotator: self.annotator.unwrap_or_default(),
                white_elo,
                black_elo,
            },
            setup: self.fen,
            warnings,
            header: self.header,
            ..ParsedUnit::default()
        }
    }
}

/// Streaming PGN visitor (pgn-reader) that turns one game unit into a
/// [`ParsedUnit`]: known tags, mainline plies with their comments, and a
/// re-exportable movetext. Variations go to the movetext only.
#[derive(Default)]
pub struct UnitVisitor {
    ply_count: usize,
    /// Ply counters of the enclosing lines while inside a variation.
    parent_lines: SmallVec<[usize; 4]>,
    /// Set at the start of a line, where a Black move needs its number.
    line_start: bool,
}

impl UnitVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_mainline(&self) -> bool {
        self.parent_lines.is_empty()
    }

    fn push_separator(movetext: &mut String) {
        if !movetext.is_empty() && !movetext.ends_with('(') {
            movetext.push(' ');
        }
    }
}

impl Visitor for UnitVisitor {
    type Tags = HeaderFields;
    type Movetext = ParsedUnit;
    type Output = ParsedUnit;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.ply_count = 0;
        self.parent_lines.clear();
        self.line_start = false;
        ControlFlow::Continue(HeaderFields::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(tags.into_unit())
    }

    fn begin_variation(&mut self, unit: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        Self::push_separator(&mut unit.movetext);
        unit.movetext.push('(');

        // A variation replaces the last move of the enclosing line.
        self.parent_lines.push(self.ply_count);
        self.ply_count = self.ply_count.saturating_sub(1);
        self.line_start = true;
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, unit: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        // Unmatched `)` is ignored.
        if let Some(parent) = self.parent_lines.pop() {
            unit.movetext.push(')');
            self.ply_count = parent;
            self.line_start = true;
        }
        ControlFlow::Continue(())
    }

    fn san(&mut self, unit: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        Self::push_separator(&mut unit.movetext);
        let number = (self.ply_count / 2) + 1;
        if self.ply_count.is_multiple_of(2) {
            let _ = write!(unit.movetext, "{number}. ");
        } else if self.line_start {
            let _ = write!(unit.movetext, "{number}... ");
        }
        let _ = write!(unit.movetext, "{}", san);
        self.ply_count += 1;
        self.line_start = false;

        if self.in_mainline() {
            unit.plies.push(Ply { san, comment: None });
        }
        ControlFlow::Continue(())
    }

    fn nag(&mut self, unit: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        Self::push_separator(&mut unit.movetext);
        let _ = write!(unit.movetext, "${}", nag.0);
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        unit: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        unit.partial_comment
            .push_str(&String::from_utf8_lossy(comment.as_bytes()));
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        unit: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let mut text = mem::take(&mut unit.partial_comment);
        text.push_str(&String::from_utf8_lossy(comment.as_bytes()));
        let text = text.trim();
        if text.is_empty() {
            return ControlFlow::Continue(());
        }

        Self::push_separator(&mut unit.movetext);
        unit.movetext.push_str("{ ");
        unit.movetext.push_str(text);
        unit.movetext.push_str(" }");

        if self.in_mainline()
            && let Some(ply) = unit.plies.last_mut()
        {
            ply.annotate(text);
        }
        ControlFlow::Continue(())
    }

    fn outcome(&mut self, unit: &mut Self::Movetext, outcome: Outcome) -> ControlFlow<Self::Output> {
        unit.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, mut unit: Self::Movetext) -> Self::Output {
        for _ in self.parent_lines.drain(..) {
            unit.movetext.push(')');
        }
        unit
    }
}
