//! FEN placement to PNG diagrams.
//!
//! Squares are cut from a single sprite sheet: a square image split into an
//! 8x8 grid of equal cells holding every piece on both square shades plus the
//! two empty squares. The table of cell origins is built once when the sheet
//! is loaded and is read-only afterwards, so one [`SpriteSheet`] can serve any
//! number of concurrent renders.

use crate::error::DiagramError;
use crate::log;
use crate::types::Diagram;

use image::imageops::{self, crop_imm};
use image::{ImageFormat, ImageReader, RgbaImage};
use shakmaty::{Color, Piece, Role};
use std::io::Cursor;
use std::ops::Deref;
use std::path::Path;

pub const DEFAULT_SPRITE_SHEET: &str = "pieces/allpieces.png";

const BOARD_SIZE: usize = 8;
const SPRITE_COUNT: usize = 26;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shade {
    Light,
    Dark,
}

impl Shade {
    /// Shade of the square at `file`, `rank`, with rank 0 being the top rank.
    pub fn of(file: usize, rank: usize) -> Self {
        if (file + rank) % 2 == 0 {
            Self::Light
        } else {
            Self::Dark
        }
    }
}

/// Selects one cell of the sprite sheet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpriteKey {
    Empty(Shade),
    Occupied(Piece, Shade),
}

impl SpriteKey {
    fn index(self) -> usize {
        match self {
            Self::Occupied(piece, shade) => {
                let color = match piece.color {
                    Color::White => 0,
                    Color::Black => 1,
                };
                let role = match piece.role {
                    Role::Pawn => 0,
                    Role::Rook => 1,
                    Role::Knight => 2,
                    Role::Bishop => 3,
                    Role::Queen => 4,
                    Role::King => 5,
                };
                ((color * 6 + role) * 2) + shade_offset(shade)
            }
            Self::Empty(shade) => 24 + shade_offset(shade),
        }
    }

    /// Grid position (column, row) of the sprite on the sheet.
    fn grid_cell(self) -> (u32, u32) {
        use Color::{Black, White};
        use Role::*;
        use Shade::{Dark, Light};

        match self {
            Self::Empty(Light) => (0, 2),
            Self::Empty(Dark) => (0, 3),
            Self::Occupied(Piece { color, role }, shade) => match (color, role, shade) {
                (White, Pawn, Light) => (0, 6),
                (White, Pawn, Dark) => (1, 6),
                (White, Rook, Light) => (7, 7),
                (White, Rook, Dark) => (0, 7),
                (White, Knight, Light) => (1, 7),
                (White, Knight, Dark) => (6, 7),
                (White, Bishop, Light) => (5, 7),
                (White, Bishop, Dark) => (2, 7),
                (White, Queen, Light) => (3, 7),
                (White, Queen, Dark) => (3, 4),
                (White, King, Light) => (4, 4),
                (White, King, Dark) => (4, 7),
                (Black, Pawn, Light) => (1, 1),
                (Black, Pawn, Dark) => (0, 1),
                (Black, Rook, Light) => (0, 0),
                (Black, Rook, Dark) => (7, 0),
                (Black, Knight, Light) => (6, 0),
                (Black, Knight, Dark) => (1, 0),
                (Black, Bishop, Light) => (2, 0),
                (Black, Bishop, Dark) => (5, 0),
                (Black, Queen, Light) => (3, 3),
                (Black, Queen, Dark) => (3, 0),
                (Black, King, Light) => (4, 0),
                (Black, King, Dark) => (4, 3),
            },
        }
    }

    fn all() -> impl Iterator<Item = SpriteKey> {
        let shades = [Shade::Light, Shade::Dark];
        let pieces = Color::ALL.into_iter().flat_map(|color| {
            Role::ALL
                .into_iter()
                .map(move |role| Piece { color, role })
        });
        pieces
            .flat_map(move |piece| shades.map(|shade| SpriteKey::Occupied(piece, shade)))
            .chain(shades.map(SpriteKey::Empty))
    }
}

fn shade_offset(shade: Shade) -> usize {
    match shade {
        Shade::Light => 0,
        Shade::Dark => 1,
    }
}

/// The decoded sprite sheet and the pixel origin of every sprite on it.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    sheet: RgbaImage,
    cell: u32,
    origins: [(u32, u32); SPRITE_COUNT],
}

impl SpriteSheet {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DiagramError> {
        let path = path.as_ref();
        let sheet = ImageReader::open(path)?.decode()?.to_rgba8();
        let sheet = Self::from_image(sheet)?;
        log::info(format!(
            "Loaded sprite sheet '{}' ({}px cells)",
            path.display(),
            sheet.cell
        ));
        Ok(sheet)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DiagramError> {
        Self::from_image(image::load_from_memory(bytes)?.to_rgba8())
    }

    pub fn from_image(sheet: RgbaImage) -> Result<Self, DiagramError> {
        let (width, height) = sheet.dimensions();
        if width != height || width < BOARD_SIZE as u32 {
            return Err(DiagramError::Dimensions { width, height });
        }

        let cell = width / BOARD_SIZE as u32;
        let mut origins = [(0, 0); SPRITE_COUNT];
        for key in SpriteKey::all() {
            let (column, row) = key.grid_cell();
            origins[key.index()] = (column * cell, row * cell);
        }

        Ok(Self {
            sheet,
            cell,
            origins,
        })
    }

    /// Edge length of one square in pixels.
    pub fn cell_size(&self) -> u32 {
        self.cell
    }

    pub fn origin(&self, key: SpriteKey) -> (u32, u32) {
        self.origins[key.index()]
    }

    /// Renders the placement field of `fen` as a PNG diagram.
    ///
    /// Never fails on malformed placements: missing ranks and unknown
    /// characters render as empty squares. Only the PNG encoder can fail.
    pub fn render(&self, fen: &str) -> Result<Diagram, DiagramError> {
        let (width, height) = self.sheet.dimensions();
        let mut canvas = RgbaImage::new(width, height);

        for (rank, cells) in decode_placement(fen).iter().enumerate() {
            for (file, cell) in cells.iter().enumerate() {
                let shade = Shade::of(file, rank);
                let key = match cell {
                    Some(piece) => SpriteKey::Occupied(*piece, shade),
                    None => SpriteKey::Empty(shade),
                };
                self.blit(&mut canvas, key, file as u32, rank as u32);
            }
        }

        let mut png = Cursor::new(Vec::new());
        canvas
            .write_to(&mut png, ImageFormat::Png)
            .map_err(DiagramError::Encode)?;

        Ok(Diagram {
            fen: fen.to_string(),
            png: png.into_inner(),
        })
    }

    fn blit(&self, canvas: &mut RgbaImage, key: SpriteKey, file: u32, rank: u32) {
        let (x, y) = self.origin(key);
        let sprite = crop_imm(&self.sheet, x, y, self.cell, self.cell);
        imageops::replace(
            canvas,
            sprite.deref(),
            i64::from(file * self.cell),
            i64::from(rank * self.cell),
        );
    }
}

pub type Rank = [Option<Piece>; BOARD_SIZE];

/// Decodes the placement field of a FEN into 8 ranks of 8 cells, top rank first.
///
/// Missing ranks become empty, each rank is padded or truncated to 8 cells, and
/// any character that is neither a digit nor a piece letter is an empty cell.
pub fn decode_placement(fen: &str) -> [Rank; BOARD_SIZE] {
    let placement = fen.split(' ').next().unwrap_or_default();
    let mut ranks = [[None; BOARD_SIZE]; BOARD_SIZE];

    for (rank, segment) in ranks.iter_mut().zip(placement.split('/')) {
        let mut file = 0;
        for ch in segment.chars() {
            if file >= BOARD_SIZE {
                break;
            }
            match ch.to_digit(10) {
                Some(run) => file += run as usize,
                None => {
                    rank[file] = Piece::from_char(ch);
                    file += 1;
                }
            }
        }
    }

    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
    const CELL: u32 = 4;

    /// A sheet whose every grid cell is filled with a color encoding its position.
    fn synthetic_sheet() -> RgbaImage {
        RgbaImage::from_fn(CELL * 8, CELL * 8, |x, y| {
            cell_color(x / CELL, y / CELL)
        })
    }

    fn cell_color(column: u32, row: u32) -> Rgba<u8> {
        Rgba([(column * 30) as u8, (row * 30) as u8, 200, 255])
    }

    fn encode(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn render_pixels(sheet: &SpriteSheet, fen: &str) -> RgbaImage {
        let diagram = sheet.render(fen).unwrap();
        image::load_from_memory(&diagram.png).unwrap().to_rgba8()
    }

    /// Color found in the middle of the board square at `file`, `rank`.
    fn square(image: &RgbaImage, file: u32, rank: u32) -> Rgba<u8> {
        *image.get_pixel(file * CELL + CELL / 2, rank * CELL + CELL / 2)
    }

    #[test]
    fn test_shade_alternates_from_light_top_left() {
        assert_eq!(Shade::of(0, 0), Shade::Light);
        assert_eq!(Shade::of(1, 0), Shade::Dark);
        assert_eq!(Shade::of(0, 7), Shade::Dark);
        assert_eq!(Shade::of(7, 7), Shade::Light);
    }

    #[test]
    fn test_sprite_indices_cover_all_keys_once() {
        let mut seen = [false; SPRITE_COUNT];
        for key in SpriteKey::all() {
            assert!(!seen[key.index()], "duplicate index for {key:?}");
            seen[key.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_sprite_table_scales_with_sheet() {
        let sheet = SpriteSheet::from_image(synthetic_sheet()).unwrap();
        assert_eq!(sheet.cell_size(), CELL);
        assert_eq!(sheet.origin(SpriteKey::Empty(Shade::Dark)), (0, 3 * CELL));
        let white_queen = Piece::from_char('Q').unwrap();
        assert_eq!(
            sheet.origin(SpriteKey::Occupied(white_queen, Shade::Dark)),
            (3 * CELL, 4 * CELL)
        );
    }

    #[test]
    fn test_sheet_must_be_square() {
        let err = SpriteSheet::from_image(RgbaImage::new(32, 16)).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::Dimensions {
                width: 32,
                height: 16
            }
        ));
        assert!(SpriteSheet::from_image(RgbaImage::new(4, 4)).is_err());
    }

    #[test]
    fn test_sheet_rejects_undecodable_bytes() {
        assert!(matches!(
            SpriteSheet::from_bytes(b"not a png"),
            Err(DiagramError::Decode(_))
        ));
    }

    #[test]
    fn test_sheet_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SpriteSheet::open(dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_sheet_open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allpieces.png");
        std::fs::write(&path, encode(&synthetic_sheet())).unwrap();

        let sheet = SpriteSheet::open(&path).unwrap();
        assert_eq!(sheet.cell_size(), CELL);
    }

    #[test]
    fn test_decode_start_position() {
        let ranks = decode_placement(START_PLACEMENT);
        assert_eq!(ranks[0][0], Piece::from_char('r'));
        assert_eq!(ranks[0][4], Piece::from_char('k'));
        assert_eq!(ranks[7][3], Piece::from_char('Q'));
        assert!(ranks[3].iter().all(Option::is_none));
    }

    #[test]
    fn test_decode_ignores_other_fen_fields() {
        let ranks = decode_placement("8/8/8/8/8/8/8/K7 w - - 0 1");
        assert_eq!(ranks[7][0], Piece::from_char('K'));
        assert_eq!(ranks[7][1], None);
    }

    #[test]
    fn test_decode_is_lenient() {
        let ranks = decode_placement("pp*x9Q/K");
        assert_eq!(ranks[0][0], Piece::from_char('p'));
        assert_eq!(ranks[0][1], Piece::from_char('p'));
        assert_eq!(ranks[0][2], None);
        assert_eq!(ranks[0][3], None);
        // The run of 9 overflows the rank and the queen falls off the board.
        assert!(ranks[0][4..].iter().all(Option::is_none));
        assert_eq!(ranks[1][0], Piece::from_char('K'));
        assert!(ranks[2..].iter().flatten().all(Option::is_none));
    }

    #[test]
    fn test_render_start_position_back_ranks() {
        let sheet = SpriteSheet::from_bytes(&encode(&synthetic_sheet())).unwrap();
        let image = render_pixels(&sheet, START_PLACEMENT);
        assert_eq!(image.dimensions(), (CELL * 8, CELL * 8));

        let expected_black = [
            (0, 0), // rook, light
            (1, 0), // knight, dark
            (2, 0), // bishop, light
            (3, 0), // queen, dark
            (4, 0), // king, light
            (5, 0), // bishop, dark
            (6, 0), // knight, light
            (7, 0), // rook, dark
        ];
        for (file, (column, row)) in expected_black.into_iter().enumerate() {
            assert_eq!(square(&image, file as u32, 0), cell_color(column, row));
        }

        let expected_white = [
            (0, 7), // rook, dark
            (1, 7), // knight, light
            (2, 7), // bishop, dark
            (3, 7), // queen, light
            (4, 7), // king, dark
            (5, 7), // bishop, light
            (6, 7), // knight, dark
            (7, 7), // rook, light
        ];
        for (file, (column, row)) in expected_white.into_iter().enumerate() {
            assert_eq!(square(&image, file as u32, 7), cell_color(column, row));
        }

        assert_eq!(square(&image, 0, 1), cell_color(0, 1)); // black pawn, dark
        assert_eq!(square(&image, 0, 6), cell_color(0, 6)); // white pawn, light
        assert_eq!(square(&image, 4, 4), cell_color(0, 2)); // empty, light
        assert_eq!(square(&image, 3, 4), cell_color(0, 3)); // empty, dark
    }

    #[test]
    fn test_render_is_byte_identical_across_calls() {
        let sheet = SpriteSheet::from_image(synthetic_sheet()).unwrap();
        let first = sheet.render(START_PLACEMENT).unwrap();
        let second = sheet.render(START_PLACEMENT).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fen, START_PLACEMENT);
    }

    #[test]
    fn test_render_short_placement_fills_missing_ranks() {
        let sheet = SpriteSheet::from_image(synthetic_sheet()).unwrap();
        let image = render_pixels(&sheet, "k7/8");

        assert_eq!(square(&image, 0, 0), cell_color(4, 0)); // black king, light
        for rank in 2..8 {
            for file in 0..8 {
                let expected = match Shade::of(file as usize, rank as usize) {
                    Shade::Light => cell_color(0, 2),
                    Shade::Dark => cell_color(0, 3),
                };
                assert_eq!(square(&image, file, rank), expected);
            }
        }
    }

    #[test]
    fn test_render_empty_string() {
        let sheet = SpriteSheet::from_image(synthetic_sheet()).unwrap();
        let image = render_pixels(&sheet, "");
        assert_eq!(square(&image, 0, 0), cell_color(0, 2));
        assert_eq!(square(&image, 7, 0), cell_color(0, 3));
    }
}
