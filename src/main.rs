use clap::{Args, Parser, Subcommand};
use hyperfen::diagram::DEFAULT_SPRITE_SHEET;
use hyperfen::input::{CompressionMode, expand_paths, open_input_stream};
use hyperfen::{GameRecord, IngestConfig, IngestStatus, SpriteSheet, ingest, log};
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hyperfen", version, about = "Annotated PGN cards and FEN diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest PGN files and print one JSON game record per line.
    Ingest(IngestArgs),
    /// Render a FEN placement as a PNG diagram.
    Render {
        fen: String,
        #[arg(long, default_value = DEFAULT_SPRITE_SHEET)]
        sheet: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct IngestArgs {
    /// A PGN file or a glob pattern.
    pattern: String,
    /// Maximum number of games per file.
    #[arg(long, default_value_t = hyperfen::DEFAULT_GAME_LIMIT)]
    limit: NonZeroUsize,
    /// `zstd`, or omitted to pick by file extension.
    #[arg(long)]
    compression: Option<String>,
    /// Replay from the FEN tag when a game carries one.
    #[arg(long)]
    honor_setup: bool,
    /// Write the headline diagram of every game into this directory.
    #[arg(long)]
    diagrams: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_SPRITE_SHEET)]
    sheet: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Ingest(args) => run_ingest(&args),
        Command::Render { fen, sheet, output } => run_render(&fen, &sheet, &output),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            log::error(e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run_ingest(args: &IngestArgs) -> Result<ExitCode, Box<dyn Error>> {
    let forced = args
        .compression
        .as_deref()
        .map(CompressionMode::parse)
        .transpose()?;
    let config = IngestConfig {
        limit: args.limit,
        honor_setup_tag: args.honor_setup,
        ..IngestConfig::default()
    };

    let paths = expand_paths(&args.pattern)?;
    if paths.is_empty() {
        return Err(format!("no file matches '{}'", args.pattern).into());
    }

    let headlines = match &args.diagrams {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Some((dir.as_path(), SpriteSheet::open(&args.sheet)?))
        }
        None => None,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut code = ExitCode::SUCCESS;
    let mut written = 0usize;

    for path in paths {
        let mode = forced.unwrap_or_else(|| CompressionMode::detect(&path));
        let input = open_input_stream(&path, mode)?;
        let ingested = ingest(input, &config)
            .map_err(|e| format!("'{}': {e}", path.display()))?;

        if ingested.games.is_empty() {
            log::warn(format!("'{}': no games found", path.display()));
            code = ExitCode::FAILURE;
        }
        if ingested.status == IngestStatus::LimitExceeded {
            log::error(format!(
                "'{}': the PGN must contain at most {} games",
                path.display(),
                args.limit
            ));
            code = ExitCode::FAILURE;
        }

        for game in &ingested.games {
            serde_json::to_writer(&mut out, game)?;
            out.write_all(b"\n")?;

            written += 1;
            if let Some((dir, sheet)) = &headlines {
                write_headline(sheet, game, &dir.join(format!("{written}.png")))?;
            }
        }
    }

    Ok(code)
}

fn write_headline(
    sheet: &SpriteSheet,
    game: &GameRecord,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let Some(card) = game.headline_card() else {
        return Ok(());
    };
    let diagram = sheet.render(&card.fen)?;
    fs::write(output, &diagram.png)?;
    log::info(format!(
        "Wrote headline diagram ({}) to '{}'",
        card.title,
        output.display()
    ));
    Ok(())
}

fn run_render(
    fen: &str,
    sheet: &Path,
    output: &Path,
) -> Result<ExitCode, Box<dyn Error>> {
    let sheet = SpriteSheet::open(sheet)?;
    let diagram = sheet.render(fen)?;
    fs::write(output, &diagram.png)?;
    log::info(format!("Wrote diagram for '{}' to '{}'", fen, output.display()));
    Ok(ExitCode::SUCCESS)
}
