//! Opening PGN sources from disk: plain or zstd-compressed files, one path or a
//! glob pattern.

use crate::error::InputError;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read + Send>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionMode {
    #[default]
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(InputError::Compression(normalized.to_string()))
        }
    }

    /// `zstd` for `.zst` files, plain otherwise.
    pub fn detect(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Expands `pattern` into the files it names, in sorted order. A pattern
/// without wildcards is returned as-is, whether or not the file exists.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, InputError> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let mut paths: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| InputError::Zstd {
                path: path.to_path_buf(),
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_parse_compression_mode_zstd_case_insensitive() {
        assert_eq!(CompressionMode::parse("zstd").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse(" ZSTD ").unwrap(), CompressionMode::Zstd);
    }

    #[test]
    fn test_parse_compression_mode_rejects_unsupported_value() {
        let err = CompressionMode::parse("gzip").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid compression value 'gzip'. Supported values: 'zstd' or omitted."
        );
        assert!(CompressionMode::parse("").is_err());
    }

    #[test]
    fn test_detect_compression_from_extension() {
        assert_eq!(
            CompressionMode::detect(Path::new("games.pgn.zst")),
            CompressionMode::Zstd
        );
        assert_eq!(
            CompressionMode::detect(Path::new("games.pgn")),
            CompressionMode::Plain
        );
    }

    #[test]
    fn test_expand_plain_path_is_kept() {
        let paths = expand_paths("does/not/exist.pgn").unwrap();
        assert_eq!(paths, [PathBuf::from("does/not/exist.pgn")]);
    }

    #[test]
    fn test_expand_glob_matches_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pgn", "a.pgn", "notes.txt"] {
            fs::write(dir.path().join(name), "*").unwrap();
        }

        let pattern = format!("{}/*.pgn", dir.path().display());
        let paths = expand_paths(&pattern).unwrap();
        assert_eq!(paths, [dir.path().join("a.pgn"), dir.path().join("b.pgn")]);
    }

    #[test]
    fn test_expand_invalid_pattern() {
        assert!(matches!(expand_paths("[*"), Err(InputError::Pattern(_))));
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = open_input_stream(Path::new("/nonexistent/games.pgn"), CompressionMode::Plain)
            .err()
            .expect("missing file must fail");
        assert!(err.to_string().contains("/nonexistent/games.pgn"));
    }

    #[test]
    fn test_open_zstd_stream_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.pgn.zst");
        let pgn = "[Event \"Zstd\"]\n\n1. e4 *\n";
        let compressed = zstd::encode_all(pgn.as_bytes(), 0).unwrap();
        fs::File::create(&path)
            .unwrap()
            .write_all(&compressed)
            .unwrap();

        let mut text = String::new();
        open_input_stream(&path, CompressionMode::Zstd)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, pgn);
    }
}
