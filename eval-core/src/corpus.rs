use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Color, Move, Position};

/// Final result of a recorded game, taken from the `Result` header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

impl GameResult {
    fn from_header(value: &str) -> GameResult {
        match value {
            "1-0" => GameResult::WhiteWins,
            "0-1" => GameResult::BlackWins,
            "1/2-1/2" => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }

    /// Training target from the perspective of the side to move: +1.0 when
    /// the player about to move went on to win, -1.0 when they went on to
    /// lose, 0.0 for draws and unknown results.
    pub fn target_for(self, side_to_move: Color) -> f32 {
        match self {
            GameResult::WhiteWins => match side_to_move {
                Color::White => 1.0,
                Color::Black => -1.0,
            },
            GameResult::BlackWins => match side_to_move {
                Color::White => -1.0,
                Color::Black => 1.0,
            },
            GameResult::Draw | GameResult::Unknown => 0.0,
        }
    }
}

/// A parsed game: its result and the fully validated move list.
pub struct RawGame {
    pub result: GameResult,
    pub moves: Vec<Move>,
}

/// Replays the movetext while visiting, so that an unparseable or illegal
/// SAN token invalidates the whole game instead of truncating it.
struct GameCollector {
    position: Chess,
    moves: Vec<Move>,
    result: GameResult,
    invalid: bool,
}

impl GameCollector {
    fn new() -> Self {
        GameCollector {
            position: Chess::default(),
            moves: Vec::new(),
            result: GameResult::Unknown,
            invalid: false,
        }
    }
}

impl Visitor for GameCollector {
    type Result = Option<RawGame>;

    fn begin_game(&mut self) {
        self.position = Chess::default();
        self.moves.clear();
        self.result = GameResult::Unknown;
        self.invalid = false;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        if key == b"Result" {
            self.result = GameResult::from_header(&String::from_utf8_lossy(value.as_bytes()));
        }
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true)
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.invalid {
            return;
        }

        match san_plus.san.to_move(&self.position) {
            Ok(m) => {
                self.position.play_unchecked(&m);
                self.moves.push(m);
            }
            Err(_) => self.invalid = true,
        }
    }

    fn end_game(&mut self) -> Self::Result {
        if self.invalid {
            None
        } else {
            Some(RawGame {
                result: self.result,
                moves: std::mem::take(&mut self.moves),
            })
        }
    }
}

/// Reads up to `max_games` games from a PGN stream, in stream order.
///
/// A stream shorter than the cap is not an error. Malformed games are
/// skipped as a whole and counted, never half-emitted.
pub fn load_games_from(read: impl Read, max_games: usize) -> Result<(Vec<RawGame>, usize)> {
    let mut reader = BufferedReader::new(read);
    let mut collector = GameCollector::new();
    let mut games = Vec::new();
    let mut skipped = 0usize;

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} reading corpus: {human_pos} games in {elapsed_precise} ({per_sec}) {msg}")
            .unwrap(),
    );

    while games.len() < max_games {
        match reader.read_game(&mut collector)? {
            Some(Some(game)) => {
                games.push(game);
                bar.inc(1);
            }
            Some(None) => {
                skipped += 1;
                bar.inc(1);
                bar.set_message(format!("[Skipped {skipped}]"));
            }
            None => break,
        }
    }

    bar.finish();

    Ok((games, skipped))
}

/// Loads up to `max_games` games from a PGN file on disk.
pub fn load_games(path: &Path, max_games: usize) -> Result<Vec<RawGame>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open corpus {}", path.display()))?;

    let (games, skipped) = load_games_from(file, max_games)
        .with_context(|| format!("failed to read corpus {}", path.display()))?;

    if skipped > 0 {
        eprintln!("warning: skipped {skipped} malformed games");
    }
    println!("Loaded {} games", games.len());

    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = "\
[Event \"test\"]
[Result \"1-0\"]

1. e4 e5 2. Nf3 Nc6 1-0

[Event \"test\"]
[Result \"1/2-1/2\"]

1. d4 d5 1/2-1/2
";

    #[test]
    fn reads_games_in_order() {
        let (games, skipped) = load_games_from(TWO_GAMES.as_bytes(), 100).unwrap();

        assert_eq!(games.len(), 2);
        assert_eq!(skipped, 0);
        assert_eq!(games[0].result, GameResult::WhiteWins);
        assert_eq!(games[0].moves.len(), 4);
        assert_eq!(games[1].result, GameResult::Draw);
        assert_eq!(games[1].moves.len(), 2);
    }

    #[test]
    fn honors_the_game_cap() {
        let (games, _) = load_games_from(TWO_GAMES.as_bytes(), 1).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].result, GameResult::WhiteWins);
    }

    #[test]
    fn short_stream_is_not_an_error() {
        let (games, skipped) = load_games_from(TWO_GAMES.as_bytes(), 1000).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn illegal_move_skips_the_whole_game() {
        let pgn = "\
[Result \"1-0\"]

1. e4 e5 2. Qd5 1-0

[Result \"0-1\"]

1. c4 c5 0-1
";
        let (games, skipped) = load_games_from(pgn.as_bytes(), 100).unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].result, GameResult::BlackWins);
        assert_eq!(games[0].moves.len(), 2);
    }

    #[test]
    fn missing_result_header_maps_to_unknown() {
        let pgn = "1. g3 g6 *\n";
        let (games, _) = load_games_from(pgn.as_bytes(), 100).unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].result, GameResult::Unknown);
    }

    #[test]
    fn target_sign_convention() {
        assert_eq!(GameResult::WhiteWins.target_for(Color::White), 1.0);
        assert_eq!(GameResult::WhiteWins.target_for(Color::Black), -1.0);
        assert_eq!(GameResult::BlackWins.target_for(Color::Black), 1.0);
        assert_eq!(GameResult::BlackWins.target_for(Color::White), -1.0);
        assert_eq!(GameResult::Draw.target_for(Color::White), 0.0);
        assert_eq!(GameResult::Unknown.target_for(Color::Black), 0.0);
    }
}
