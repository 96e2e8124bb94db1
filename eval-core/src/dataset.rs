use eval_constants::INPUT_SIZE;
use shakmaty::{Chess, Position};

use crate::corpus::RawGame;
use crate::encoder::encode;

/// Flat feature/target arrays, one entry per (game, position-after-move)
/// pair in corpus order.
pub struct Dataset {
    pub features: Vec<f32>,
    pub targets: Vec<f32>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Replays every game from the starting position and emits one training
/// example per half-move. The target reflects the game result from the
/// perspective of the side to move *after* the move.
pub fn build_dataset(games: &[RawGame]) -> Dataset {
    let mut features = Vec::new();
    let mut targets = Vec::new();

    for game in games {
        let mut position = Chess::default();

        for m in &game.moves {
            position.play_unchecked(m);

            features.extend_from_slice(&encode(&position));
            targets.push(game.result.target_for(position.turn()));
        }
    }

    // Internal contract, violating it is a programmer error.
    assert_eq!(features.len(), targets.len() * INPUT_SIZE);

    Dataset { features, targets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::load_games_from;

    fn games_from(pgn: &str) -> Vec<RawGame> {
        let (games, skipped) = load_games_from(pgn.as_bytes(), usize::MAX).unwrap();
        assert_eq!(skipped, 0);
        games
    }

    #[test]
    fn one_example_per_half_move() {
        let games = games_from("[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n");
        let dataset = build_dataset(&games);

        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.features.len(), 4 * INPUT_SIZE);
        assert!(dataset.targets.iter().all(|t| [-1.0, 0.0, 1.0].contains(t)));
    }

    #[test]
    fn white_win_targets_alternate_by_side_to_move() {
        let games = games_from("[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n");
        let dataset = build_dataset(&games);

        // after white's move black is to move and is losing, and vice versa
        assert_eq!(dataset.targets, vec![-1.0, 1.0, -1.0, 1.0]);
    }

    #[test]
    fn black_win_targets_flip() {
        let games = games_from("[Result \"0-1\"]\n\n1. f3 e5 2. g4 Qh4# 0-1\n");
        let dataset = build_dataset(&games);

        assert_eq!(dataset.targets, vec![1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn drawn_and_unknown_games_target_zero() {
        let games = games_from(
            "[Result \"1/2-1/2\"]\n\n1. d4 d5 1/2-1/2\n\n[Result \"*\"]\n\n1. c4 c5 *\n",
        );
        let dataset = build_dataset(&games);

        assert_eq!(dataset.len(), 4);
        assert!(dataset.targets.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn order_is_deterministic() {
        let pgn = "[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n";
        let a = build_dataset(&games_from(pgn));
        let b = build_dataset(&games_from(pgn));

        assert_eq!(a.features, b.features);
        assert_eq!(a.targets, b.targets);
    }

    #[test]
    fn empty_corpus_builds_an_empty_dataset() {
        let dataset = build_dataset(&[]);
        assert!(dataset.is_empty());
        assert_eq!(dataset.features.len(), 0);
    }
}
