//! Turns a PGN corpus into in-memory training data for the evaluation
//! network: parsed games, encoded positions and outcome targets.

pub mod corpus;
pub mod dataset;
pub mod encoder;

pub use corpus::{GameResult, RawGame, load_games, load_games_from};
pub use dataset::{Dataset, build_dataset};
pub use encoder::encode;
