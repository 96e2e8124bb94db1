//! Layout of the 896-element feature vector fed to the evaluation network.
//!
//! The first 768 slots are one-hot occupancy: squares are iterated from
//! rank 8 down to rank 1, file a through h, and each square owns 12
//! consecutive slots ordered white P N B R Q K then black p n b r q k.
//! The remaining 128 slots hold aggregate scalars; unused slots stay 0.

pub const BOARD_SQUARES: usize = 64;
pub const PIECE_CLASSES: usize = 12;

pub const OCCUPANCY_SIZE: usize = BOARD_SQUARES * PIECE_CLASSES;
pub const AGGREGATE_SIZE: usize = 128;

pub const INPUT_SIZE: usize = OCCUPANCY_SIZE + AGGREGATE_SIZE;

/// Material counts per role, white slot then black slot (12 values).
pub const MATERIAL_OFFSET: usize = OCCUPANCY_SIZE;
/// Attacker counts on e4, d4, e5, d5, white slot then black slot (8 values).
pub const CENTER_OFFSET: usize = MATERIAL_OFFSET + 12;
/// Attackers on the white king square, then on the black king square.
pub const KING_SAFETY_OFFSET: usize = CENTER_OFFSET + 8;
/// Legal-move count of the side to move; the other side's slot stays 0.
pub const MOBILITY_OFFSET: usize = KING_SAFETY_OFFSET + 2;

/// Widths of the feed-forward evaluation network.
pub const HIDDEN_1: usize = 2048;
pub const HIDDEN_2: usize = 1024;
pub const HIDDEN_3: usize = 512;
pub const HEAD: usize = 256;

/// One-hot slot for a piece class on a square.
///
/// `rank_from_top` is 0 for rank 8 and 7 for rank 1, `file` is 0 for the
/// a-file, `piece_class` is 0..12 in the order documented above.
pub const fn occupancy_index(rank_from_top: usize, file: usize, piece_class: usize) -> usize {
    assert!(rank_from_top < 8);
    assert!(file < 8);
    assert!(piece_class < PIECE_CLASSES);

    (rank_from_top * 8 + file) * PIECE_CLASSES + piece_class
}
