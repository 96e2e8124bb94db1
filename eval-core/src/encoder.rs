use eval_constants::{
    CENTER_OFFSET, INPUT_SIZE, KING_SAFETY_OFFSET, MATERIAL_OFFSET, MOBILITY_OFFSET,
    occupancy_index,
};
use shakmaty::{Chess, Color, File, Piece, Position, Rank, Role, Square};

/// Roles in feature order. Material slots and the per-square one-hot block
/// both follow this ordering.
const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

/// Center squares in feature order.
const CENTER: [Square; 4] = [Square::E4, Square::D4, Square::E5, Square::D5];

fn piece_class(piece: Piece) -> usize {
    let role = match piece.role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    };

    match piece.color {
        Color::White => role,
        Color::Black => role + 6,
    }
}

/// Encodes a position into the fixed 896-element feature vector.
///
/// Deterministic and total: every reachable board state maps to a vector,
/// and a side without a king simply contributes nothing to its
/// king-safety slot.
pub fn encode(position: &Chess) -> [f32; INPUT_SIZE] {
    let mut features = [0.0f32; INPUT_SIZE];
    let board = position.board();
    let occupied = board.occupied();

    // One-hot occupancy, rank 8 down to rank 1, file a through h.
    for rank_from_top in 0..8 {
        for file in 0..8 {
            let square = Square::from_coords(
                File::new(file as u32),
                Rank::new(7 - rank_from_top as u32),
            );

            if let Some(piece) = board.piece_at(square) {
                features[occupancy_index(rank_from_top, file, piece_class(piece))] = 1.0;
            }
        }
    }

    // Material counts per role, white then black.
    for (i, role) in ROLES.iter().enumerate() {
        let white = board.by_piece(Piece {
            color: Color::White,
            role: *role,
        });
        let black = board.by_piece(Piece {
            color: Color::Black,
            role: *role,
        });

        features[MATERIAL_OFFSET + 2 * i] = white.count() as f32;
        features[MATERIAL_OFFSET + 2 * i + 1] = black.count() as f32;
    }

    // Attackers on the center squares, white then black.
    for (i, square) in CENTER.iter().enumerate() {
        let white = board.attacks_to(*square, Color::White, occupied);
        let black = board.attacks_to(*square, Color::Black, occupied);

        features[CENTER_OFFSET + 2 * i] = white.count() as f32;
        features[CENTER_OFFSET + 2 * i + 1] = black.count() as f32;
    }

    // Attackers on each king square by the opposing side.
    if let Some(square) = board.king_of(Color::White) {
        features[KING_SAFETY_OFFSET] = board.attacks_to(square, Color::Black, occupied).count() as f32;
    }
    if let Some(square) = board.king_of(Color::Black) {
        features[KING_SAFETY_OFFSET + 1] =
            board.attacks_to(square, Color::White, occupied).count() as f32;
    }

    // Legal moves of the side to move. The slot for the side not to move
    // stays 0, a fixed policy of this encoding scheme.
    let mobility = position.legal_moves().len() as f32;
    match position.turn() {
        Color::White => features[MOBILITY_OFFSET] = mobility,
        Color::Black => features[MOBILITY_OFFSET + 1] = mobility,
    }

    features
}
