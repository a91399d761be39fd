//! Placement validity and the wall-kick search.

use crate::pit::Pit;
use crate::shapes::{get_rotated_offset, Shape};

/// A candidate placement is valid when every block of the shape, at the
/// given orientation, lands in bounds on an empty cell.
pub fn is_rotation_valid_at(
    pit: &Pit,
    shape: &Shape,
    angles: [u8; 3],
    x: i8,
    y: i8,
    z: i8,
) -> bool {
    for b in 0..shape.num_blocks() {
        let (rx, ry, rz) = get_rotated_offset(shape, b, angles[0], angles[1], angles[2]);
        let (ax, ay, az) = (x + rx, y + ry, z + rz);
        if !pit.contains(ax, ay, az) || pit.occupied_at(ax, ay, az) {
            return false;
        }
    }
    true
}

/// Same check against the piece's current orientation.
pub fn is_position_valid(pit: &Pit, shape: &Shape, angles: [u8; 3], x: i8, y: i8, z: i8) -> bool {
    is_rotation_valid_at(pit, shape, angles, x, y, z)
}

/// Kick candidates in fixed priority order: single steps, then two-step
/// corner kicks, then diagonals, then diagonals with depth. The order is
/// part of the play-feel and must not be reordered.
pub const KICK_OFFSETS: [[i8; 3]; 22] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
    [2, 0, 0],
    [-2, 0, 0],
    [0, 2, 0],
    [0, -2, 0],
    [1, 1, 0],
    [1, -1, 0],
    [-1, 1, 0],
    [-1, -1, 0],
    [1, 0, 1],
    [-1, 0, 1],
    [0, 1, 1],
    [0, -1, 1],
    [1, 0, -1],
    [-1, 0, -1],
    [0, 1, -1],
    [0, -1, -1],
];

/// Find a placement for a requested orientation: the current position
/// first, then each kick offset in priority order. `None` drops the
/// rotation request.
pub fn try_wall_kick(
    pit: &Pit,
    shape: &Shape,
    new_angles: [u8; 3],
    x: i8,
    y: i8,
    z: i8,
) -> Option<(i8, i8, i8)> {
    if is_rotation_valid_at(pit, shape, new_angles, x, y, z) {
        return Some((x, y, z));
    }

    for kick in KICK_OFFSETS.iter() {
        let (tx, ty, tz) = (x + kick[0], y + kick[1], z + kick[2]);
        if is_rotation_valid_at(pit, shape, new_angles, tx, ty, tz) {
            return Some((tx, ty, tz));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ANGLE_STEP_90;
    use crate::shapes::SHAPES;

    const REST: [u8; 3] = [0, 0, 0];

    #[test]
    fn boundary_move_is_rejected_at_the_wall() {
        // 5x5x8 pit, 3-block I at the spawn center.
        let pit = Pit::new(5, 5);
        let shape = &SHAPES[2];
        let (mut x, y, z) = (2i8, 2i8, 0i8);

        assert!(is_position_valid(&pit, shape, REST, x - 1, y, z));
        x -= 1;
        assert!(is_position_valid(&pit, shape, REST, x - 1, y, z));
        x -= 1;
        assert_eq!(x, 0);
        // Third step left leaves the pit; position stays unchanged.
        assert!(!is_position_valid(&pit, shape, REST, x - 1, y, z));
    }

    #[test]
    fn occupied_cells_reject_placement() {
        let mut pit = Pit::new(5, 5);
        let shape = &SHAPES[0];
        pit.set(2, 2, 4, 1);
        assert!(is_position_valid(&pit, shape, REST, 2, 2, 3));
        assert!(!is_position_valid(&pit, shape, REST, 2, 2, 4));
    }

    #[test]
    fn wall_kick_prefers_the_unkicked_position() {
        let pit = Pit::new(5, 5);
        let shape = &SHAPES[2];
        let turned = [0, 0, ANGLE_STEP_90];
        assert_eq!(try_wall_kick(&pit, shape, turned, 2, 2, 0), Some((2, 2, 0)));
    }

    #[test]
    fn wall_kick_finds_single_step_before_larger_kicks() {
        // L+ at x=3 with its right column against occupied (4,2,2): the
        // requested Y quarter-turn swings a block into that cell, the +x
        // kick runs out of the pit, so the first workable candidate is the
        // single -x step.
        let mut pit = Pit::new(5, 5);
        pit.set(4, 2, 2, 1);
        let shape = &SHAPES[7];
        let turned = [0, ANGLE_STEP_90, 0];
        assert!(!is_rotation_valid_at(&pit, shape, turned, 3, 2, 2));
        assert!(!is_rotation_valid_at(&pit, shape, turned, 4, 2, 2));
        assert_eq!(try_wall_kick(&pit, shape, turned, 3, 2, 2), Some((2, 2, 2)));
    }

    #[test]
    fn wall_kick_never_returns_an_invalid_placement() {
        let mut pit = Pit::new(4, 4);
        // A ragged floor with a one-cell chimney.
        for y in 0..4 {
            for x in 0..4 {
                if (x, y) != (1, 1) {
                    pit.set(x, y, 7, 1);
                }
                if x >= 2 {
                    pit.set(x, y, 6, 1);
                }
            }
        }
        for shape in SHAPES.iter() {
            for &ax in &[0u8, 64, 128, 192] {
                for &az in &[0u8, 64] {
                    let angles = [ax, 0, az];
                    for x in 0..4i8 {
                        for z in 4..8i8 {
                            if let Some((kx, ky, kz)) =
                                try_wall_kick(&pit, shape, angles, x, 1, z)
                            {
                                assert!(
                                    is_rotation_valid_at(&pit, shape, angles, kx, ky, kz),
                                    "{} kicked to an invalid cell",
                                    shape.name
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn kick_table_priority_shape() {
        // Single steps first, doubles next, diagonals after; depth
        // diagonals close the list.
        assert_eq!(KICK_OFFSETS[0], [1, 0, 0]);
        assert_eq!(KICK_OFFSETS[1], [-1, 0, 0]);
        assert!(KICK_OFFSETS[..6].iter().all(|k| k.iter().map(|v| v.abs()).sum::<i8>() == 1));
        assert!(KICK_OFFSETS[6..10].iter().all(|k| k.iter().map(|v| v.abs()).sum::<i8>() == 2
            && k.iter().filter(|v| **v != 0).count() == 1));
        assert!(KICK_OFFSETS[10..].iter().all(|k| k.iter().filter(|v| **v != 0).count() == 2));
    }
}
