//! Keyboard snapshot with named key bits
//!
//! Polled once per frame; every bit is edge-triggered (set only on the
//! frame the key goes down), which is what the state machine handlers
//! expect for moves, rotations, and menu input.

use macroquad::prelude::{get_keys_pressed, is_key_pressed, KeyCode};

#[derive(Debug, Clone, Copy, Default)]
pub struct Keys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,

    pub rot_x_pos: bool,
    pub rot_x_neg: bool,
    pub rot_y_pos: bool,
    pub rot_y_neg: bool,
    pub rot_z_pos: bool,
    pub rot_z_neg: bool,

    pub drop: bool,
    pub pause: bool,
    pub restart: bool,
    pub quit: bool,
    pub start: bool,
    pub mode: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,

    pub size_small: bool,
    pub size_medium: bool,
    pub size_large: bool,

    /// Any key at all went down this frame (wakes up / stops the demo).
    pub any: bool,
}

impl Keys {
    pub fn poll() -> Self {
        Self {
            left: is_key_pressed(KeyCode::Left),
            right: is_key_pressed(KeyCode::Right),
            up: is_key_pressed(KeyCode::Up),
            down: is_key_pressed(KeyCode::Down),

            rot_x_pos: is_key_pressed(KeyCode::Q),
            rot_x_neg: is_key_pressed(KeyCode::A),
            rot_y_pos: is_key_pressed(KeyCode::W),
            rot_y_neg: is_key_pressed(KeyCode::S),
            rot_z_pos: is_key_pressed(KeyCode::E),
            rot_z_neg: is_key_pressed(KeyCode::D),

            drop: is_key_pressed(KeyCode::Space),
            pause: is_key_pressed(KeyCode::P),
            restart: is_key_pressed(KeyCode::R),
            quit: is_key_pressed(KeyCode::Escape),
            start: is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::Space),
            mode: is_key_pressed(KeyCode::M),
            zoom_in: is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd),
            zoom_out: is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract),

            size_small: is_key_pressed(KeyCode::Key1),
            size_medium: is_key_pressed(KeyCode::Key2),
            size_large: is_key_pressed(KeyCode::Key3),

            any: !get_keys_pressed().is_empty(),
        }
    }
}
