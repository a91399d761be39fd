//! Text overlay: score block, control help, and state banners
//!
//! Drawn with macroquad text on top of the pixel planes, in virtual-screen
//! coordinates scaled to the window.

use macroquad::prelude::*;

use crate::config::PIT_SIZES;
use crate::game::GameWorld;
use crate::state::GameState;

const HUD_GREEN: Color = Color::new(0.33, 1.0, 0.33, 1.0);
const HUD_GRAY: Color = Color::new(0.66, 0.66, 0.66, 1.0);

pub fn draw_hud(world: &GameWorld, demo_active: bool, scale: f32, origin: Vec2) {
    let text = |s: &str, x: f32, y: f32, size: f32, color: Color| {
        draw_text(s, origin.x + x * scale, origin.y + y * scale, size * scale, color);
    };

    text("CUBEWELL", 258.0, 14.0, 10.0, HUD_GREEN);

    match world.state.current {
        GameState::StartScreen => {
            text("PIT SIZE", 122.0, 60.0, 10.0, HUD_GREEN);
            for (i, side) in PIT_SIZES.iter().enumerate() {
                let marker = if world.selected_pit_size == i { ">" } else { " " };
                let line = format!("{} [{}] {}X{}", marker, i + 1, side, side);
                let color = if world.selected_pit_size == i {
                    WHITE
                } else {
                    HUD_GRAY
                };
                text(&line, 122.0, 78.0 + i as f32 * 12.0, 9.0, color);
            }
            text("ENTER TO START", 112.0, 126.0, 9.0, HUD_GREEN);
            text("[ARRS] MOVE  [Q/W/E A/S/D] ROTATE", 66.0, 150.0, 8.0, HUD_GRAY);
            text("[SPC] DROP   [P] PAUSE  [+/-] ZOOM", 66.0, 160.0, 8.0, HUD_GRAY);
        }
        _ => {
            text("SCORE", 258.0, 40.0, 9.0, HUD_GRAY);
            text(&format!("{}", world.score), 258.0, 50.0, 9.0, WHITE);
            text("LEVEL", 258.0, 66.0, 9.0, HUD_GRAY);
            text(&format!("{}", world.level), 258.0, 76.0, 9.0, WHITE);
            text("LINES", 258.0, 92.0, 9.0, HUD_GRAY);
            text(&format!("{}", world.lines_cleared), 258.0, 102.0, 9.0, WHITE);
            text("CUBES", 258.0, 118.0, 9.0, HUD_GRAY);
            text(&format!("{}", world.cubes_played), 258.0, 128.0, 9.0, WHITE);
        }
    }

    match world.state.current {
        GameState::Paused => {
            text("PAUSED", 104.0, 90.0, 16.0, WHITE);
        }
        GameState::GameOver => {
            text("GAME OVER", 92.0, 86.0, 16.0, WHITE);
            text("[R] RESTART", 104.0, 102.0, 9.0, HUD_GREEN);
        }
        _ => {}
    }

    if demo_active {
        text("DEMO - PRESS ANY KEY", 92.0, 172.0, 9.0, WHITE);
    }
}
