//! Cubewell: a Blockout-style falling-polycube game
//!
//! A 3D piece falls into a pit viewed head-on. Everything is simulated and
//! drawn the way a small fixed-point machine would have it: trig and
//! perspective from lookup tables, discrete 90-degree rotations with
//! half-block pivots, an indexed-color software renderer with a quad
//! scan-fill, and a double-buffered viewport over a dirty-flagged static
//! plane. One simulation step per frame, no partial-frame state anywhere.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod collision;
mod config;
mod demo;
mod game;
mod gfx;
mod hud;
mod input;
mod math;
mod pit;
mod render;
mod shapes;
mod sound;
mod state;

use macroquad::prelude::*;
use macroquad::rand::{gen_range, srand};

use config::Settings;
use demo::DemoDriver;
use game::{DrawMode, GameWorld, SoundCue};
use gfx::{
    Buffer, DoubleBuffer, Plane, SCREEN_HEIGHT, SCREEN_WIDTH, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
    VIEWPORT_X, VIEWPORT_Y,
};
use input::Keys;
use math::{GridCache, Tables};
use render::RotationCache;
use sound::SoundEngine;
use state::GameState;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Cubewell v{}", VERSION),
        window_width: SCREEN_WIDTH as i32 * 3,
        window_height: SCREEN_HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Uniform scale and centering offset fitting the virtual screen into the
/// window.
fn screen_fit() -> (f32, Vec2) {
    let scale = (screen_width() / SCREEN_WIDTH as f32).min(screen_height() / SCREEN_HEIGHT as f32);
    let origin = vec2(
        (screen_width() - SCREEN_WIDTH as f32 * scale) / 2.0,
        (screen_height() - SCREEN_HEIGHT as f32 * scale) / 2.0,
    );
    (scale, origin)
}

#[macroquad::main(window_conf)]
async fn main() {
    srand(macroquad::miniquad::date::now() as u64);

    let tables = Tables::new();
    let settings = Settings::load();
    let mut world = GameWorld::new(&settings);

    let mut grid = GridCache::new();
    grid.recompute(&tables, world.pit.width, world.pit.depth, world.pit.height);
    let mut grid_dims = (world.pit.width, world.pit.depth);

    let mut static_buf = Buffer::new(SCREEN_WIDTH, SCREEN_HEIGHT);
    let mut static_plane = Plane::new(SCREEN_WIDTH, SCREEN_HEIGHT);
    let mut static_stale = true;

    let mut viewport = DoubleBuffer::new(VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
    let mut viewport_plane = Plane::new(VIEWPORT_WIDTH, VIEWPORT_HEIGHT);

    let mut rot_cache = RotationCache::new();
    let mut audio = SoundEngine::new();
    let mut demo = DemoDriver::new();
    let title_bitmap = gfx::load_title_bitmap("assets/title.png");

    println!("=== Cubewell v{} ===", VERSION);

    loop {
        // Input first: the whole frame sees one keyboard snapshot.
        let keys = Keys::poll();

        if demo.is_active() {
            if keys.any {
                demo.stop(&mut world);
            } else {
                demo.tick(&mut world);
            }
        } else {
            if keys.quit {
                break;
            }
            world.handle_input(&keys);
            demo.idle_update(&mut world, keys.any);
        }

        world.step_frame();

        // A new game may have changed the pit size; the projection cache
        // follows it.
        if (world.pit.width, world.pit.depth) != grid_dims {
            grid_dims = (world.pit.width, world.pit.depth);
            grid.recompute(&tables, world.pit.width, world.pit.depth, world.pit.height);
        }

        // Freshly locked blocks repaint only their region of the static
        // plane.
        if let Some(region) = world.pending_lock.take() {
            render::draw_incremental_lock(&mut static_buf, &grid, &world.pit, &region);
            render::draw_level_indicator(&mut static_buf, &world.pit);
            static_stale = true;
        }

        for cue in world.cues.drain(..) {
            match cue {
                SoundCue::Drop => audio.play_drop_sound(),
                SoundCue::ClearLevel => audio.play_clear_level_sound(),
                SoundCue::GameOver => audio.start_game_over_sound(),
            }
        }
        audio.update();

        if world.state.need_static_redraw {
            static_buf.erase();
            if world.state.current == GameState::StartScreen {
                static_buf.draw_rect(0, 0, SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32, gfx::GREEN);
                if let Some(bmp) = &title_bitmap {
                    static_buf.blit_indices(
                        bmp,
                        (SCREEN_WIDTH as i32 - bmp.width as i32) / 2,
                        (SCREEN_HEIGHT as i32 / 3 - bmp.height as i32 / 2).max(0),
                    );
                }
            } else {
                render::draw_pit_background(&mut static_buf, &tables, &world.pit);
                render::draw_settled_blocks(&mut static_buf, &grid, &world.pit);
                render::draw_level_indicator(&mut static_buf, &world.pit);
            }
            world.state.need_static_redraw = false;
            world.state.full_redraw_pending = false;
            static_stale = true;
        }

        // The falling piece goes into the back buffer, then the buffers
        // swap; a pause freezes the front buffer instead of redrawing.
        let animating = world.state.current == GameState::Animating;
        let paused = world.state.current == GameState::Paused;
        if !paused || animating {
            let back = viewport.back_mut();
            back.erase();
            let piece_visible = matches!(
                world.state.current,
                GameState::Playing | GameState::Animating | GameState::FastDrop | GameState::Locking
            );
            if piece_visible {
                render::draw_falling_shape(back, &world, &tables, &mut rot_cache);
            }
            viewport.swap();
            viewport_plane.present(viewport.front(), true);
        }

        if static_stale {
            static_plane.present(&static_buf, false);
            static_stale = false;
        }

        clear_background(BLACK);
        let (scale, origin) = screen_fit();
        static_plane.draw(origin, scale, 0, 0);

        let (shake_x, shake_y) = if world.shake_frames > 0 {
            world.shake_frames -= 1;
            (gen_range(-2, 3), gen_range(-2, 3))
        } else {
            (0, 0)
        };
        viewport_plane.draw(
            origin,
            scale,
            VIEWPORT_X as i32 + shake_x,
            VIEWPORT_Y as i32 + shake_y,
        );

        hud::draw_hud(&world, demo.is_active(), scale, origin);

        next_frame().await;
    }

    let settings = Settings {
        pit_size: world.selected_pit_size,
        zoom_level: world.zoom_level,
        wireframe: world.draw_mode == DrawMode::Wireframe,
    };
    if let Err(e) = settings.save() {
        eprintln!("{}", e);
    }
}
