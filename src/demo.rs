//! Attract-mode autoplay
//!
//! After the start screen sits idle long enough, the game plays itself:
//! each spawned piece gets a random lateral plan executed a few cells at a
//! time with occasional rotations (validated through the same wall-kick
//! resolver the player uses), then a forced fast drop. The demo resets its
//! game when the pit gets too full or the cycle's line target is reached,
//! and any key hands control back to the start screen.

use macroquad::rand::gen_range;

use crate::collision::{is_position_valid, try_wall_kick};
use crate::game::GameWorld;
use crate::math::ANGLE_STEP_90;
use crate::state::GameState;

/// Idle frames on the start screen before the demo takes over.
pub const DEMO_START_DELAY_FRAMES: u16 = 90;
/// Frames of settling time before a planned-out piece is dropped.
const DEMO_DROP_DELAY_FRAMES: u16 = 60;

pub struct DemoDriver {
    active: bool,
    idle_frames: u16,
    timer: u16,
    step_interval: u16,
    lines_base: u16,
    clear_target: u16,
    last_cubes_played: u16,
    move_dir_x: i8,
    move_dir_y: i8,
    steps_x: u8,
    steps_y: u8,
    movement_done: bool,
}

impl DemoDriver {
    pub fn new() -> Self {
        Self {
            active: false,
            idle_frames: 0,
            timer: 0,
            step_interval: 12,
            lines_base: 0,
            clear_target: 1,
            last_cubes_played: 0,
            move_dir_x: 0,
            move_dir_y: 0,
            steps_x: 0,
            steps_y: 0,
            movement_done: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Count start-screen idle time; returns true on the frame the demo
    /// takes over. Any key press restarts the countdown.
    pub fn idle_update(&mut self, world: &mut GameWorld, key_pressed: bool) -> bool {
        if world.state.current != GameState::StartScreen || self.active {
            self.idle_frames = 0;
            return false;
        }
        if key_pressed {
            self.idle_frames = 0;
            return false;
        }
        self.idle_frames += 1;
        if self.idle_frames >= DEMO_START_DELAY_FRAMES {
            self.idle_frames = 0;
            self.start(world);
            return true;
        }
        false
    }

    pub fn start(&mut self, world: &mut GameWorld) {
        if self.active {
            return;
        }
        self.active = true;
        world.apply_selected_pit_size();
        self.reset_cycle(world);
        world.change_state(GameState::Playing);
    }

    pub fn stop(&mut self, world: &mut GameWorld) {
        if !self.active {
            return;
        }
        self.active = false;
        self.idle_frames = 0;
        world.change_state(GameState::StartScreen);
        world.state.need_static_redraw = true;
        world.state.full_redraw_pending = true;
    }

    pub fn tick(&mut self, world: &mut GameWorld) {
        if !self.active {
            return;
        }

        if Self::should_reset(world) {
            self.reset_cycle(world);
            return;
        }

        // A new piece spawned since last frame: plan for it, or restart the
        // cycle once enough lines cleared.
        if world.cubes_played != self.last_cubes_played {
            self.last_cubes_played = world.cubes_played;
            if world.lines_cleared >= self.lines_base + self.clear_target {
                self.reset_cycle(world);
                return;
            }
            self.plan_random_movement(world);
        }

        if world.state.current != GameState::Playing {
            return;
        }

        self.timer += 1;

        if self.timer % self.step_interval == 0 && !self.movement_done {
            self.execute_movement_step(world);
        }

        if self.movement_done && self.timer > DEMO_DROP_DELAY_FRAMES {
            world.change_state(GameState::FastDrop);
            self.timer = 0;
        }
    }

    fn should_reset(world: &GameWorld) -> bool {
        world.pit.count_occupied_levels() >= world.pit.height - 2
    }

    fn reset_cycle(&mut self, world: &mut GameWorld) {
        world.reset_game();
        self.clear_target = gen_range(1, 3);
        self.lines_base = world.lines_cleared;
        self.timer = 0;

        world.next_shape_idx = gen_range(0, crate::shapes::NUM_SHAPES);
        world.spawn_new_shape();
        self.last_cubes_played = world.cubes_played;
        self.plan_random_movement(world);
    }

    fn plan_random_movement(&mut self, world: &GameWorld) {
        self.move_dir_x = if gen_range(0, 2) == 1 { 1 } else { -1 };
        self.steps_x = gen_range(0, world.pit.width / 2 + 2) as u8;
        self.move_dir_y = if gen_range(0, 2) == 1 { 1 } else { -1 };
        self.steps_y = gen_range(0, world.pit.depth / 2 + 2) as u8;
        self.step_interval = gen_range(8, 50);
        self.movement_done = false;
    }

    fn execute_movement_step(&mut self, world: &mut GameWorld) {
        if world.state.current == GameState::Animating {
            return;
        }

        let mut moved = false;

        if self.steps_x > 0 {
            let nx = world.piece.x + self.move_dir_x;
            if is_position_valid(
                &world.pit,
                world.piece.shape(),
                world.piece.angle,
                nx,
                world.piece.y,
                world.piece.z,
            ) {
                world.piece.x = nx;
                moved = true;
            }
            self.steps_x -= 1;
        }

        if !moved && self.steps_y > 0 {
            let ny = world.piece.y + self.move_dir_y;
            if is_position_valid(
                &world.pit,
                world.piece.shape(),
                world.piece.angle,
                world.piece.x,
                ny,
                world.piece.z,
            ) {
                world.piece.y = ny;
            }
            self.steps_y -= 1;
        }

        // Half the steps also try a rotation on a random axis, routed
        // through the same kick search as player input.
        if gen_range(0, 2) == 1 {
            let axis = gen_range(0, 3);
            let mut next = world.piece.target;
            next[axis] = next[axis].wrapping_add(ANGLE_STEP_90);
            if let Some((kx, ky, kz)) = try_wall_kick(
                &world.pit,
                world.piece.shape(),
                next,
                world.piece.x,
                world.piece.y,
                world.piece.z,
            ) {
                world.piece.x = kx;
                world.piece.y = ky;
                world.piece.z = kz;
                world.piece.target = next;
                world.change_state(GameState::Animating);
                return;
            }
        }

        if self.steps_x == 0 && self.steps_y == 0 {
            self.movement_done = true;
        }
    }
}

impl Default for DemoDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn fresh_world() -> GameWorld {
        macroquad::rand::srand(11);
        GameWorld::new(&Settings::default())
    }

    #[test]
    fn demo_starts_after_idle_threshold() {
        let mut world = fresh_world();
        let mut demo = DemoDriver::new();
        for _ in 0..DEMO_START_DELAY_FRAMES - 1 {
            assert!(!demo.idle_update(&mut world, false));
        }
        assert!(demo.idle_update(&mut world, false));
        assert!(demo.is_active());
        assert_eq!(world.state.current, GameState::Playing);
    }

    #[test]
    fn key_presses_reset_the_idle_counter() {
        let mut world = fresh_world();
        let mut demo = DemoDriver::new();
        for _ in 0..DEMO_START_DELAY_FRAMES - 1 {
            demo.idle_update(&mut world, false);
        }
        assert!(!demo.idle_update(&mut world, true));
        // Counter restarted: one more quiet frame is nowhere near enough.
        assert!(!demo.idle_update(&mut world, false));
        assert!(!demo.is_active());
    }

    #[test]
    fn stop_returns_to_start_screen() {
        let mut world = fresh_world();
        let mut demo = DemoDriver::new();
        demo.start(&mut world);
        assert!(demo.is_active());
        demo.stop(&mut world);
        assert!(!demo.is_active());
        assert_eq!(world.state.current, GameState::StartScreen);
        assert!(world.state.full_redraw_pending);
    }

    #[test]
    fn overfull_pit_resets_the_demo_game() {
        let mut world = fresh_world();
        let mut demo = DemoDriver::new();
        demo.start(&mut world);
        // Put a block on almost every layer.
        for z in 0..world.pit.height - 2 {
            world.pit.set(0, 0, z, 1);
        }
        demo.tick(&mut world);
        assert_eq!(world.pit.count_occupied_levels(), 0, "pit cleared on reset");
        assert_eq!(world.lines_cleared, 0, "counters reset with the game");
    }

    #[test]
    fn finished_plan_forces_a_fast_drop() {
        let mut world = fresh_world();
        let mut demo = DemoDriver::new();
        demo.start(&mut world);
        demo.steps_x = 0;
        demo.steps_y = 0;
        demo.movement_done = true;
        demo.timer = DEMO_DROP_DELAY_FRAMES + 1;
        demo.tick(&mut world);
        assert_eq!(world.state.current, GameState::FastDrop);
    }
}
