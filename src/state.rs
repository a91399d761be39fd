//! Game state machine
//!
//! States, transitions with entry actions, per-frame handlers, and per-input
//! handlers. Frame handlers return the next state explicitly so every
//! transition trigger is visible in one place; `change_state` is the only
//! function that mutates the current state and runs entry actions exactly
//! once per transition.

use macroquad::rand::gen_range;

use crate::collision::{is_position_valid, try_wall_kick};
use crate::game::{GameWorld, LockRegion, SoundCue};
use crate::input::Keys;
use crate::math::{interpolate_angle, ANGLE_STEP_90, NUM_ZOOM_LEVELS};
use crate::pit::LAYER_COLORS;
use crate::shapes::{get_rotated_offset, NUM_SHAPES};

/// Frames a rotation animation takes.
pub const ROTATION_STEPS: u8 = 3;
/// Grace frames granted when a piece first touches down.
pub const LOCK_GRACE: u8 = 5;
/// Grace frames restored by a successful move during lock delay.
pub const LOCK_GRACE_MOVED: u8 = 15;
/// Viewport shake lengths.
pub const CLEAR_SHAKE_FRAMES: u8 = 8;
pub const GAME_OVER_SHAKE_FRAMES: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    StartScreen,
    Playing,
    Animating,
    FastDrop,
    Locking,
    Paused,
    GameOver,
}

pub struct StateMachine {
    pub current: GameState,
    pub previous: GameState,
    /// Frames remaining in a rotation animation.
    pub anim_counter: u8,
    /// Frames since the last gravity step.
    pub drop_timer: u16,
    /// Grace-period frames before locking.
    pub lock_delay: u8,
    pub need_static_redraw: bool,
    pub full_redraw_pending: bool,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: GameState::StartScreen,
            previous: GameState::StartScreen,
            anim_counter: 0,
            drop_timer: 0,
            lock_delay: 0,
            need_static_redraw: true,
            full_redraw_pending: true,
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameWorld {
    /// Switch states and run the entry action for the new state.
    pub fn change_state(&mut self, next: GameState) {
        self.state.previous = self.state.current;
        self.state.current = next;

        if self.state.previous == GameState::GameOver && next != GameState::GameOver {
            self.state.need_static_redraw = true;
            self.state.full_redraw_pending = true;
        }

        match next {
            GameState::Animating => self.state.anim_counter = ROTATION_STEPS,
            GameState::Locking => self.state.lock_delay = LOCK_GRACE,
            GameState::FastDrop => {
                self.state.drop_timer = 0;
                self.cues.push(SoundCue::Drop);
            }
            GameState::Playing => self.state.drop_timer = 0,
            GameState::GameOver => {
                self.state.need_static_redraw = true;
                self.shake_frames = GAME_OVER_SHAKE_FRAMES;
                self.cues.push(SoundCue::GameOver);
            }
            GameState::StartScreen => {
                self.score = 0;
                self.cubes_played = 0;
                self.state.need_static_redraw = true;
            }
            GameState::Paused => {}
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state.current {
            GameState::Paused => self.change_state(self.state.previous),
            GameState::GameOver | GameState::StartScreen => {}
            _ => self.change_state(GameState::Paused),
        }
    }

    /// Advance the simulation one vsync tick.
    pub fn step_frame(&mut self) {
        let next = match self.state.current {
            GameState::Playing => self.frame_playing(),
            GameState::Animating => self.frame_animating(),
            GameState::FastDrop => self.frame_fast_drop(),
            GameState::Locking => self.frame_locking(),
            GameState::StartScreen | GameState::Paused | GameState::GameOver => None,
        };
        if let Some(state) = next {
            self.change_state(state);
        }
    }

    fn can_fall(&self) -> bool {
        is_position_valid(
            &self.pit,
            self.piece.shape(),
            self.piece.angle,
            self.piece.x,
            self.piece.y,
            self.piece.z + 1,
        )
    }

    fn frame_playing(&mut self) -> Option<GameState> {
        self.state.drop_timer += 1;
        if self.state.drop_timer < self.drop_delay {
            return None;
        }
        self.state.drop_timer = 0;
        if self.can_fall() {
            self.piece.z += 1;
            None
        } else {
            Some(GameState::Locking)
        }
    }

    fn frame_animating(&mut self) -> Option<GameState> {
        let steps = self.state.anim_counter;
        for axis in 0..3 {
            self.piece.angle[axis] =
                interpolate_angle(self.piece.angle[axis], self.piece.target[axis], steps);
        }
        self.state.anim_counter -= 1;
        if self.state.anim_counter == 0 {
            self.piece.angle = self.piece.target;
            Some(GameState::Playing)
        } else {
            None
        }
    }

    fn frame_fast_drop(&mut self) -> Option<GameState> {
        if self.can_fall() {
            self.piece.z += 1;
            self.score += 2;
            None
        } else {
            Some(GameState::Locking)
        }
    }

    fn frame_locking(&mut self) -> Option<GameState> {
        self.state.lock_delay = self.state.lock_delay.saturating_sub(1);

        // A late move may have freed the piece.
        if self.can_fall() {
            return Some(GameState::Playing);
        }

        if self.state.lock_delay == 0 {
            self.lock_shape();
            if self.spawn_new_shape() {
                Some(GameState::Playing)
            } else {
                Some(GameState::GameOver)
            }
        } else {
            None
        }
    }

    /// Dispatch input to whatever the current state permits.
    pub fn handle_input(&mut self, keys: &Keys) {
        if keys.pause {
            self.toggle_pause();
            return;
        }

        match self.state.current {
            GameState::Playing => self.input_playing(keys),
            GameState::Locking => self.handle_movement_input(keys),
            GameState::GameOver => self.input_game_over(keys),
            GameState::StartScreen => self.input_start_screen(keys),
            GameState::Animating | GameState::FastDrop | GameState::Paused => {}
        }
    }

    fn input_playing(&mut self, keys: &Keys) {
        if keys.drop {
            self.change_state(GameState::FastDrop);
            return;
        }
        if keys.mode {
            self.draw_mode = self.draw_mode.toggled();
        }
        self.handle_movement_input(keys);
        self.handle_rotation_input(keys);
    }

    // Shared by Playing and Locking; rotation stays Playing-only, a move
    // during lock delay restores a fresh grace period instead.
    fn handle_movement_input(&mut self, keys: &Keys) {
        let moves: [(bool, i8, i8); 4] = [
            (keys.left, -1, 0),
            (keys.right, 1, 0),
            (keys.up, 0, -1),
            (keys.down, 0, 1),
        ];
        for (pressed, dx, dy) in moves {
            if !pressed {
                continue;
            }
            let valid = is_position_valid(
                &self.pit,
                self.piece.shape(),
                self.piece.angle,
                self.piece.x + dx,
                self.piece.y + dy,
                self.piece.z,
            );
            if valid {
                self.piece.x += dx;
                self.piece.y += dy;
                if self.state.current == GameState::Locking {
                    self.state.lock_delay = LOCK_GRACE_MOVED;
                }
            }
        }
    }

    fn handle_rotation_input(&mut self, keys: &Keys) {
        let current = self.piece.target;
        let mut next = current;
        if keys.rot_x_pos {
            next[0] = next[0].wrapping_add(ANGLE_STEP_90);
        }
        if keys.rot_x_neg {
            next[0] = next[0].wrapping_sub(ANGLE_STEP_90);
        }
        if keys.rot_y_pos {
            next[1] = next[1].wrapping_add(ANGLE_STEP_90);
        }
        if keys.rot_y_neg {
            next[1] = next[1].wrapping_sub(ANGLE_STEP_90);
        }
        if keys.rot_z_pos {
            next[2] = next[2].wrapping_add(ANGLE_STEP_90);
        }
        if keys.rot_z_neg {
            next[2] = next[2].wrapping_sub(ANGLE_STEP_90);
        }
        if next == current {
            return;
        }

        if let Some((kx, ky, kz)) = try_wall_kick(
            &self.pit,
            self.piece.shape(),
            next,
            self.piece.x,
            self.piece.y,
            self.piece.z,
        ) {
            self.piece.x = kx;
            self.piece.y = ky;
            self.piece.z = kz;
            self.piece.target = next;
            self.change_state(GameState::Animating);
        }
        // An exhausted kick search silently drops the request.
    }

    fn input_game_over(&mut self, keys: &Keys) {
        if keys.restart {
            self.pit.clear();
            self.change_state(GameState::StartScreen);
        }
    }

    fn input_start_screen(&mut self, keys: &Keys) {
        let sizes = [keys.size_small, keys.size_medium, keys.size_large];
        for (i, &pressed) in sizes.iter().enumerate() {
            if pressed && self.selected_pit_size != i {
                self.selected_pit_size = i;
                self.state.need_static_redraw = true;
            }
        }
        if keys.zoom_in && self.zoom_level + 1 < NUM_ZOOM_LEVELS {
            self.zoom_level += 1;
        }
        if keys.zoom_out && self.zoom_level > 0 {
            self.zoom_level -= 1;
        }
        if keys.start {
            self.start_game();
        }
    }

    /// Apply the selected pit size and begin play.
    pub fn start_game(&mut self) {
        self.apply_selected_pit_size();
        self.reset_game();
        self.next_shape_idx = gen_range(0, NUM_SHAPES);
        self.spawn_new_shape();
        self.change_state(GameState::Playing);
    }

    /// Promote the lookahead shape to current and reset the piece to the
    /// spawn cell. Returns false when the spawn position is already
    /// blocked, which is the one fatal condition of the simulation.
    pub fn spawn_new_shape(&mut self) -> bool {
        self.piece.shape_idx = self.next_shape_idx;
        self.next_shape_idx = gen_range(0, NUM_SHAPES);

        self.piece.x = (self.pit.width / 2) as i8;
        self.piece.y = (self.pit.depth / 2) as i8;
        self.piece.z = 0;
        self.piece.angle = [0; 3];
        self.piece.target = [0; 3];
        self.state.anim_counter = 0;

        if !is_position_valid(
            &self.pit,
            self.piece.shape(),
            self.piece.angle,
            self.piece.x,
            self.piece.y,
            self.piece.z,
        ) {
            return false;
        }

        self.cubes_played += self.piece.shape().num_blocks() as u16;
        self.level = 1 + (self.lines_cleared / 5) as u8;
        self.drop_delay = (60 - 10 * self.level as i32).max(10) as u16;
        true
    }

    /// Stamp the piece into the pit, queue the incremental redraw region,
    /// and run the line-clear scan.
    pub fn lock_shape(&mut self) {
        let shape = self.piece.shape();
        let mut min_x = self.pit.width as i8;
        let mut max_x = -1i8;
        let mut min_y = self.pit.depth as i8;
        let mut max_y = -1i8;
        let mut max_z = -1i8;

        for b in 0..shape.num_blocks() {
            let (rx, ry, rz) = get_rotated_offset(
                shape,
                b,
                self.piece.target[0],
                self.piece.target[1],
                self.piece.target[2],
            );
            let (ax, ay, az) = (self.piece.x + rx, self.piece.y + ry, self.piece.z + rz);
            if self.pit.contains(ax, ay, az) {
                self.pit
                    .set(ax as usize, ay as usize, az as usize, LAYER_COLORS[az as usize]);
                min_x = min_x.min(ax);
                max_x = max_x.max(ax);
                min_y = min_y.min(ay);
                max_y = max_y.max(ay);
                max_z = max_z.max(az);
            }
        }

        if max_z >= 0 {
            self.pending_lock = Some(LockRegion {
                min_x: (min_x - 1).max(0),
                max_x: (max_x + 1).min(self.pit.width as i8 - 1),
                min_y: (min_y - 1).max(0),
                max_y: (max_y + 1).min(self.pit.depth as i8 - 1),
                max_z,
            });
        }

        self.check_and_clear_layers();
    }

    /// Scan for complete layers after a lock, deepest first, re-checking an
    /// index after a clear since nearer layers shift down into it. Calling
    /// this again with no intervening lock clears nothing.
    pub fn check_and_clear_layers(&mut self) {
        let mut any_cleared = false;
        let mut z = self.pit.height as i32 - 1;
        while z >= 0 {
            if self.pit.is_layer_complete(z as usize) {
                if !any_cleared {
                    any_cleared = true;
                    self.shake_frames = CLEAR_SHAKE_FRAMES;
                    self.cues.push(SoundCue::ClearLevel);
                }
                self.clear_layer(z as usize);
            } else {
                z -= 1;
            }
        }

        if any_cleared {
            // A clear changes the pit non-locally; the cached static image
            // of every settled block is stale.
            self.state.need_static_redraw = true;
            self.state.full_redraw_pending = true;
        }
    }

    fn clear_layer(&mut self, z: usize) {
        self.pit.clear_layer(z);
        self.lines_cleared += 1;
        self.score += 100 * (self.level as u32 + 1);
        self.state.need_static_redraw = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn world_in_play(shape_idx: usize) -> GameWorld {
        macroquad::rand::srand(7);
        let mut world = GameWorld::new(&Settings::default());
        world.start_game();
        world.piece.shape_idx = shape_idx;
        world.piece.angle = [0; 3];
        world.piece.target = [0; 3];
        world.cues.clear();
        world
    }

    fn fill_layer(world: &mut GameWorld, z: usize) {
        for y in 0..world.pit.depth {
            for x in 0..world.pit.width {
                world.pit.set(x, y, z, LAYER_COLORS[z]);
            }
        }
    }

    #[test]
    fn gravity_advances_one_cell_per_drop_delay() {
        let mut world = world_in_play(0);
        let start_z = world.piece.z;
        for _ in 0..world.drop_delay {
            world.step_frame();
        }
        assert_eq!(world.piece.z, start_z + 1);
        assert_eq!(world.state.current, GameState::Playing);
    }

    #[test]
    fn blocked_fall_enters_locking_then_locks() {
        let mut world = world_in_play(0);
        world.piece.z = world.pit.height as i8 - 1;
        world.state.drop_timer = world.drop_delay;
        world.step_frame();
        assert_eq!(world.state.current, GameState::Locking);
        assert_eq!(world.state.lock_delay, LOCK_GRACE);

        for _ in 0..LOCK_GRACE {
            world.step_frame();
        }
        // Piece locked on the floor and the next one spawned at the mouth.
        assert!(world.pit.cell(2, 2, 7));
        assert_eq!(world.piece.z, 0);
        assert_eq!(world.state.current, GameState::Playing);
    }

    #[test]
    fn locking_reverts_when_the_piece_can_fall_again() {
        let mut world = world_in_play(0);
        // Resting on a single block, not on the floor.
        world.pit.set(2, 2, 5, 1);
        world.piece.z = 4;
        world.change_state(GameState::Locking);
        // Sideways escape: move right, support disappears from below.
        let keys = Keys {
            right: true,
            ..Keys::default()
        };
        world.handle_input(&keys);
        assert_eq!(world.state.lock_delay, LOCK_GRACE_MOVED);
        world.step_frame();
        assert_eq!(world.state.current, GameState::Playing);
        assert_eq!(world.piece.x, 3);
    }

    #[test]
    fn fast_drop_scores_per_cell_and_locks() {
        let mut world = world_in_play(0);
        let score = world.score;
        world.change_state(GameState::FastDrop);
        assert_eq!(world.cues, vec![SoundCue::Drop]);
        let cells = world.pit.height as i8 - 1 - world.piece.z;
        for _ in 0..cells {
            world.step_frame();
            assert_eq!(world.state.current, GameState::FastDrop);
        }
        assert_eq!(world.score, score + 2 * cells as u32);
        world.step_frame();
        assert_eq!(world.state.current, GameState::Locking);
    }

    #[test]
    fn blocked_spawn_ends_the_game() {
        let mut world = world_in_play(0);
        // Plug the spawn column all the way up.
        for z in 0..world.pit.height {
            world.pit.set(2, 2, z, 1);
        }
        world.piece.x = 0;
        world.piece.z = world.pit.height as i8 - 1;
        world.change_state(GameState::Locking);
        world.state.lock_delay = 1;
        world.step_frame();
        assert_eq!(world.state.current, GameState::GameOver);
        assert!(world.cues.contains(&SoundCue::GameOver));
        assert!(world.state.need_static_redraw);
    }

    #[test]
    fn rotation_animates_then_snaps_to_target() {
        let mut world = world_in_play(2);
        let keys = Keys {
            rot_z_pos: true,
            ..Keys::default()
        };
        world.handle_input(&keys);
        assert_eq!(world.state.current, GameState::Animating);
        assert_eq!(world.piece.target, [0, 0, ANGLE_STEP_90]);

        for _ in 0..ROTATION_STEPS {
            world.step_frame();
        }
        assert_eq!(world.state.current, GameState::Playing);
        assert_eq!(world.piece.angle, [0, 0, ANGLE_STEP_90]);
    }

    #[test]
    fn rotation_is_ignored_while_locking() {
        let mut world = world_in_play(2);
        world.piece.z = world.pit.height as i8 - 1;
        world.change_state(GameState::Locking);
        let keys = Keys {
            rot_z_pos: true,
            ..Keys::default()
        };
        world.handle_input(&keys);
        assert_eq!(world.state.current, GameState::Locking);
        assert_eq!(world.piece.target, [0, 0, 0]);
    }

    #[test]
    fn boundary_moves_stop_at_the_wall() {
        let mut world = world_in_play(2);
        assert_eq!((world.piece.x, world.piece.y), (2, 2));
        let left = Keys {
            left: true,
            ..Keys::default()
        };
        world.handle_input(&left);
        world.handle_input(&left);
        assert_eq!(world.piece.x, 0);
        world.handle_input(&left);
        assert_eq!(world.piece.x, 0, "move into the wall is rejected");
    }

    #[test]
    fn completed_layer_clears_and_shifts_on_lock() {
        let mut world = world_in_play(0);
        fill_layer(&mut world, 7);
        // Leave a marker above the cleared layer.
        world.pit.set(0, 0, 6, 9);
        // Lock a cube elsewhere, away from the full layer.
        world.piece.x = 0;
        world.piece.y = 0;
        world.piece.z = 5;
        let lines = world.lines_cleared;
        let score = world.score;
        world.lock_shape();
        assert_eq!(world.lines_cleared, lines + 1);
        assert!(world.score > score);
        // Marker shifted down into layer 7; the locked cube moved with it.
        assert!(world.pit.cell(0, 0, 7));
        assert!(world.pit.cell(0, 0, 6), "locked block shifted from 5 to 6");
        assert!(!world.pit.layer_has_blocks(0));
        assert!(world.state.full_redraw_pending);
        assert!(world.cues.contains(&SoundCue::ClearLevel));
    }

    #[test]
    fn clear_scan_is_idempotent_without_new_locks() {
        let mut world = world_in_play(0);
        fill_layer(&mut world, 7);
        world.check_and_clear_layers();
        let lines = world.lines_cleared;
        let score = world.score;
        world.check_and_clear_layers();
        assert_eq!(world.lines_cleared, lines);
        assert_eq!(world.score, score);
    }

    #[test]
    fn pause_round_trips_to_the_previous_state() {
        let mut world = world_in_play(0);
        world.toggle_pause();
        assert_eq!(world.state.current, GameState::Paused);
        world.step_frame();
        world.toggle_pause();
        assert_eq!(world.state.current, GameState::Playing);
    }

    #[test]
    fn restart_returns_to_start_screen_and_zeroes_score() {
        let mut world = world_in_play(0);
        world.score = 1234;
        world.pit.set(0, 0, 7, 1);
        world.change_state(GameState::GameOver);
        let keys = Keys {
            restart: true,
            ..Keys::default()
        };
        world.handle_input(&keys);
        assert_eq!(world.state.current, GameState::StartScreen);
        assert_eq!(world.score, 0);
        assert!(!world.pit.layer_has_blocks(7));
        assert!(world.state.full_redraw_pending);
    }

    #[test]
    fn level_and_drop_delay_follow_cleared_lines() {
        let mut world = world_in_play(0);
        world.lines_cleared = 10;
        world.spawn_new_shape();
        assert_eq!(world.level, 3);
        assert_eq!(world.drop_delay, 30);
        // Deep levels clamp at the minimum delay.
        world.lines_cleared = 100;
        world.spawn_new_shape();
        assert_eq!(world.drop_delay, 10);
    }
}
