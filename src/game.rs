//! Game world aggregate
//!
//! One struct owns every piece of mutable game state: the pit, the falling
//! piece, the state machine, and the session counters. Exactly one frame
//! handler writes to it per tick, so there are no partial-frame states for
//! the renderer to observe. Side effects that need a device (sound, the
//! incremental static-buffer redraw) are queued here and drained by the
//! main loop.

use crate::config::{Settings, PIT_SIZES};
use crate::gfx::VIEWPORT_WIDTH;
use crate::pit::Pit;
use crate::shapes::{Shape, SHAPES};
use crate::state::StateMachine;

/// How the falling piece is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Wireframe,
    Points,
}

impl DrawMode {
    pub fn toggled(self) -> Self {
        match self {
            DrawMode::Wireframe => DrawMode::Points,
            DrawMode::Points => DrawMode::Wireframe,
        }
    }
}

/// Fire-and-forget audio requests drained by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Drop,
    ClearLevel,
    GameOver,
}

/// Pit region touched by the last lock, for the incremental static redraw.
#[derive(Debug, Clone, Copy)]
pub struct LockRegion {
    pub min_x: i8,
    pub max_x: i8,
    pub min_y: i8,
    pub max_y: i8,
    pub max_z: i8,
}

/// The falling piece. Angles are 8-bit turn units and are multiples of 64
/// whenever the state machine is at rest; only the rotation animation
/// produces intermediate values.
pub struct Piece {
    pub shape_idx: usize,
    pub x: i8,
    pub y: i8,
    pub z: i8,
    pub angle: [u8; 3],
    pub target: [u8; 3],
}

impl Piece {
    pub fn shape(&self) -> &'static Shape {
        &SHAPES[self.shape_idx]
    }
}

pub struct GameWorld {
    pub pit: Pit,
    pub piece: Piece,
    pub state: StateMachine,

    pub score: u32,
    pub lines_cleared: u16,
    pub cubes_played: u16,
    pub level: u8,
    /// Frames between gravity steps at the current level.
    pub drop_delay: u16,
    /// Single-slot lookahead; becomes current on spawn.
    pub next_shape_idx: usize,

    pub selected_pit_size: usize,
    pub zoom_level: usize,
    pub draw_mode: DrawMode,

    pub shake_frames: u8,
    pub cues: Vec<SoundCue>,
    pub pending_lock: Option<LockRegion>,
}

impl GameWorld {
    pub fn new(settings: &Settings) -> Self {
        let (w, d) = Self::pit_dims(settings.pit_size);
        Self {
            pit: Pit::new(w, d),
            piece: Piece {
                shape_idx: 0,
                x: (w / 2) as i8,
                y: (d / 2) as i8,
                z: 0,
                angle: [0; 3],
                target: [0; 3],
            },
            state: StateMachine::new(),
            score: 0,
            lines_cleared: 0,
            cubes_played: 0,
            level: 1,
            drop_delay: 50,
            next_shape_idx: 0,
            selected_pit_size: settings.pit_size,
            zoom_level: settings.zoom_level,
            draw_mode: if settings.wireframe {
                DrawMode::Wireframe
            } else {
                DrawMode::Points
            },
            shake_frames: 0,
            cues: Vec::new(),
            pending_lock: None,
        }
    }

    pub fn pit_dims(size_index: usize) -> (usize, usize) {
        let side = PIT_SIZES[size_index.min(PIT_SIZES.len() - 1)];
        (side, side)
    }

    /// Pixel size of one pit cell in the viewport.
    pub fn grid_size(&self) -> i16 {
        (VIEWPORT_WIDTH / self.pit.width) as i16
    }

    pub fn apply_selected_pit_size(&mut self) {
        let (w, d) = Self::pit_dims(self.selected_pit_size);
        self.pit.resize(w, d);
        self.state.need_static_redraw = true;
        self.state.full_redraw_pending = true;
    }

    /// Back to a fresh session: empty pit, zeroed counters, level one.
    pub fn reset_game(&mut self) {
        self.pit.clear();
        self.score = 0;
        self.lines_cleared = 0;
        self.cubes_played = 0;
        self.level = 1;
        self.drop_delay = 50;
        self.shake_frames = 0;
        self.pending_lock = None;
        self.state.need_static_redraw = true;
        self.state.full_redraw_pending = true;
    }
}
