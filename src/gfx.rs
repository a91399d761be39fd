//! Indexed-color drawing backend
//!
//! The simulation and renderer never touch pixel memory directly; they draw
//! through the primitives here. A `Buffer` holds palette indices, a `Plane`
//! presents one buffer as a nearest-filtered macroquad texture at a fixed
//! offset inside the 320x180 virtual screen, and `DoubleBuffer` provides the
//! front/back pair the viewport swaps every frame.

use macroquad::prelude::{vec2, DrawTextureParams, FilterMode, Texture2D, Vec2};

pub const SCREEN_WIDTH: usize = 320;
pub const SCREEN_HEIGHT: usize = 180;
pub const VIEWPORT_WIDTH: usize = 180;
pub const VIEWPORT_HEIGHT: usize = 180;
pub const VIEWPORT_X: usize = 32;
pub const VIEWPORT_Y: usize = 0;

// Palette indices (16-color, CGA-flavored).
pub const BLACK: u8 = 0;
pub const DARK_BLUE: u8 = 1;
pub const DARK_GREEN: u8 = 2;
pub const DARK_CYAN: u8 = 3;
pub const DARK_RED: u8 = 4;
pub const DARK_MAGENTA: u8 = 5;
pub const BROWN: u8 = 6;
pub const LIGHT_GRAY: u8 = 7;
pub const DARK_GRAY: u8 = 8;
pub const BLUE: u8 = 9;
pub const GREEN: u8 = 10;
pub const CYAN: u8 = 11;
pub const RED: u8 = 12;
pub const MAGENTA: u8 = 13;
pub const YELLOW: u8 = 14;
pub const WHITE: u8 = 15;

pub const PALETTE: [[u8; 3]; 16] = [
    [0, 0, 0],
    [0, 0, 170],
    [0, 170, 0],
    [0, 170, 170],
    [170, 0, 0],
    [170, 0, 170],
    [170, 85, 0],
    [170, 170, 170],
    [85, 85, 85],
    [85, 85, 255],
    [85, 255, 85],
    [85, 255, 255],
    [255, 85, 85],
    [255, 85, 255],
    [255, 255, 85],
    [255, 255, 255],
];

/// An indexed-color pixel rectangle.
pub struct Buffer {
    pub width: usize,
    pub height: usize,
    pixels: Vec<u8>,
}

impl Buffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn erase(&mut self) {
        self.pixels.fill(0);
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn draw_pixel(&mut self, x: i32, y: i32, color: u8) {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }

    /// Bresenham line; pixels outside the buffer are dropped.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u8) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.draw_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn draw_hline(&mut self, x0: i32, x1: i32, y: i32, color: u8) {
        if y < 0 || y as usize >= self.height {
            return;
        }
        let (lo, hi) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let lo = lo.max(0) as usize;
        let hi = (hi.min(self.width as i32 - 1)).max(0) as usize;
        if lo > hi {
            return;
        }
        let row = y as usize * self.width;
        self.pixels[row + lo..=row + hi].fill(color);
    }

    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, color: u8) {
        for yy in y..y + len {
            self.draw_pixel(x, yy, color);
        }
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u8) {
        self.draw_hline(x, x + w - 1, y, color);
        self.draw_hline(x, x + w - 1, y + h - 1, color);
        self.draw_vline(x, y, h, color);
        self.draw_vline(x + w - 1, y, h, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u8) {
        for yy in y..y + h {
            self.draw_hline(x, x + w - 1, yy, color);
        }
    }

    /// Copy a pre-quantized bitmap, skipping index 0 (transparent).
    pub fn blit_indices(&mut self, bmp: &TitleBitmap, dst_x: i32, dst_y: i32) {
        for y in 0..bmp.height {
            for x in 0..bmp.width {
                let c = bmp.pixels[y * bmp.width + x];
                if c != 0 {
                    self.draw_pixel(dst_x + x as i32, dst_y + y as i32, c);
                }
            }
        }
    }
}

/// Nearest palette entry by squared RGB distance.
pub fn nearest_palette_index(r: u8, g: u8, b: u8) -> u8 {
    let mut best = 0usize;
    let mut best_d = i32::MAX;
    for (i, p) in PALETTE.iter().enumerate() {
        let dr = p[0] as i32 - r as i32;
        let dg = p[1] as i32 - g as i32;
        let db = p[2] as i32 - b as i32;
        let d = dr * dr + dg * dg + db * db;
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best as u8
}

/// An image quantized to palette indices, for the optional title screen.
pub struct TitleBitmap {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// Load and palette-quantize a PNG; `None` when the file is absent or
/// malformed (the start screen then falls back to text).
pub fn load_title_bitmap(path: &str) -> Option<TitleBitmap> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            println!("No title bitmap ({}): {}", path, e);
            return None;
        }
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| {
            if p[3] < 128 {
                0
            } else {
                nearest_palette_index(p[0], p[1], p[2])
            }
        })
        .collect();
    println!("Loaded title bitmap: {} ({}x{})", path, width, height);
    Some(TitleBitmap {
        width: width as usize,
        height: height as usize,
        pixels,
    })
}

/// Presents an indexed buffer as a screen-space texture.
pub struct Plane {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
    texture: Texture2D,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        let rgba = vec![0u8; width * height * 4];
        let texture = Texture2D::from_rgba8(width as u16, height as u16, &rgba);
        texture.set_filter(FilterMode::Nearest);
        Self {
            width,
            height,
            rgba,
            texture,
        }
    }

    /// Expand palette indices into the backing texture. With
    /// `transparent_zero` the background index becomes fully transparent so
    /// the plane can overlay another.
    pub fn present(&mut self, buf: &Buffer, transparent_zero: bool) {
        for y in 0..buf.height {
            for x in 0..buf.width {
                let c = buf.pixel(x, y) as usize;
                let p = PALETTE[c];
                let a = if transparent_zero && c == 0 { 0 } else { 255 };
                let i = (y * self.width + x) * 4;
                self.rgba[i] = p[0];
                self.rgba[i + 1] = p[1];
                self.rgba[i + 2] = p[2];
                self.rgba[i + 3] = a;
            }
        }
        self.texture = Texture2D::from_rgba8(self.width as u16, self.height as u16, &self.rgba);
        self.texture.set_filter(FilterMode::Nearest);
    }

    /// Draw at a virtual-screen offset, scaled to the window.
    pub fn draw(&self, origin: Vec2, scale: f32, offset_x: i32, offset_y: i32) {
        macroquad::prelude::draw_texture_ex(
            &self.texture,
            origin.x + offset_x as f32 * scale,
            origin.y + offset_y as f32 * scale,
            macroquad::prelude::WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(
                    self.width as f32 * scale,
                    self.height as f32 * scale,
                )),
                ..Default::default()
            },
        );
    }
}

/// The classic front/back pair for the active viewport.
pub struct DoubleBuffer {
    bufs: [Buffer; 2],
    active: usize,
}

impl DoubleBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            bufs: [Buffer::new(width, height), Buffer::new(width, height)],
            active: 0,
        }
    }

    pub fn front(&self) -> &Buffer {
        &self.bufs[self.active]
    }

    pub fn back_mut(&mut self) -> &mut Buffer {
        &mut self.bufs[1 - self.active]
    }

    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }
}
