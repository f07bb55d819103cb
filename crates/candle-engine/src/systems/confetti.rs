//! Falling confetti for the finale. Headless: the simulation writes a flat
//! instance buffer and the page draws rotated rectangles from it.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::sequencer::Rng;

/// Per-piece render data read by the page. 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ConfettiInstance {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ConfettiInstance {
    pub const FLOATS: usize = 8;
}

/// One strip of paper. Speeds are per fixed step.
#[derive(Debug, Clone)]
pub struct ConfettiPiece {
    pub pos: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    /// Degrees.
    pub rotation: f32,
    /// Degrees per step.
    pub spin: f32,
    pub color: [f32; 3],
}

impl ConfettiPiece {
    /// Y a piece restarts at after leaving the bottom edge.
    pub const WRAP_Y: f32 = -20.0;

    fn spawn(bounds: Vec2, palette: &[[f32; 3]], rng: &mut Rng) -> Self {
        Self {
            pos: Vec2::new(
                rng.next_f32() * bounds.x,
                rng.next_f32() * bounds.y - bounds.y,
            ),
            size: Vec2::new(rng.range_f32(5.0, 15.0), rng.range_f32(5.0, 10.0)),
            velocity: Vec2::new(rng.range_f32(-1.0, 1.0), rng.range_f32(2.0, 5.0)),
            rotation: rng.next_f32() * 360.0,
            spin: rng.range_f32(-5.0, 5.0),
            color: rng.pick(palette).copied().unwrap_or([1.0, 1.0, 1.0]),
        }
    }

    fn step(&mut self, bounds: Vec2, rng: &mut Rng) {
        self.pos += self.velocity;
        self.rotation += self.spin;
        if self.pos.y > bounds.y {
            self.pos.y = Self::WRAP_Y;
            self.pos.x = rng.next_f32() * bounds.x;
        }
    }

    fn to_instance(&self) -> ConfettiInstance {
        ConfettiInstance {
            x: self.pos.x,
            y: self.pos.y,
            w: self.size.x,
            h: self.size.y,
            rotation: self.rotation.to_radians(),
            r: self.color[0],
            g: self.color[1],
            b: self.color[2],
        }
    }
}

pub struct Confetti {
    pub pieces: Vec<ConfettiPiece>,
    palette: Vec<[f32; 3]>,
    bounds: Vec2,
    rng: Rng,
    instances: Vec<ConfettiInstance>,
}

impl Confetti {
    pub fn new(seed: u64, palette: Vec<[f32; 3]>, bounds: Vec2) -> Self {
        Self {
            pieces: Vec::new(),
            palette,
            bounds,
            rng: Rng::new(seed.wrapping_add(7919)),
            instances: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.pieces.is_empty()
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Viewport changed. Pieces keep their positions.
    pub fn resize(&mut self, bounds: Vec2) {
        self.bounds = bounds;
    }

    /// Scatter `count` pieces above the top edge.
    pub fn spawn(&mut self, count: usize) {
        self.pieces.reserve(count);
        for _ in 0..count {
            let piece = ConfettiPiece::spawn(self.bounds, &self.palette, &mut self.rng);
            self.pieces.push(piece);
        }
        self.instances.reserve(count);
    }

    /// Advance every piece by one fixed step.
    pub fn step(&mut self) {
        let bounds = self.bounds;
        for piece in &mut self.pieces {
            piece.step(bounds, &mut self.rng);
        }
    }

    pub fn rebuild_instances(&mut self) {
        self.instances.clear();
        self.instances
            .extend(self.pieces.iter().map(ConfettiPiece::to_instance));
    }

    pub fn instances(&self) -> &[ConfettiInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Raw pointer to instance data for direct reads from WASM memory.
    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into linear 0–1 channels.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
