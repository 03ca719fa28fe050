use std::collections::HashSet;

use glam::{Vec2, Vec3};

/// Combined key vectors shorter than this are treated as no movement.
pub const MOVE_THRESHOLD: f32 = 0.1;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

/// Friendly names for the non-character keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Escape,
}

/// Camera-local direction contributed by each movement key.
///
/// Local +Z is forward, +X is left and +Y is down (see
/// [`crate::FlyCamera::move_by`]).
const MOVEMENT_KEYS: [(KeyCode, Vec3); 6] = [
    (KeyCode::Character('W'), Vec3::new(0.0, 0.0, 1.0)),
    (KeyCode::Character('S'), Vec3::new(0.0, 0.0, -1.0)),
    (KeyCode::Character('D'), Vec3::new(-1.0, 0.0, 0.0)),
    (KeyCode::Character('A'), Vec3::new(1.0, 0.0, 0.0)),
    (KeyCode::Character('C'), Vec3::new(0.0, 1.0, 0.0)),
    (KeyCode::Named(NamedKey::Space), Vec3::new(0.0, -1.0, 0.0)),
];

/// Input gathered between two frames.
///
/// Keys are level-triggered and sampled once per frame; cursor and scroll
/// deltas accumulate until drained by the frame driver.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    last_cursor: Option<Vec2>,
    look_offset: Vec2,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Records an absolute cursor position in window pixels.
    ///
    /// The first position only primes the tracker. Screen y grows
    /// downward, so the vertical offset is flipped to make "up" positive.
    pub fn cursor_moved(&mut self, position: Vec2) {
        if let Some(last) = self.last_cursor {
            self.look_offset += Vec2::new(position.x - last.x, last.y - position.y);
        }
        self.last_cursor = Some(position);
    }

    /// Records a relative pointer motion (raw device delta, y down).
    pub fn pointer_moved(&mut self, delta: Vec2) {
        self.look_offset += Vec2::new(delta.x, -delta.y);
    }

    /// Records a vertical scroll amount in lines.
    pub fn scrolled(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn exit_requested(&self) -> bool {
        self.is_key_down(KeyCode::Named(NamedKey::Escape))
    }

    /// Normalized camera-local movement for the held keys, or `None` when
    /// the keys cancel out.
    pub fn movement_direction(&self) -> Option<Vec3> {
        let direction: Vec3 = MOVEMENT_KEYS
            .iter()
            .filter(|(key, _)| self.is_key_down(*key))
            .map(|(_, dir)| *dir)
            .sum();
        (direction.length() > MOVE_THRESHOLD).then(|| direction.normalize())
    }

    /// Cursor offset accumulated since the last call.
    pub fn take_look_offset(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_offset)
    }

    /// Scroll accumulated since the last call.
    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }
}
