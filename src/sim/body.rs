//! Physics-body facade
//!
//! The core consumes a conventional arcade-physics body surface: velocity
//! get/set, gravity scalar plus enable flag, a movement-enable switch, and
//! per-face `blocked`/`touching` contact flags. This module supplies that
//! surface together with the axis-separated tile sweep that fills the
//! contact flags each tick. Collision *response* (reflection, turning,
//! exploding) stays with the entities; the body only resolves penetration
//! and reports which faces made contact.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::field::Playfield;
use crate::consts::TILE_SIZE;

/// Per-face contact flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceFlags {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl FaceFlags {
    pub const NONE: FaceFlags = FaceFlags {
        left: false,
        right: false,
        up: false,
        down: false,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    #[inline]
    pub fn horizontal(&self) -> bool {
        self.left || self.right
    }

    #[inline]
    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

/// Breakable cells a body was blocked by during one step
#[derive(Debug, Clone, Default)]
pub struct StepContacts {
    pub breakable_hits: Vec<(usize, usize)>,
}

/// An axis-aligned dynamic body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    /// AABB half extents
    pub half: Vec2,
    vel: Vec2,
    gravity: f32,
    allow_gravity: bool,
    moves: bool,
    /// Ghost bodies (flyers) ignore geometry entirely
    pub collides: bool,
    /// Faces blocked by geometry during the last step
    pub blocked: FaceFlags,
    /// Faces in resting contact with geometry after the last step
    pub touching: FaceFlags,
}

impl Body {
    pub fn new(pos: Vec2, half: Vec2) -> Self {
        Self {
            pos,
            half,
            vel: Vec2::ZERO,
            gravity: 0.0,
            allow_gravity: false,
            moves: true,
            collides: true,
            blocked: FaceFlags::NONE,
            touching: FaceFlags::NONE,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.vel
    }

    #[inline]
    pub fn set_velocity(&mut self, vel: Vec2) {
        self.vel = vel;
    }

    #[inline]
    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    #[inline]
    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    #[inline]
    pub fn allow_gravity(&self) -> bool {
        self.allow_gravity
    }

    #[inline]
    pub fn set_allow_gravity(&mut self, on: bool) {
        self.allow_gravity = on;
    }

    #[inline]
    pub fn moves(&self) -> bool {
        self.moves
    }

    #[inline]
    pub fn set_moves(&mut self, on: bool) {
        self.moves = on;
    }

    #[inline]
    pub fn aabb(&self) -> (Vec2, Vec2) {
        (self.pos - self.half, self.pos + self.half)
    }

    /// Integrate one step against the field, resolving penetration axis by
    /// axis and filling the blocked/touching flags. Velocity is left for the
    /// owning entity to respond to.
    pub fn step(&mut self, field: &Playfield, dt: f32) -> StepContacts {
        self.blocked = FaceFlags::NONE;
        let mut contacts = StepContacts::default();

        if !self.moves {
            self.touching = FaceFlags::NONE;
            return contacts;
        }
        if self.allow_gravity {
            self.vel.y += self.gravity * dt;
        }
        if !self.collides {
            self.pos += self.vel * dt;
            self.touching = FaceFlags::NONE;
            return contacts;
        }

        // X axis
        self.pos.x += self.vel.x * dt;
        if self.pos.x - self.half.x < 0.0 {
            self.pos.x = self.half.x;
            self.blocked.left = true;
        } else if self.pos.x + self.half.x > field.width() {
            self.pos.x = field.width() - self.half.x;
            self.blocked.right = true;
        }
        self.resolve_cells_x(field, &mut contacts);

        // Y axis
        self.pos.y += self.vel.y * dt;
        if self.pos.y - self.half.y < 0.0 {
            self.pos.y = self.half.y;
            self.blocked.up = true;
        } else if self.pos.y + self.half.y > field.height() {
            self.pos.y = field.height() - self.half.y;
            self.blocked.down = true;
        }
        self.resolve_cells_y(field, &mut contacts);

        self.touching = self.probe_touching(field);
        contacts
    }

    fn resolve_cells_x(&mut self, field: &Playfield, contacts: &mut StepContacts) {
        if self.vel.x == 0.0 {
            return;
        }
        let (min, max) = self.aabb();
        for (col, row) in field.cells_overlapping(min, max) {
            if !field.is_solid(col, row) {
                continue;
            }
            let cell_min_x = col as f32 * TILE_SIZE;
            let cell_max_x = cell_min_x + TILE_SIZE;
            if self.vel.x > 0.0 {
                self.pos.x = cell_min_x - self.half.x;
                self.blocked.right = true;
            } else {
                self.pos.x = cell_max_x + self.half.x;
                self.blocked.left = true;
            }
            if field.is_breakable(col, row) {
                contacts.breakable_hits.push((col, row));
            }
            return; // one resolution per axis
        }
    }

    fn resolve_cells_y(&mut self, field: &Playfield, contacts: &mut StepContacts) {
        if self.vel.y == 0.0 {
            return;
        }
        let (min, max) = self.aabb();
        for (col, row) in field.cells_overlapping(min, max) {
            if !field.is_solid(col, row) {
                continue;
            }
            let cell_min_y = row as f32 * TILE_SIZE;
            let cell_max_y = cell_min_y + TILE_SIZE;
            if self.vel.y > 0.0 {
                self.pos.y = cell_min_y - self.half.y;
                self.blocked.down = true;
            } else {
                self.pos.y = cell_max_y + self.half.y;
                self.blocked.up = true;
            }
            if field.is_breakable(col, row) {
                contacts.breakable_hits.push((col, row));
            }
            return;
        }
    }

    /// Resting contact within a 1 px probe of each face
    fn probe_touching(&self, field: &Playfield) -> FaceFlags {
        let eps = 1.0;
        let (min, max) = self.aabb();
        FaceFlags {
            left: min.x - eps < 0.0
                || self.any_solid(field, Vec2::new(min.x - eps, min.y), Vec2::new(min.x, max.y)),
            right: max.x + eps > field.width()
                || self.any_solid(field, Vec2::new(max.x, min.y), Vec2::new(max.x + eps, max.y)),
            up: min.y - eps < 0.0
                || self.any_solid(field, Vec2::new(min.x, min.y - eps), Vec2::new(max.x, min.y)),
            down: max.y + eps > field.height()
                || self.any_solid(field, Vec2::new(min.x, max.y), Vec2::new(max.x, max.y + eps)),
        }
    }

    fn any_solid(&self, field: &Playfield, min: Vec2, max: Vec2) -> bool {
        field
            .cells_overlapping(min, max)
            .any(|(c, r)| field.is_solid(c, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn open_field() -> Playfield {
        Playfield::new(8, 8) // 128x128 px, walls at the rectangle
    }

    #[test]
    fn test_gravity_integration() {
        let field = open_field();
        let mut b = Body::new(Vec2::new(64.0, 32.0), Vec2::splat(4.0));
        b.set_gravity(400.0);
        b.set_allow_gravity(true);
        b.step(&field, SIM_DT);
        assert!(b.velocity().y > 0.0);
        assert!(b.pos.y > 32.0);
    }

    #[test]
    fn test_wall_blocks() {
        let field = open_field();
        let mut b = Body::new(Vec2::new(6.0, 64.0), Vec2::splat(4.0));
        b.set_velocity(Vec2::new(-300.0, 0.0));
        b.step(&field, SIM_DT);
        assert!(b.blocked.left);
        assert_eq!(b.pos.x, 4.0);
        // Velocity is preserved for the owner to reflect
        assert_eq!(b.velocity().x, -300.0);
    }

    #[test]
    fn test_floor_lands_and_touches() {
        let field = open_field();
        let mut b = Body::new(Vec2::new(64.0, 123.0), Vec2::splat(4.0));
        b.set_velocity(Vec2::new(0.0, 300.0));
        b.step(&field, SIM_DT);
        assert!(b.blocked.down);
        assert!(b.touching.down);
        assert_eq!(b.pos.y, 124.0);
    }

    #[test]
    fn test_cell_block_reports_breakable() {
        let mut field = open_field();
        field.set_cell(4, 4, super::super::field::Cell::Breakable { hp: 2 });
        // Cell spans x 64..80, y 64..80; approach from the left
        let mut b = Body::new(Vec2::new(59.5, 72.0), Vec2::splat(4.0));
        b.set_velocity(Vec2::new(200.0, 0.0));
        let contacts = b.step(&field, SIM_DT);
        assert!(b.blocked.right);
        assert_eq!(contacts.breakable_hits, vec![(4, 4)]);
    }

    #[test]
    fn test_disabled_body_does_not_move() {
        let field = open_field();
        let mut b = Body::new(Vec2::new(64.0, 64.0), Vec2::splat(4.0));
        b.set_velocity(Vec2::new(100.0, 100.0));
        b.set_moves(false);
        b.step(&field, SIM_DT);
        assert_eq!(b.pos, Vec2::new(64.0, 64.0));
        assert_eq!(b.velocity(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_ghost_body_ignores_geometry() {
        let field = open_field();
        let mut b = Body::new(Vec2::new(2.0, 64.0), Vec2::splat(4.0));
        b.collides = false;
        b.set_velocity(Vec2::new(-300.0, 0.0));
        b.step(&field, SIM_DT);
        assert!(!b.blocked.any());
        assert!(b.pos.x < 0.0);
    }
}
