//! Collision detection and geometry helpers.
//!
//! Everything here works on bare position + radius pairs so players, bots
//! and food share one implementation.

use glam::Vec2;

/// Result of checking two circles against each other.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    /// Combined radius of both circles.
    pub r: f32,
    /// Distance between centers.
    pub d: f32,
}

impl CollisionResult {
    /// Check if the circles actually overlap.
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.d < self.r
    }
}

/// Check collision between two circles.
#[inline]
pub fn check_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    CollisionResult {
        r: a_radius + b_radius,
        d: a_pos.distance(b_pos),
    }
}

/// Whether `point` lies strictly inside the circle.
#[inline]
pub fn contains_point(center: Vec2, radius: f32, point: Vec2) -> bool {
    center.distance(point) < radius
}

/// Whether an entity of `eater_radius` is big enough to eat one of `prey_radius`.
#[inline]
pub fn can_consume(eater_radius: f32, prey_radius: f32, margin: f32) -> bool {
    eater_radius > prey_radius + margin
}

/// Clamp a single axis so a circle of `radius` stays inside `[0, extent]`.
/// Circles wider than the extent are centered.
#[inline]
pub fn clamp_axis(value: f32, radius: f32, extent: f32) -> f32 {
    let (lo, hi) = (radius, extent - radius);
    if lo > hi {
        extent / 2.0
    } else {
        value.clamp(lo, hi)
    }
}
