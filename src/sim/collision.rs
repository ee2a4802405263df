//! Collision detection and response for circles in a box
//!
//! Only two shapes exist: circular bodies and the four straight arena walls.
//! Responses are elastic; restitution at or above 1.0 means a bounce never
//! loses energy (the synchronizer pulls player speed back to target).

use glam::Vec2;

use super::world::{Arena, Body, WallSide};

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Unit normal pointing toward the first shape, for reflection
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check two circles. The normal points from `b` toward `a`.
pub fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> CollisionResult {
    let delta = pos_a - pos_b;
    let dist_sq = delta.length_squared();
    let reach = radius_a + radius_b;

    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centres: pick any separating axis
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        normal,
        penetration: reach - dist,
    }
}

/// Check a circle against one arena wall. The normal points into the arena.
pub fn circle_wall(pos: Vec2, radius: f32, arena: &Arena, side: WallSide) -> CollisionResult {
    let dist = arena.distance_to_wall(pos, side);
    if dist >= radius {
        return CollisionResult::miss();
    }

    let normal = side.inward_normal();
    CollisionResult {
        hit: true,
        normal,
        penetration: radius - dist,
    }
}

/// Bounce off an immovable surface. Only the approaching component is
/// reflected, scaled by `restitution`.
pub fn bounce_off_static(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let approach = velocity.dot(normal);
    if approach >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * approach * normal
}

/// Push a body out of a wall and bounce it
pub fn resolve_wall(body: &mut Body, result: &CollisionResult, wall_restitution: f32) {
    if !result.hit || body.is_static {
        return;
    }
    body.pos += result.normal * result.penetration;
    let restitution = body.restitution.max(wall_restitution);
    body.vel = bounce_off_static(body.vel, result.normal, restitution);
}

/// Separate two overlapping bodies and exchange an elastic impulse.
///
/// `result` must come from `circle_circle(a, b)`. Static bodies do not move.
pub fn resolve_pair(a: &mut Body, b: &mut Body, result: &CollisionResult) {
    if !result.hit {
        return;
    }
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return;
    }

    // Positional correction split by inverse mass
    let correction = result.normal * (result.penetration / inv_sum);
    a.pos += correction * inv_a;
    b.pos -= correction * inv_b;

    let relative = a.vel - b.vel;
    let approach = relative.dot(result.normal);
    if approach >= 0.0 {
        // Already separating
        return;
    }

    let restitution = a.restitution.max(b.restitution);
    let impulse = -(1.0 + restitution) * approach / inv_sum;
    a.vel += result.normal * (impulse * inv_a);
    b.vel -= result.normal * (impulse * inv_b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PlayerId;

    fn player(id: u8, pos: Vec2, vel: Vec2) -> Body {
        Body::player(PlayerId(id), pos, vel, 30.0, 5.0, 1.0)
    }

    #[test]
    fn test_circle_circle_hit_and_miss() {
        let result = circle_circle(Vec2::new(0.0, 0.0), 30.0, Vec2::new(50.0, 0.0), 30.0);
        assert!(result.hit);
        assert!((result.penetration - 10.0).abs() < 1e-5);
        // Normal points from b toward a
        assert!(result.normal.x < 0.0);

        let result = circle_circle(Vec2::new(0.0, 0.0), 30.0, Vec2::new(61.0, 0.0), 30.0);
        assert!(!result.hit);
    }

    #[test]
    fn test_coincident_circles_get_a_normal() {
        let result = circle_circle(Vec2::ONE, 10.0, Vec2::ONE, 10.0);
        assert!(result.hit);
        assert!((result.normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_circle_wall() {
        let arena = Arena::new(600.0, 500.0, 1.1);
        let result = circle_wall(Vec2::new(20.0, 250.0), 30.0, &arena, WallSide::Left);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::X);
        assert!((result.penetration - 10.0).abs() < 1e-5);

        let result = circle_wall(Vec2::new(300.0, 250.0), 30.0, &arena, WallSide::Right);
        assert!(!result.hit);
    }

    #[test]
    fn test_wall_bounce_with_restitution() {
        let arena = Arena::new(600.0, 500.0, 1.1);
        let mut body = player(1, Vec2::new(590.0, 250.0), Vec2::new(4.0, 3.0));
        let result = circle_wall(body.pos, body.radius, &arena, WallSide::Right);
        resolve_wall(&mut body, &result, 1.1);
        assert!((body.vel.x - (-4.4)).abs() < 1e-5);
        assert!((body.vel.y - 3.0).abs() < 1e-5);
        assert!((body.pos.x - 570.0).abs() < 1e-4);
    }

    #[test]
    fn test_head_on_equal_mass_swaps_velocity() {
        let mut a = player(1, Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0));
        let mut b = player(2, Vec2::new(59.0, 0.0), Vec2::new(-5.0, 0.0));
        let result = circle_circle(a.pos, a.radius, b.pos, b.radius);
        resolve_pair(&mut a, &mut b, &result);
        assert!((a.vel.x - (-5.0)).abs() < 1e-4);
        assert!((b.vel.x - 5.0).abs() < 1e-4);
        assert!((b.pos.x - a.pos.x) >= 60.0 - 1e-4);
    }

    #[test]
    fn test_static_item_does_not_move() {
        use crate::store::{ItemId, ItemKind};
        let id = ItemId {
            kind: ItemKind::Heart,
            created_ms: 0,
            seq: 0,
        };
        let mut item = Body::item(id, Vec2::new(40.0, 0.0), 15.0, 1.0);
        let mut p = player(1, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
        let result = circle_circle(p.pos, p.radius, item.pos, item.radius);
        resolve_pair(&mut p, &mut item, &result);
        assert_eq!(item.pos, Vec2::new(40.0, 0.0));
        assert!(p.vel.x < 0.0);
    }
}
