//! Spawn placement for pickups
//!
//! Hearts land anywhere in the spawn rectangle. The gear is placed where the
//! players are likely to meet it: the arena centre when both hug the walls,
//! their midpoint when they are far apart, otherwise partway along one
//! player's predicted path.

use glam::Vec2;
use rand::Rng;

use super::world::Arena;
use crate::consts::SPAWN_MARGIN;
use crate::{heading, random_angle};

/// A player counts as hugging the walls inside this band
pub const EDGE_BAND: f32 = 60.0;
/// Both players on the edge and further apart than this: spawn at the centre
pub const EDGE_SPREAD: f32 = 150.0;
pub const CENTER_JITTER: f32 = 50.0;
/// Players further apart than this bias the gear toward their midpoint
pub const FAR_APART: f32 = 200.0;
pub const MIDPOINT_CHANCE: f64 = 0.7;
pub const MIDPOINT_JITTER: f32 = 90.0;
/// Below this speed a player is treated as standing still
pub const STATIONARY_SPEED: f32 = 0.1;
pub const STATIONARY_SCATTER: f32 = 60.0;
/// How far ahead a path is predicted, in ticks (one to two seconds)
pub const PREDICTION_TICKS: std::ops::Range<f32> = 60.0..120.0;
/// Fraction of the way toward the predicted point
pub const PATH_RATIO: std::ops::Range<f32> = 0.5..0.8;
pub const PATH_JITTER: f32 = 30.0;
/// The gear never appears closer than this to the chosen player
pub const MIN_GEAR_DISTANCE: f32 = 80.0;
pub const RELOCATE_JITTER: f32 = 50.0;
pub const NEAR_POINT_JITTER: f32 = 30.0;

/// Where a player is and where it is going
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSample {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Uniform offset in `[-half, half)` on each axis
fn jitter<R: Rng + ?Sized>(rng: &mut R, half: f32) -> Vec2 {
    Vec2::new(
        rng.random_range(-half..half),
        rng.random_range(-half..half),
    )
}

/// Clamp into `[30, w-30] × [30, h-30]`
#[inline]
pub fn clamp_to_spawn_area(arena: &Arena, p: Vec2) -> Vec2 {
    arena.clamp_inside(p, SPAWN_MARGIN)
}

pub fn is_near_edge(arena: &Arena, p: Vec2, band: f32) -> bool {
    p.x < band || p.x > arena.width - band || p.y < band || p.y > arena.height - band
}

/// Uniform random point in the spawn rectangle
pub fn heart_position<R: Rng + ?Sized>(arena: &Arena, rng: &mut R) -> Vec2 {
    let (lo_x, hi_x) = (SPAWN_MARGIN, arena.width - SPAWN_MARGIN);
    let (lo_y, hi_y) = (SPAWN_MARGIN, arena.height - SPAWN_MARGIN);
    if lo_x >= hi_x || lo_y >= hi_y {
        return clamp_to_spawn_area(arena, arena.center());
    }
    Vec2::new(rng.random_range(lo_x..hi_x), rng.random_range(lo_y..hi_y))
}

/// Pick a gear spawn point for the two players
pub fn gear_position<R: Rng + ?Sized>(
    arena: &Arena,
    players: &[PlayerSample; 2],
    player_radius: f32,
    rng: &mut R,
) -> Vec2 {
    let [a, b] = players;
    let distance = a.position.distance(b.position);

    if is_near_edge(arena, a.position, EDGE_BAND)
        && is_near_edge(arena, b.position, EDGE_BAND)
        && distance > EDGE_SPREAD
    {
        return clamp_to_spawn_area(arena, arena.center() + jitter(rng, CENTER_JITTER));
    }

    if distance > FAR_APART && rng.random_bool(MIDPOINT_CHANCE) {
        let mid = a.position.midpoint(b.position);
        return clamp_to_spawn_area(arena, mid + jitter(rng, MIDPOINT_JITTER));
    }

    let predictions = [
        predict_position(arena, a, player_radius, rng),
        predict_position(arena, b, player_radius, rng),
    ];
    let chosen = rng.random_range(0..predictions.len());
    along_path(arena, players[chosen].position, predictions[chosen], rng)
}

/// A jittered point partway from `origin` toward `predicted`. A point that
/// lands within [`MIN_GEAR_DISTANCE`] of `origin` is replaced by one exactly
/// that far away in a random direction.
pub fn along_path<R: Rng + ?Sized>(arena: &Arena, origin: Vec2, predicted: Vec2, rng: &mut R) -> Vec2 {
    let ratio = rng.random_range(PATH_RATIO);
    let placed = origin + (predicted - origin) * ratio + jitter(rng, PATH_JITTER);
    if placed.distance(origin) >= MIN_GEAR_DISTANCE {
        return clamp_to_spawn_area(arena, placed);
    }

    let dir = heading(random_angle(rng));
    clamp_to_spawn_area(arena, origin + dir * MIN_GEAR_DISTANCE)
}

/// Where a player will be one to two seconds from now, bouncing off walls
/// inset by its radius. A player standing still gets a nearby random point.
pub fn predict_position<R: Rng + ?Sized>(
    arena: &Arena,
    player: &PlayerSample,
    player_radius: f32,
    rng: &mut R,
) -> Vec2 {
    if player.velocity.length() < STATIONARY_SPEED {
        return player.position + jitter(rng, STATIONARY_SCATTER);
    }

    let ticks = rng.random_range(PREDICTION_TICKS);
    let travelled = player.position + player.velocity * ticks;
    Vec2::new(
        fold_axis(travelled.x, player_radius, arena.width - player_radius),
        fold_axis(travelled.y, player_radius, arena.height - player_radius),
    )
}

/// Reflect a coordinate back into `[lo, hi]` as many times as the travel
/// past the walls requires
pub fn fold_axis(x: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if span <= 0.0 {
        return (lo + hi) / 2.0;
    }
    let period = 2.0 * span;
    let t = (x - lo).rem_euclid(period);
    if t > span { hi - (t - span) } else { lo + t }
}

/// New home for a gear nobody collected: near the players' midpoint
pub fn relocation_position<R: Rng + ?Sized>(
    arena: &Arena,
    players: &[Vec2; 2],
    rng: &mut R,
) -> Vec2 {
    let mid = players[0].midpoint(players[1]);
    clamp_to_spawn_area(arena, mid + jitter(rng, RELOCATE_JITTER))
}

/// A point close to `target`
pub fn near_point<R: Rng + ?Sized>(arena: &Arena, target: Vec2, rng: &mut R) -> Vec2 {
    clamp_to_spawn_area(arena, target + jitter(rng, NEAR_POINT_JITTER))
}
