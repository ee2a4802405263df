//! Mirror body kinematics into the game state after every step
//!
//! Elastic walls (restitution > 1) pump energy into play and glancing hits
//! bleed it out, so player speed is also pulled back to its target here.

use glam::Vec2;
use rand::Rng;

use super::world::World;
use crate::store::GameStore;
use crate::{angle_of, heading, random_angle};

/// Re-issue `velocity` at `target_speed` if it drifted by more than
/// `tolerance`. Direction is kept; a (near) stationary body gets a random one.
pub fn retarget_speed<R: Rng + ?Sized>(
    velocity: Vec2,
    target_speed: f32,
    tolerance: f32,
    rng: &mut R,
) -> Option<Vec2> {
    let speed = velocity.length();
    if (speed - target_speed).abs() <= tolerance {
        return None;
    }
    let angle = if speed > 1e-6 {
        angle_of(velocity)
    } else {
        random_angle(rng)
    };
    Some(heading(angle) * target_speed)
}

/// Copy positions (and item velocities) into `store`, and hold each player at
/// `base_speed × speed_factor`. Returns how many players were renormalized.
pub fn synchronize<S: GameStore, R: Rng + ?Sized>(
    world: &mut World,
    store: &mut S,
    base_speed: f32,
    tolerance: f32,
    rng: &mut R,
) -> usize {
    let mut renormalized = 0;

    let players: Vec<_> = store
        .players()
        .iter()
        .map(|p| (p.id, p.speed_factor))
        .collect();
    for (id, speed_factor) in players {
        let Some(body) = world.player_body_mut(id) else {
            continue;
        };
        if let Some(vel) = retarget_speed(body.vel, base_speed * speed_factor, tolerance, rng) {
            body.vel = vel;
            renormalized += 1;
        }
        let pos = body.pos;
        if let Some(player) = store.player_mut(id) {
            player.position = pos;
        }
    }

    let moving: Vec<_> = store
        .items()
        .iter()
        .filter(|item| item.velocity.is_some())
        .map(|item| item.id)
        .collect();
    for id in moving {
        let Some(body) = world.item_body(id) else {
            continue;
        };
        let (pos, vel) = (body.pos, body.vel);
        if let Some(item) = store.item_mut(id) {
            item.position = pos;
            item.velocity = Some(vel);
        }
    }

    renormalized
}
