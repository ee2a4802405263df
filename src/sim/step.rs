//! Fixed timestep physics step
//!
//! Zero gravity, no drag: bodies coast in straight lines between contacts.
//! Each step integrates, detects contacts against the integrated positions,
//! resolves them, and returns the contacts that started this step.

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision::{circle_circle, circle_wall, resolve_pair, resolve_wall};
use super::world::{BodyKey, BodyRole, WallSide, World};
use crate::store::PlayerId;

/// Kinematics of a body at the moment a contact was detected, before the
/// contact response changed them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub key: BodyKey,
    pub role: BodyRole,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// A contact that started this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Two bodies touched
    Bodies { a: BodySnapshot, b: BodySnapshot },
    /// A body touched a wall
    Boundary { body: BodySnapshot, side: WallSide },
}

impl Contact {
    /// Players taking part in this contact
    pub fn players(&self) -> [Option<PlayerId>; 2] {
        match self {
            Contact::Bodies { a, b } => [a.role.player(), b.role.player()],
            Contact::Boundary { body, .. } => [body.role.player(), None],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ContactPair {
    Bodies(BodyKey, BodyKey),
    Boundary(BodyKey, WallSide),
}

/// Runs the physics loop once started
#[derive(Debug, Default)]
pub struct Stepper {
    running: bool,
    ticks: u64,
    /// Pairs that were touching after the previous step
    touching: BTreeSet<ContactPair>,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start stepping. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Stop stepping. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.touching.clear();
        true
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Steps taken since creation
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance every body by `dt` ticks and return the contacts that started.
    /// A stopped stepper leaves the world untouched.
    pub fn step(&mut self, world: &mut World, dt: f32) -> Vec<Contact> {
        if !self.running {
            return Vec::new();
        }
        self.ticks += 1;

        for (_, body) in world.bodies_mut() {
            if !body.is_static {
                body.pos += body.vel * dt;
            }
        }

        let arena = world.arena().clone();
        let keys = world.body_keys();

        // --- Detection (post-integration, pre-response) ---
        let mut pair_hits = Vec::new();
        let mut wall_hits = Vec::new();
        for (i, &key_a) in keys.iter().enumerate() {
            let Some(a) = world.body(key_a) else { continue };

            for &key_b in &keys[i + 1..] {
                let Some(b) = world.body(key_b) else { continue };
                if a.is_static && b.is_static {
                    continue;
                }
                if circle_circle(a.pos, a.radius, b.pos, b.radius).hit {
                    pair_hits.push((snapshot(key_a, a), snapshot(key_b, b)));
                }
            }

            if !a.is_static {
                for wall in arena.walls() {
                    if circle_wall(a.pos, a.radius, &arena, wall.side).hit {
                        wall_hits.push((snapshot(key_a, a), wall.side));
                    }
                }
            }
        }

        // --- Response ---
        // Positions may have shifted from an earlier pair this step, so
        // every check is redone against current state.
        for (a, b) in &pair_hits {
            if let Some([body_a, body_b]) = world.pair_mut(a.key, b.key) {
                let result = circle_circle(body_a.pos, body_a.radius, body_b.pos, body_b.radius);
                resolve_pair(body_a, body_b, &result);
            }
        }
        for (_, body) in world.bodies_mut() {
            if body.is_static {
                continue;
            }
            for wall in arena.walls() {
                let result = circle_wall(body.pos, body.radius, &arena, wall.side);
                resolve_wall(body, &result, wall.restitution);
            }
        }

        // --- Contact start filtering ---
        let mut touching = BTreeSet::new();
        let mut started = Vec::new();
        for (a, b) in pair_hits {
            let pair = ContactPair::Bodies(a.key, b.key);
            touching.insert(pair);
            if !self.touching.contains(&pair) {
                started.push(Contact::Bodies { a, b });
            }
        }
        for (body, side) in wall_hits {
            let pair = ContactPair::Boundary(body.key, side);
            touching.insert(pair);
            if !self.touching.contains(&pair) {
                started.push(Contact::Boundary { body, side });
            }
        }
        self.touching = touching;

        started
    }
}

fn snapshot(key: BodyKey, body: &super::world::Body) -> BodySnapshot {
    BodySnapshot {
        key,
        role: body.role,
        position: body.pos,
        velocity: body.vel,
    }
}
