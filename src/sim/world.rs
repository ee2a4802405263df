//! Arena and body registry
//!
//! The registry owns every simulated body. Game-state records point at bodies
//! by [`PlayerId`] / [`ItemId`] only; the mapping to a [`BodyKey`] lives here.

use std::collections::BTreeMap;

use glam::Vec2;
use slotmap::{SlotMap, new_key_type};

use crate::store::{ItemId, ItemKind, PlayerId};

new_key_type! {
    /// Stable handle for a body, backed by a generational slot map.
    pub struct BodyKey;
}

/// One of the four arena walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WallSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [
        WallSide::Top,
        WallSide::Bottom,
        WallSide::Left,
        WallSide::Right,
    ];

    /// Unit normal pointing into the arena
    pub fn inward_normal(self) -> Vec2 {
        match self {
            WallSide::Top => Vec2::Y,
            WallSide::Bottom => Vec2::NEG_Y,
            WallSide::Left => Vec2::X,
            WallSide::Right => Vec2::NEG_X,
        }
    }
}

/// A static, frictionless boundary segment
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub side: WallSide,
    pub restitution: f32,
}

/// The rectangular play area. `y` grows downward from the top wall.
#[derive(Debug, Clone)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    walls: [Wall; 4],
}

impl Arena {
    pub fn new(width: f32, height: f32, wall_restitution: f32) -> Self {
        Self {
            width,
            height,
            walls: WallSide::ALL.map(|side| Wall {
                side,
                restitution: wall_restitution,
            }),
        }
    }

    #[inline]
    pub fn walls(&self) -> &[Wall; 4] {
        &self.walls
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Signed distance from a point to a wall's line, positive inside
    pub fn distance_to_wall(&self, p: Vec2, side: WallSide) -> f32 {
        match side {
            WallSide::Top => p.y,
            WallSide::Bottom => self.height - p.y,
            WallSide::Left => p.x,
            WallSide::Right => self.width - p.x,
        }
    }

    /// Clamp a point so it stays `margin` away from every wall
    pub fn clamp_inside(&self, p: Vec2, margin: f32) -> Vec2 {
        Vec2::new(
            p.x.clamp(margin, self.width - margin),
            p.y.clamp(margin, self.height - margin),
        )
    }
}

/// What a body stands for in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRole {
    Player(PlayerId),
    Gear(ItemId),
    Heart(ItemId),
}

impl BodyRole {
    pub fn for_item(id: ItemId) -> Self {
        match id.kind {
            ItemKind::Gear => BodyRole::Gear(id),
            ItemKind::Heart => BodyRole::Heart(id),
        }
    }

    pub fn player(&self) -> Option<PlayerId> {
        match *self {
            BodyRole::Player(id) => Some(id),
            _ => None,
        }
    }
}

/// A rigid circle. Friction and air friction are always zero and bodies
/// never rotate, so neither is modelled.
#[derive(Debug, Clone)]
pub struct Body {
    pub role: BodyRole,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    pub is_static: bool,
}

impl Body {
    pub fn player(
        id: PlayerId,
        pos: Vec2,
        vel: Vec2,
        radius: f32,
        mass: f32,
        restitution: f32,
    ) -> Self {
        Self {
            role: BodyRole::Player(id),
            pos,
            vel,
            radius,
            mass,
            restitution,
            is_static: false,
        }
    }

    /// Pickups sit still until consumed or relocated
    pub fn item(id: ItemId, pos: Vec2, radius: f32, restitution: f32) -> Self {
        Self {
            role: BodyRole::for_item(id),
            pos,
            vel: Vec2::ZERO,
            radius,
            mass: 0.5,
            restitution,
            is_static: true,
        }
    }

    /// Zero for static bodies (infinite mass)
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// The arena plus every live body
#[derive(Debug)]
pub struct World {
    arena: Arena,
    bodies: SlotMap<BodyKey, Body>,
    players: BTreeMap<PlayerId, BodyKey>,
    items: BTreeMap<ItemId, BodyKey>,
}

impl World {
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            bodies: SlotMap::with_key(),
            players: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn body(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key)
    }

    /// Keys in slot order (stable between ticks)
    pub fn body_keys(&self) -> Vec<BodyKey> {
        self.bodies.keys().collect()
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyKey, &mut Body)> {
        self.bodies.iter_mut()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Both bodies of a pair, mutably
    pub fn pair_mut(&mut self, a: BodyKey, b: BodyKey) -> Option<[&mut Body; 2]> {
        self.bodies.get_disjoint_mut([a, b])
    }

    pub fn insert_player(&mut self, id: PlayerId, body: Body) -> BodyKey {
        let key = self.bodies.insert(body);
        if let Some(old) = self.players.insert(id, key) {
            self.bodies.remove(old);
        }
        key
    }

    pub fn insert_item(&mut self, id: ItemId, body: Body) -> BodyKey {
        let key = self.bodies.insert(body);
        if let Some(old) = self.items.insert(id, key) {
            self.bodies.remove(old);
        }
        key
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Body> {
        let key = self.items.remove(&id)?;
        self.bodies.remove(key)
    }

    pub fn player_body(&self, id: PlayerId) -> Option<&Body> {
        self.players.get(&id).and_then(|&key| self.bodies.get(key))
    }

    pub fn player_body_mut(&mut self, id: PlayerId) -> Option<&mut Body> {
        let key = *self.players.get(&id)?;
        self.bodies.get_mut(key)
    }

    pub fn item_body(&self, id: ItemId) -> Option<&Body> {
        self.items.get(&id).and_then(|&key| self.bodies.get(key))
    }

    pub fn item_body_mut(&mut self, id: ItemId) -> Option<&mut Body> {
        let key = *self.items.get(&id)?;
        self.bodies.get_mut(key)
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear_id(ms: u64) -> ItemId {
        ItemId {
            kind: ItemKind::Gear,
            created_ms: ms,
            seq: 0,
        }
    }

    #[test]
    fn test_removed_item_key_is_not_reused() {
        let mut world = World::new(Arena::new(600.0, 500.0, 1.1));
        let id = gear_id(1);
        let key = world.insert_item(id, Body::item(id, Vec2::new(50.0, 50.0), 15.0, 1.0));
        assert!(world.remove_item(id).is_some());
        assert!(world.body(key).is_none());

        // Generational keys: the old handle stays dead after the slot is refilled
        let other = gear_id(2);
        world.insert_item(other, Body::item(other, Vec2::ONE, 15.0, 1.0));
        assert!(world.body(key).is_none());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_player_lookup() {
        let mut world = World::new(Arena::new(600.0, 500.0, 1.1));
        let body = Body::player(PlayerId(1), Vec2::new(150.0, 250.0), Vec2::X, 30.0, 5.0, 1.05);
        world.insert_player(PlayerId(1), body);
        assert_eq!(
            world.player_body(PlayerId(1)).unwrap().role,
            BodyRole::Player(PlayerId(1))
        );
        assert!(world.player_body(PlayerId(2)).is_none());
    }

    #[test]
    fn test_static_bodies_have_infinite_mass() {
        let body = Body::item(gear_id(3), Vec2::ZERO, 15.0, 1.0);
        assert_eq!(body.inverse_mass(), 0.0);
        let body = Body::player(PlayerId(1), Vec2::ZERO, Vec2::ZERO, 30.0, 5.0, 1.05);
        assert!((body.inverse_mass() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_inside() {
        let arena = Arena::new(600.0, 500.0, 1.1);
        let p = arena.clamp_inside(Vec2::new(-10.0, 700.0), 30.0);
        assert_eq!(p, Vec2::new(30.0, 470.0));
        assert_eq!(arena.distance_to_wall(Vec2::new(20.0, 40.0), WallSide::Left), 20.0);
        assert_eq!(arena.distance_to_wall(Vec2::new(20.0, 40.0), WallSide::Bottom), 460.0);
    }
}
