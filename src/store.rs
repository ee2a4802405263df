//! Game-state container
//!
//! Score, hit points, the item list and the match lifecycle live outside the
//! simulation core. The core only talks to them through [`GameStore`], and
//! refers to records by id, never by holding them.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Seat identifier, displayed as `player1`, `player2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player{}", self.0)
    }
}

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// The contested power pickup; at most one exists
    Gear,
    /// Restores one hit point
    Heart,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Gear => "gear",
            ItemKind::Heart => "heart",
        }
    }

    fn index(self) -> usize {
        match self {
            ItemKind::Gear => 0,
            ItemKind::Heart => 1,
        }
    }
}

/// Item identifier: kind plus creation time, with a sequence number when two
/// items of one kind are created in the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    pub kind: ItemKind,
    pub created_ms: u64,
    pub seq: u32,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seq == 0 {
            write!(f, "{}_{}", self.kind.as_str(), self.created_ms)
        } else {
            write!(f, "{}_{}_{}", self.kind.as_str(), self.created_ms, self.seq)
        }
    }
}

/// A player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hp: u32,
    pub has_gear: bool,
    /// Mirror of the player's body position
    pub position: Vec2,
    /// Multiplier on the base speed
    pub speed_factor: f32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, hp: u32, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            hp,
            has_gear: false,
            position,
            speed_factor: DEFAULT_SPEED_FACTOR,
        }
    }
}

/// A pickup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub position: Vec2,
    /// Only mirrored from the physics body when present
    pub velocity: Option<Vec2>,
}

impl Item {
    #[inline]
    pub fn kind(&self) -> ItemKind {
        self.id.kind
    }
}

/// Speed factor a freshly seated player gets
pub const DEFAULT_SPEED_FACTOR: f32 = 0.6;

/// The operations the simulation needs from the game-state container
pub trait GameStore {
    fn players(&self) -> &[Player];
    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player>;

    fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players().iter().find(|p| p.id == id)
    }

    fn items(&self) -> &[Item];
    fn item_mut(&mut self, id: ItemId) -> Option<&mut Item>;

    fn item(&self, id: ItemId) -> Option<&Item> {
        self.items().iter().find(|i| i.id == id)
    }

    /// Insert an item created at `now_ms` and return its new id
    fn add_item(
        &mut self,
        kind: ItemKind,
        position: Vec2,
        velocity: Option<Vec2>,
        now_ms: u64,
    ) -> ItemId;
    fn remove_item(&mut self, id: ItemId) -> Option<Item>;

    fn is_started(&self) -> bool;
    fn is_ended(&self) -> bool;

    /// Started and not yet ended
    fn is_active(&self) -> bool {
        self.is_started() && !self.is_ended()
    }

    /// Reset, then mark the match started
    fn start_match(&mut self);
    fn end_match(&mut self);
    /// Restore hit points and gear, clear items, rewind the clock.
    /// Speed factors survive a reset.
    fn reset_match(&mut self);

    /// Remove one hit point; reaching zero ends the match
    fn damage_player(&mut self, id: PlayerId);
    /// Add one hit point, capped at [`max_hp`](Self::max_hp)
    fn heal_player(&mut self, id: PlayerId);
    fn set_speed_factor(&mut self, id: PlayerId, speed_factor: f32);

    fn max_hp(&self) -> u32;
    fn remaining_ms(&self) -> f64;
    fn set_remaining_ms(&mut self, remaining_ms: f64);

    /// True while a gear item is on the field or a player holds one
    fn has_gear_entity(&self) -> bool {
        self.items().iter().any(|i| i.kind() == ItemKind::Gear)
            || self.players().iter().any(|p| p.has_gear)
    }

    /// Winner of an ended match: a knocked-out player loses, otherwise the
    /// higher hit points win. A tie has no winner.
    fn winner(&self) -> Option<&Player> {
        if !self.is_ended() {
            return None;
        }
        let [a, b] = self.players() else {
            return None;
        };
        if a.hp == 0 && b.hp > 0 {
            return Some(b);
        }
        if b.hp == 0 && a.hp > 0 {
            return Some(a);
        }
        match a.hp.cmp(&b.hp) {
            std::cmp::Ordering::Greater => Some(a),
            std::cmp::Ordering::Less => Some(b),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// In-memory game state with the two default seats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    players: Vec<Player>,
    items: Vec<Item>,
    started: bool,
    ended: bool,
    max_hp: u32,
    match_duration_ms: f64,
    remaining_ms: f64,
    /// Last (timestamp, seq) handed out per item kind
    last_issued: [Option<(u64, u32)>; 2],
}

impl MatchState {
    /// Two seated players at full health
    pub fn new(max_hp: u32, match_duration_ms: f64) -> Self {
        let players = vec![
            Player::new(PlayerId(1), "SuperIdol", max_hp, Vec2::new(150.0, 250.0)),
            Player::new(PlayerId(2), "IShowSpeed", max_hp, Vec2::new(450.0, 250.0)),
        ];
        Self::with_players(players, max_hp, match_duration_ms)
    }

    pub fn with_players(players: Vec<Player>, max_hp: u32, match_duration_ms: f64) -> Self {
        Self {
            players,
            items: Vec::new(),
            started: false,
            ended: false,
            max_hp,
            match_duration_ms,
            remaining_ms: match_duration_ms,
            last_issued: [None; 2],
        }
    }

    fn next_item_id(&mut self, kind: ItemKind, now_ms: u64) -> ItemId {
        let slot = &mut self.last_issued[kind.index()];
        let seq = match *slot {
            Some((ms, seq)) if ms == now_ms => seq + 1,
            _ => 0,
        };
        *slot = Some((now_ms, seq));
        ItemId {
            kind,
            created_ms: now_ms,
            seq,
        }
    }
}

impl GameStore for MatchState {
    fn players(&self) -> &[Player] {
        &self.players
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    fn add_item(
        &mut self,
        kind: ItemKind,
        position: Vec2,
        velocity: Option<Vec2>,
        now_ms: u64,
    ) -> ItemId {
        let id = self.next_item_id(kind, now_ms);
        self.items.push(Item {
            id,
            position,
            velocity,
        });
        id
    }

    fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn start_match(&mut self) {
        self.reset_match();
        self.started = true;
    }

    fn end_match(&mut self) {
        self.ended = true;
    }

    fn reset_match(&mut self) {
        self.started = false;
        self.ended = false;
        self.remaining_ms = self.match_duration_ms;
        for player in &mut self.players {
            player.hp = self.max_hp;
            player.has_gear = false;
        }
        self.items.clear();
        self.last_issued = [None; 2];
    }

    fn damage_player(&mut self, id: PlayerId) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        player.hp = player.hp.saturating_sub(1);
        if player.hp == 0 {
            self.end_match();
        }
    }

    fn heal_player(&mut self, id: PlayerId) {
        let max_hp = self.max_hp;
        if let Some(player) = self.player_mut(id) {
            player.hp = (player.hp + 1).min(max_hp);
        }
    }

    fn set_speed_factor(&mut self, id: PlayerId, speed_factor: f32) {
        if let Some(player) = self.player_mut(id) {
            player.speed_factor = speed_factor;
        }
    }

    fn max_hp(&self) -> u32 {
        self.max_hp
    }

    fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    fn set_remaining_ms(&mut self, remaining_ms: f64) {
        self.remaining_ms = remaining_ms.max(0.0);
    }
}
