//! Player state and resource management.
//!
//! This module contains:
//! - Resource identifiers (with the input synonyms normalized away)
//! - ResourceHand for managing resource counts
//! - Development cards and the shuffled deck
//! - Building costs
//! - Per-seat agent configuration and the Player struct

use crate::agents::{AlgorithmKind, SearchParams};
use crate::board::PlayerId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Resource types.
///
/// The canonical identifiers are `wood, brick, wheat, sheep, ore`. The
/// classic synonyms (`lumber`, `clay`, `grain`, `wool`) are accepted on
/// input and normalized to the canonical spelling on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    #[serde(alias = "lumber")]
    Wood,
    #[serde(alias = "clay")]
    Brick,
    #[serde(alias = "grain")]
    Wheat,
    #[serde(alias = "wool")]
    Sheep,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Wheat,
        Resource::Sheep,
        Resource::Ore,
    ];
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub wheat: u32,
    pub sheep: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, wheat: u32, sheep: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            wheat,
            sheep,
            ore,
        }
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.wood + self.brick + self.wheat + self.sheep + self.ore
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Wheat => self.wheat,
            Resource::Sheep => self.sheep,
            Resource::Ore => self.ore,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::Wood => self.wood = count,
            Resource::Brick => self.brick = count,
            Resource::Wheat => self.wheat = count,
            Resource::Sheep => self.sheep = count,
            Resource::Ore => self.ore = count,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.set(resource, self.get(resource) + amount);
    }

    /// Check if this hand covers a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|&r| self.get(r) >= cost.get(r))
    }

    /// Subtract a cost (panics if insufficient; validate first)
    pub fn subtract(&mut self, cost: &ResourceHand) {
        assert!(self.can_afford(cost), "cannot afford this cost");
        for r in Resource::ALL {
            self.set(r, self.get(r) - cost.get(r));
        }
    }

    /// Subtract as much of a cost as is present (for the rough forward
    /// model, which never rejects)
    pub fn subtract_saturating(&mut self, cost: &ResourceHand) {
        for r in Resource::ALL {
            self.set(r, self.get(r).saturating_sub(cost.get(r)));
        }
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Town: 1 wood, 1 brick, 1 wheat, 1 sheep
    pub fn town() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// City upgrade: 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 2, 0, 3)
    }

    /// Development card: 1 sheep, 1 wheat, 1 ore
    pub fn dev_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DevCardKind {
    /// Move the robber, counts toward Largest Army
    Knight,
    /// Worth 1 VP while held
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// Sweep one resource from every other player
    Monopoly,
}

impl DevCardKind {
    /// The standard 25-card deck composition
    pub fn standard_deck() -> Vec<DevCardKind> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevCardKind::Knight).take(14));
        deck.extend(std::iter::repeat(DevCardKind::VictoryPoint).take(5));
        deck.extend(std::iter::repeat(DevCardKind::RoadBuilding).take(2));
        deck.extend(std::iter::repeat(DevCardKind::YearOfPlenty).take(2));
        deck.extend(std::iter::repeat(DevCardKind::Monopoly).take(2));
        deck
    }

    pub fn shuffle_deck<R: Rng>(deck: &mut [DevCardKind], rng: &mut R) {
        deck.shuffle(rng);
    }
}

/// A development card in a player's hand.
///
/// Cards enter the hand locked (`can_play = false`) and unlock when the
/// owner's turn ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevCard {
    #[serde(rename = "type")]
    pub kind: DevCardKind,
    pub can_play: bool,
}

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
}

impl PlayerColor {
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Orange,
            _ => PlayerColor::White,
        }
    }
}

/// What drives a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Human,
    Llm,
    Algorithm,
}

/// How LLM and search proposals combine for one seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmMode {
    #[default]
    None,
    LlmOnly,
    AlgoOnly,
    LlmPlusAlgo,
}

/// Per-seat agent configuration.
///
/// Provider *metadata* only: credentials live server-side, next to the
/// session, and never enter core state or any projection of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub kind: AgentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub algorithm_mode: AlgorithmMode,
    #[serde(default)]
    pub algorithm: AlgorithmKind,
    #[serde(default)]
    pub params: SearchParams,
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub agent: AgentProfile,
    pub resources: ResourceHand,
    pub dev_cards: Vec<DevCard>,
    /// Knights played (for Largest Army)
    pub knights_played: u32,
    /// Completed harbor trades
    pub trades: u32,
    pub longest_road: bool,
    pub largest_army: bool,
    pub has_rolled: bool,
    pub robber_moved_this_turn: bool,
    pub bought_dev_card_this_turn: bool,
    /// Free road grants from a Road Building card, valid this turn
    pub free_roads: u8,
    /// Derived victory points, recomputed after every action
    pub vp: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, agent: AgentProfile) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            agent,
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            knights_played: 0,
            trades: 0,
            longest_road: false,
            largest_army: false,
            has_rolled: false,
            robber_moved_this_turn: false,
            bought_dev_card_this_turn: false,
            free_roads: 0,
            vp: 0,
        }
    }

    /// Number of victory-point cards in hand
    pub fn vp_card_count(&self) -> u32 {
        self.dev_cards
            .iter()
            .filter(|c| c.kind == DevCardKind::VictoryPoint)
            .count() as u32
    }

    /// Whether a playable card of the given kind is in hand
    pub fn has_playable_card(&self, kind: DevCardKind) -> bool {
        self.dev_cards.iter().any(|c| c.kind == kind && c.can_play)
    }

    /// Remove one playable card of the given kind, returning whether one
    /// was found
    pub fn take_playable_card(&mut self, kind: DevCardKind) -> bool {
        if let Some(pos) = self
            .dev_cards
            .iter()
            .position(|c| c.kind == kind && c.can_play)
        {
            self.dev_cards.remove(pos);
            true
        } else {
            false
        }
    }

    /// Add a freshly bought card; it stays locked until end of turn
    pub fn gain_dev_card(&mut self, kind: DevCardKind) {
        self.dev_cards.push(DevCard {
            kind,
            can_play: false,
        });
        self.bought_dev_card_this_turn = true;
    }

    /// End-of-turn reset: unlock every card, clear the per-turn flags
    pub fn finish_turn(&mut self) {
        for card in &mut self.dev_cards {
            card.can_play = true;
        }
        self.has_rolled = false;
        self.robber_moved_this_turn = false;
        self.bought_dev_card_this_turn = false;
        self.free_roads = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
    }

    #[test]
    fn test_resource_hand_can_afford() {
        let hand = ResourceHand::with_amounts(2, 2, 2, 2, 2);
        let cost = ResourceHand::with_amounts(1, 1, 1, 1, 1);
        assert!(hand.can_afford(&cost));

        let expensive = ResourceHand::with_amounts(3, 0, 0, 0, 0);
        assert!(!hand.can_afford(&expensive));
    }

    #[test]
    fn test_resource_hand_subtract() {
        let mut hand = ResourceHand::with_amounts(3, 3, 3, 3, 3);
        let cost = ResourceHand::with_amounts(1, 1, 1, 1, 1);
        hand.subtract(&cost);
        assert_eq!(hand, ResourceHand::with_amounts(2, 2, 2, 2, 2));
    }

    #[test]
    fn test_resource_synonyms_accepted() {
        let r: Resource = serde_json::from_str("\"lumber\"").unwrap();
        assert_eq!(r, Resource::Wood);
        let r: Resource = serde_json::from_str("\"grain\"").unwrap();
        assert_eq!(r, Resource::Wheat);
        let r: Resource = serde_json::from_str("\"wool\"").unwrap();
        assert_eq!(r, Resource::Sheep);
        let r: Resource = serde_json::from_str("\"clay\"").unwrap();
        assert_eq!(r, Resource::Brick);

        // Canonical on output
        assert_eq!(serde_json::to_string(&Resource::Wood).unwrap(), "\"wood\"");
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::town().total(), 4);
        assert_eq!(costs::city().total(), 5);
        assert_eq!(costs::dev_card().total(), 3);
    }

    #[test]
    fn test_dev_card_deck_composition() {
        let deck = DevCardKind::standard_deck();
        assert_eq!(deck.len(), 25);

        let knights = deck
            .iter()
            .filter(|c| matches!(c, DevCardKind::Knight))
            .count();
        assert_eq!(knights, 14);
        let vps = deck
            .iter()
            .filter(|c| matches!(c, DevCardKind::VictoryPoint))
            .count();
        assert_eq!(vps, 5);
    }

    #[test]
    fn test_bought_card_locked_until_turn_end() {
        let mut player = Player::new(0, "Test".to_string(), AgentProfile::default());
        player.gain_dev_card(DevCardKind::Knight);

        assert!(!player.has_playable_card(DevCardKind::Knight));
        assert!(player.bought_dev_card_this_turn);

        player.finish_turn();

        assert!(player.has_playable_card(DevCardKind::Knight));
        assert!(!player.bought_dev_card_this_turn);
    }

    #[test]
    fn test_take_playable_card_skips_locked() {
        let mut player = Player::new(0, "Test".to_string(), AgentProfile::default());
        player.gain_dev_card(DevCardKind::Monopoly);

        assert!(!player.take_playable_card(DevCardKind::Monopoly));
        player.finish_turn();
        assert!(player.take_playable_card(DevCardKind::Monopoly));
        assert!(player.dev_cards.is_empty());
    }
}
