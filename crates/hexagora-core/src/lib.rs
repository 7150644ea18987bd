//! Hexagora core - the rules engine for a hex-board trading game.
//!
//! This crate owns everything that is pure CPU:
//! - Board generation over an axial hex grid
//! - The authoritative rules engine with full validation
//! - Legal-action enumeration for agents and UI hints
//! - A cheap approximate forward model for search
//! - The heuristic, minimax, and MCTS policies
//!
//! The HTTP surface, LLM provider clients, and the agent-turn driver live
//! in the `hexagora-server` crate on top of this one.
//!
//! # Modules
//!
//! - [`hex`]: axial coordinates and corner geometry
//! - [`board`]: tiles, nodes, edges, harbors, robber, generation
//! - [`player`]: resources, development cards, seat configuration
//! - [`actions`]: the action/event vocabulary and wire format
//! - [`game`]: the state machine; all mutation goes through here
//! - [`legal`]: legal-action enumeration
//! - [`sim`]: the rough forward model used only by search
//! - [`eval`]: shared scoring vocabulary
//! - [`agents`]: the three search policies

pub mod actions;
pub mod agents;
pub mod board;
pub mod eval;
pub mod game;
pub mod hex;
pub mod legal;
pub mod player;
pub mod sim;

// Re-export commonly used types
pub use actions::{Action, ActionParseError, GameEvent, ProductionGain};
pub use agents::{
    AlgorithmKind, HeuristicPolicy, MctsPolicy, MinimaxPolicy, Policy, SearchParams, SearchReport,
};
pub use board::{
    Board, Building, BuildingKind, Edge, EdgeId, Harbor, Node, NodeId, PlayerId, Terrain, Tile,
    TileId,
};
pub use game::{ErrorKind, GameError, GameSession};
pub use hex::HexCoord;
pub use legal::{legal_actions, LegalActions, TradePair};
pub use player::{
    AgentKind, AgentProfile, AlgorithmMode, DevCard, DevCardKind, Player, PlayerColor, Resource,
    ResourceHand,
};
