//! HTTP request/response types and state projections.
//!
//! Everything the wire sees is defined here: per-seat configuration, the
//! UI-ready [`GameView`], the compact [`AgentSnapshot`] handed to LLM
//! seats, and the [`ApiError`] mapping engine and provider failures onto
//! status codes. Credentials never appear in any projection.

use crate::provider::ProviderKind;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use hexagora_core::{
    legal_actions, Action, AgentKind, AgentProfile, AlgorithmKind, AlgorithmMode, Board, DevCardKind,
    ErrorKind, GameError, GameEvent, GameSession, LegalActions, NodeId, PlayerColor, PlayerId,
    ProductionGain, ResourceHand, SearchParams, Terrain, TileId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==================== Requests ====================

/// What drives a seat on the wire; local search is selected through
/// `algorithmMode`, not a third type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeatKind {
    #[default]
    Human,
    Llm,
}

/// Per-seat configuration from game creation
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeatConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: SeatKind,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub algorithm_mode: AlgorithmMode,
    #[serde(default)]
    pub algorithm: AlgorithmKind,
    #[serde(default)]
    pub params: SearchParams,
}

impl SeatConfig {
    /// The core-side agent profile: `algo_only` seats need no provider
    /// and are driven purely by local search.
    pub fn agent_profile(&self) -> AgentProfile {
        let kind = match self.kind {
            SeatKind::Human => AgentKind::Human,
            SeatKind::Llm if self.algorithm_mode == AlgorithmMode::AlgoOnly => {
                AgentKind::Algorithm
            }
            SeatKind::Llm => AgentKind::Llm,
        };
        AgentProfile {
            kind,
            provider: self.provider.map(|p| p.as_str().to_string()),
            model: self.model.clone(),
            api_endpoint: self.api_endpoint.clone(),
            algorithm_mode: self.algorithm_mode,
            algorithm: self.algorithm,
            params: self.params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub num_players: u8,
    #[serde(default)]
    pub player_configs: Vec<SeatConfig>,
    /// Board/deck seed, for reproducible games
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Per-call overrides for one agent turn
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentTurnRequest {
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// Free-form guidance appended to the first prompt
    #[serde(default)]
    pub notes: Option<String>,
    /// `false` asks for a dry run: sanitize one proposal, apply nothing
    #[serde(default)]
    pub auto_apply: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

// ==================== Projections ====================

/// A player as the UI sees them: derived holdings included, credentials
/// and nothing secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub agent_kind: AgentKind,
    pub resources: ResourceHand,
    pub towns: u32,
    pub cities: u32,
    pub roads: u32,
    pub dev_card_count: usize,
    pub victory_points: u32,
    pub knights_played: u32,
    pub trades: u32,
    pub longest_road: bool,
    pub largest_army: bool,
    pub has_rolled: bool,
    pub robber_moved_this_turn: bool,
    pub bought_dev_card_this_turn: bool,
}

/// The full UI-ready projection of one session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: Uuid,
    pub turn: u32,
    pub current: usize,
    pub last_roll: Option<u8>,
    pub last_production: Vec<ProductionGain>,
    pub robber_pending: bool,
    pub winner: Option<PlayerId>,
    pub dev_deck_remaining: usize,
    pub players: Vec<PlayerView>,
    pub board: Board,
    /// Clickability hints for the active player
    pub legal: LegalActions,
}

pub fn game_view(id: Uuid, session: &GameSession) -> GameView {
    let players = session
        .players
        .iter()
        .map(|p| {
            let (towns, cities, roads) = session.board.holdings(p.id);
            PlayerView {
                id: p.id,
                name: p.name.clone(),
                color: p.color,
                agent_kind: p.agent.kind,
                resources: p.resources.clone(),
                towns,
                cities,
                roads,
                dev_card_count: p.dev_cards.len(),
                victory_points: p.vp,
                knights_played: p.knights_played,
                trades: p.trades,
                longest_road: p.longest_road,
                largest_army: p.largest_army,
                has_rolled: p.has_rolled,
                robber_moved_this_turn: p.robber_moved_this_turn,
                bought_dev_card_this_turn: p.bought_dev_card_this_turn,
            }
        })
        .collect();

    let active = session.players[session.current].id;
    GameView {
        id,
        turn: session.turn,
        current: session.current,
        last_roll: session.last_roll,
        last_production: session.last_production.clone(),
        robber_pending: session.robber_pending,
        winner: session.winner,
        dev_deck_remaining: session.dev_deck.len(),
        players,
        board: session.board.clone(),
        legal: legal_actions(session, active),
    }
}

// ==================== Agent snapshot ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTile {
    pub id: TileId,
    pub resource: Terrain,
    pub number: Option<u8>,
    pub has_robber: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub id: NodeId,
    pub hexes: Vec<TileId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEdge {
    pub id: usize,
    pub nodes: [NodeId; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPlayer {
    pub id: PlayerId,
    pub name: String,
    pub resources: ResourceHand,
    pub victory_points: u32,
    pub dev_card_count: usize,
    pub knights_played: u32,
    pub has_rolled: bool,
    pub robber_moved_this_turn: bool,
}

/// The compact projection sent to an LLM seat. Tile, node, and edge ids
/// in any proposal are indices into these arrays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub you: PlayerId,
    pub last_roll: Option<u8>,
    pub robber_hex: TileId,
    pub robber_pending: bool,
    pub your_playable_cards: Vec<DevCardKind>,
    pub tiles: Vec<SnapshotTile>,
    pub open_nodes: Vec<SnapshotNode>,
    pub open_edges: Vec<SnapshotEdge>,
    pub players: Vec<SnapshotPlayer>,
    pub legal: LegalActions,
}

pub fn agent_snapshot(session: &GameSession, player: PlayerId) -> AgentSnapshot {
    let me = &session.players[player as usize];
    AgentSnapshot {
        you: player,
        last_roll: session.last_roll,
        robber_hex: session.board.robber_tile,
        robber_pending: session.robber_pending,
        your_playable_cards: me
            .dev_cards
            .iter()
            .filter(|c| c.can_play)
            .map(|c| c.kind)
            .collect(),
        tiles: session
            .board
            .tiles
            .iter()
            .map(|t| SnapshotTile {
                id: t.id,
                resource: t.terrain,
                number: t.number,
                has_robber: t.has_robber,
            })
            .collect(),
        open_nodes: session
            .board
            .nodes
            .iter()
            .filter(|n| n.building.is_none())
            .map(|n| SnapshotNode {
                id: n.id,
                hexes: n.tiles.clone(),
            })
            .collect(),
        open_edges: session
            .board
            .edges
            .iter()
            .filter(|e| e.owner.is_none())
            .map(|e| SnapshotEdge {
                id: e.id,
                nodes: e.nodes,
            })
            .collect(),
        players: session
            .players
            .iter()
            .map(|p| SnapshotPlayer {
                id: p.id,
                name: p.name.clone(),
                resources: p.resources.clone(),
                victory_points: p.vp,
                dev_card_count: p.dev_cards.len(),
                knights_played: p.knights_played,
                has_rolled: p.has_rolled,
                robber_moved_this_turn: p.robber_moved_this_turn,
            })
            .collect(),
        legal: legal_actions(session, player),
    }
}

// ==================== Responses ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub id: Uuid,
    pub state: GameView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action: Action,
    pub events: Vec<GameEvent>,
    pub state: GameView,
}

/// One action the driver managed to apply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedAction {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTurnResponse {
    pub actions: Vec<AppliedAction>,
    pub state: GameView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present on dry runs (`autoApply: false`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Action>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: usize,
}

// ==================== Error mapping ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    message: String,
}

/// Failures surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Game(#[from] GameError),

    #[error("unknown game id")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind_str(&self) -> &'static str {
        match self {
            ApiError::Game(e) => e.kind().as_str(),
            ApiError::NotFound => "notFound",
            ApiError::BadRequest(_) => ErrorKind::InvalidRequest.as_str(),
            ApiError::Provider(_) => "providerError",
            ApiError::Internal(_) => "internalError",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Game(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind_str().to_string(),
            message: self.to_string(),
        })
    }
}
