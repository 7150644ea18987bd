//! Shared evaluation vocabulary for the search agents.
//!
//! All three policies (heuristic, minimax, MCTS) score positions with the
//! same primitives: 2d6 roll probabilities, per-node production scores,
//! edge expansion scores, and a linear state evaluation that weighs the
//! root player against the strongest opponent.

use crate::board::{Board, BuildingKind, EdgeId, NodeId, PlayerId, TileId};
use crate::game::GameSession;
use crate::player::{costs, Player, Resource};

/// Probability of rolling `n` with two dice. Rolls of 7 never produce,
/// so P(7) = 0 here.
pub fn roll_probability(n: u8) -> f64 {
    if n == 7 || !(2..=12).contains(&n) {
        return 0.0;
    }
    (6 - (7 - n as i32).abs()) as f64 / 36.0
}

/// What a node is being scored for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    Town,
    City,
}

/// Resource weight by build mode. City mode leans toward wheat and ore
/// since those feed the upgrade.
fn resource_weight(resource: Resource, mode: ScoreMode) -> f64 {
    match (resource, mode) {
        (Resource::Wood, _) => 0.9,
        (Resource::Brick, _) => 0.9,
        (Resource::Wheat, ScoreMode::Town) => 1.1,
        (Resource::Wheat, ScoreMode::City) => 1.2,
        (Resource::Sheep, _) => 0.8,
        (Resource::Ore, ScoreMode::Town) => 1.0,
        (Resource::Ore, ScoreMode::City) => 1.25,
    }
}

/// Expected weighted production of a node: sum of P(number) * weight over
/// adjacent producing tiles, a 0.15 penalty when the robber sits next
/// door, and a small diversity bonus per distinct adjacent resource.
pub fn node_production_score(board: &Board, node: NodeId, mode: ScoreMode) -> f64 {
    let mut score = 0.0;
    let mut robbed = false;
    let mut kinds: Vec<Resource> = Vec::new();

    for &tile_id in &board.nodes[node].tiles {
        let tile = &board.tiles[tile_id];
        let (Some(number), Some(resource)) = (tile.number, tile.terrain.resource()) else {
            continue;
        };
        score += roll_probability(number) * resource_weight(resource, mode);
        if tile.has_robber {
            robbed = true;
        }
        if !kinds.contains(&resource) {
            kinds.push(resource);
        }
    }

    if robbed {
        score -= 0.15;
    }
    score + 0.04 * kinds.len() as f64
}

/// Expansion value of an edge: the better of its endpoint scores plus
/// 0.05 per endpoint that is still empty and buildable.
pub fn edge_expansion_score(board: &Board, edge: EdgeId) -> f64 {
    let [a, b] = board.edges[edge].nodes;
    let mut score = node_production_score(board, a, ScoreMode::Town)
        .max(node_production_score(board, b, ScoreMode::Town));
    for node in [a, b] {
        if board.nodes[node].building.is_none() && board.nodes[node].can_build {
            score += 0.05;
        }
    }
    score
}

/// Raw expected production of a player: towns count once, cities twice.
pub fn player_production(board: &Board, player: PlayerId) -> f64 {
    let mut total = 0.0;
    for node in &board.nodes {
        let Some(building) = node.building else { continue };
        if building.owner != player {
            continue;
        }
        let per_roll: f64 = node
            .tiles
            .iter()
            .filter(|&&t| !board.tiles[t].has_robber)
            .filter_map(|&t| board.tiles[t].number)
            .map(roll_probability)
            .sum();
        total += building.kind.production_multiplier() as f64 * per_roll;
    }
    total
}

/// Hand quality: a little credit per card held (capped) plus readiness
/// bonuses for affordable builds.
pub fn resource_heuristic(player: &Player) -> f64 {
    let mut score = 0.2 * player.resources.total().min(8) as f64;
    if player.resources.can_afford(&costs::town()) {
        score += 0.5;
    }
    if player.resources.can_afford(&costs::city()) {
        score += 0.6;
    }
    if player.resources.can_afford(&costs::road()) {
        score += 0.3;
    }
    score
}

/// Linear state value from the root player's point of view:
/// own VP and production against the strongest opponent.
pub fn evaluate_state(session: &GameSession, root: PlayerId) -> f64 {
    let me = &session.players[root as usize];
    let my_value = 2.4 * me.vp as f64
        + 1.2 * player_production(&session.board, root)
        + 0.6 * resource_heuristic(me);

    let best_opponent = session
        .players
        .iter()
        .filter(|p| p.id != root)
        .map(|p| 1.25 * p.vp as f64 + 0.85 * player_production(&session.board, p.id))
        .fold(0.0, f64::max);

    my_value - 0.9 * best_opponent
}

/// Robber placement value for `mover`: hurt opponents on productive
/// tiles, avoid our own buildings. Cities count double.
pub fn robber_target_score(board: &Board, tile: TileId, mover: PlayerId) -> f64 {
    let Some(number) = board.tiles[tile].number else {
        return 0.0;
    };

    let mut own_weight = 0.0;
    let mut opponent_weight = 0.0;
    for node in board.nodes.iter().filter(|n| n.tiles.contains(&tile)) {
        if let Some(building) = node.building {
            let weight = match building.kind {
                BuildingKind::Town => 1.0,
                BuildingKind::City => 2.0,
            };
            if building.owner == mover {
                own_weight += weight;
            } else {
                opponent_weight += weight;
            }
        }
    }

    roll_probability(number) * (opponent_weight - 0.65 * own_weight)
}
