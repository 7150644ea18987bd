//! Game board representation and generation.
//!
//! The board is three parallel arrays of plain records (tiles, nodes,
//! and edges) addressed by contiguous integer ids. Adjacency is stored
//! as index lists; there is no pointer graph. The generator lays out a
//! radius-2 land disc inside a radius-3 water ring, assigns resources and
//! number tokens, places spaced harbors on the water ring, builds the
//! corner/edge graph by position dedup, prunes unbuildable corners, and
//! finally performs the one-time initial placement for every seat.

use crate::eval::roll_probability;
use crate::hex::HexCoord;
use crate::player::Resource;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Player identifier (0-3 for a 4-player game)
pub type PlayerId = u8;
/// Index into `Board::tiles`
pub type TileId = usize;
/// Index into `Board::nodes`
pub type NodeId = usize;
/// Index into `Board::edges`
pub type EdgeId = usize;

/// Land disc radius (19 tiles)
const LAND_RADIUS: i32 = 2;
/// Outer frame radius; everything past the land disc is water
const WATER_RADIUS: i32 = 3;
/// Corner positions are deduped at this resolution (3 decimals, unit hex)
const CORNER_SNAP: f64 = 1000.0;

/// What a tile is made of.
///
/// The five resource terrains produce on a matching roll; desert and
/// water never produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Wood,
    Brick,
    Wheat,
    Sheep,
    Ore,
    Desert,
    Water,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Wood => Some(Resource::Wood),
            Terrain::Brick => Some(Resource::Brick),
            Terrain::Wheat => Some(Resource::Wheat),
            Terrain::Sheep => Some(Resource::Sheep),
            Terrain::Ore => Some(Resource::Ore),
            Terrain::Desert | Terrain::Water => None,
        }
    }

    pub fn is_land(&self) -> bool {
        !matches!(self, Terrain::Water)
    }
}

/// Harbor trading bonus attached to a water tile and inherited by the
/// shore nodes touching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Harbor {
    /// 2:1 for one specific resource
    Specific(Resource),
    /// 3:1 for anything
    Generic,
}

impl Harbor {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            Harbor::Specific(_) => 2,
            Harbor::Generic => 3,
        }
    }
}

/// A single hex tile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub coord: HexCoord,
    #[serde(rename = "resource")]
    pub terrain: Terrain,
    /// Dice number that triggers production (2-12 except 7; None for
    /// desert and water)
    pub number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harbor: Option<Harbor>,
    pub has_robber: bool,
}

/// Building kind at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    Town,
    City,
}

impl BuildingKind {
    /// Victory points provided by this building
    pub fn victory_points(&self) -> u32 {
        match self {
            BuildingKind::Town => 1,
            BuildingKind::City => 2,
        }
    }

    /// Resources granted per matching production roll
    pub fn production_multiplier(&self) -> u32 {
        match self {
            BuildingKind::Town => 1,
            BuildingKind::City => 2,
        }
    }
}

/// A building on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub owner: PlayerId,
    #[serde(rename = "type")]
    pub kind: BuildingKind,
}

/// A corner where up to three tiles meet; the build site for towns and
/// cities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    /// Adjacent tile ids (1-3)
    pub tiles: Vec<TileId>,
    /// True iff adjacent to at least one non-water tile
    pub can_build: bool,
    /// Harbors inherited from adjacent water tiles
    pub harbors: Vec<Harbor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<Building>,
}

/// A side shared by two tiles; the build site for roads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub nodes: [NodeId; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<PlayerId>,
}

/// The complete game board.
///
/// Structure is immutable after generation; only the robber position,
/// node buildings, and edge ownership change during play.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub tiles: Vec<Tile>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub robber_tile: TileId,
}

impl Board {
    /// Generate a fresh board from the given RNG.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut tiles = Self::lay_tiles(rng);
        Self::place_harbors(&mut tiles, rng);

        let robber_tile = tiles
            .iter()
            .position(|t| t.has_robber)
            .expect("generator always produces one desert");

        let (nodes, edges) = Self::build_graph(&tiles);

        Self {
            tiles,
            nodes,
            edges,
            robber_tile,
        }
    }

    /// Lay out terrain and number tokens over the full disc.
    fn lay_tiles<R: Rng>(rng: &mut R) -> Vec<Tile> {
        let mut resources = vec![
            Terrain::Wood,
            Terrain::Wood,
            Terrain::Wood,
            Terrain::Wood,
            Terrain::Sheep,
            Terrain::Sheep,
            Terrain::Sheep,
            Terrain::Sheep,
            Terrain::Wheat,
            Terrain::Wheat,
            Terrain::Wheat,
            Terrain::Wheat,
            Terrain::Brick,
            Terrain::Brick,
            Terrain::Brick,
            Terrain::Ore,
            Terrain::Ore,
            Terrain::Ore,
            Terrain::Desert,
        ];
        resources.shuffle(rng);

        let mut numbers = vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];
        numbers.shuffle(rng);

        let origin = HexCoord::new(0, 0);
        let mut tiles = Vec::new();
        let mut number_idx = 0;

        for coord in HexCoord::disc(WATER_RADIUS) {
            let id = tiles.len();
            if origin.distance_to(&coord) <= LAND_RADIUS as u32 {
                let terrain = resources.pop().expect("one terrain per land tile");
                let (number, has_robber) = if terrain == Terrain::Desert {
                    (None, true)
                } else {
                    let n = numbers[number_idx];
                    number_idx += 1;
                    (Some(n), false)
                };
                tiles.push(Tile {
                    id,
                    coord,
                    terrain,
                    number,
                    harbor: None,
                    has_robber,
                });
            } else {
                tiles.push(Tile {
                    id,
                    coord,
                    terrain: Terrain::Water,
                    number: None,
                    harbor: None,
                    has_robber: false,
                });
            }
        }

        tiles
    }

    /// Place up to 9 harbors (five 2:1, four 3:1) on water tiles adjacent
    /// to land, keeping any two harbor tiles at hex-distance >= 2.
    ///
    /// When spacing runs out of valid slots, fewer harbors are placed;
    /// that is tolerated.
    fn place_harbors<R: Rng>(tiles: &mut [Tile], rng: &mut R) {
        let mut kinds = vec![
            Harbor::Specific(Resource::Wood),
            Harbor::Specific(Resource::Brick),
            Harbor::Specific(Resource::Wheat),
            Harbor::Specific(Resource::Sheep),
            Harbor::Specific(Resource::Ore),
            Harbor::Generic,
            Harbor::Generic,
            Harbor::Generic,
            Harbor::Generic,
        ];
        kinds.shuffle(rng);

        let land_coords: Vec<HexCoord> = tiles
            .iter()
            .filter(|t| t.terrain.is_land())
            .map(|t| t.coord)
            .collect();

        let mut candidates: Vec<TileId> = tiles
            .iter()
            .filter(|t| {
                t.terrain == Terrain::Water
                    && t.coord
                        .neighbors()
                        .iter()
                        .any(|n| land_coords.contains(n))
            })
            .map(|t| t.id)
            .collect();
        candidates.shuffle(rng);

        let mut placed: Vec<HexCoord> = Vec::new();
        for tile_id in candidates {
            if kinds.is_empty() {
                break;
            }
            let coord = tiles[tile_id].coord;
            if placed.iter().any(|p| p.distance_to(&coord) < 2) {
                continue;
            }
            tiles[tile_id].harbor = kinds.pop();
            placed.push(coord);
        }
    }

    /// Build the node and edge arrays from tile geometry.
    ///
    /// Corners dedup by pixel position rounded to 3 decimals; sides dedup
    /// by unordered endpoint pair. Nodes that touch only water are
    /// dropped, along with any edge losing an endpoint, and the surviving
    /// records get contiguous ids.
    fn build_graph(tiles: &[Tile]) -> (Vec<Node>, Vec<Edge>) {
        let snap = |v: f64| (v * CORNER_SNAP).round() as i64;

        let mut corner_ids: HashMap<(i64, i64), usize> = HashMap::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut edge_pairs: Vec<[usize; 2]> = Vec::new();
        let mut seen_pairs: HashMap<(usize, usize), ()> = HashMap::new();

        for tile in tiles {
            let corners = tile.coord.corner_pixels(1.0);
            let mut ids = [0usize; 6];

            for (k, &(x, y)) in corners.iter().enumerate() {
                let key = (snap(x), snap(y));
                let id = *corner_ids.entry(key).or_insert_with(|| {
                    nodes.push(Node {
                        id: nodes.len(),
                        x,
                        y,
                        tiles: Vec::new(),
                        can_build: false,
                        harbors: Vec::new(),
                        building: None,
                    });
                    nodes.len() - 1
                });
                ids[k] = id;
                nodes[id].tiles.push(tile.id);
            }

            for k in 0..6 {
                let a = ids[k];
                let b = ids[(k + 1) % 6];
                let pair = (a.min(b), a.max(b));
                if seen_pairs.insert(pair, ()).is_none() {
                    edge_pairs.push([pair.0, pair.1]);
                }
            }
        }

        for node in &mut nodes {
            node.can_build = node.tiles.iter().any(|&t| tiles[t].terrain.is_land());
            node.harbors = node
                .tiles
                .iter()
                .filter(|&&t| tiles[t].terrain == Terrain::Water)
                .filter_map(|&t| tiles[t].harbor)
                .collect();
        }

        // Drop water-locked corners and remap ids to stay contiguous
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut kept_nodes: Vec<Node> = Vec::new();
        for node in nodes.into_iter().filter(|n| n.can_build) {
            let new_id = kept_nodes.len();
            remap.insert(node.id, new_id);
            kept_nodes.push(Node { id: new_id, ..node });
        }

        let mut edges: Vec<Edge> = Vec::new();
        for pair in edge_pairs {
            if let (Some(&a), Some(&b)) = (remap.get(&pair[0]), remap.get(&pair[1])) {
                edges.push(Edge {
                    id: edges.len(),
                    nodes: [a, b],
                    owner: None,
                });
            }
        }

        (kept_nodes, edges)
    }

    // ==================== Query Methods ====================

    /// All land tiles (non-water)
    pub fn land_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| t.terrain.is_land())
    }

    /// Edges touching a node
    pub fn edges_at(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.nodes.contains(&node))
    }

    /// Nodes reachable from this one through a single edge
    pub fn neighbor_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.edges_at(node)
            .map(|e| if e.nodes[0] == node { e.nodes[1] } else { e.nodes[0] })
            .collect()
    }

    /// Distance rule: no neighbor node may hold a building
    pub fn satisfies_distance_rule(&self, node: NodeId) -> bool {
        self.neighbor_nodes(node)
            .iter()
            .all(|&n| self.nodes[n].building.is_none())
    }

    /// Road connectivity: an endpoint holds one of the player's
    /// buildings, or an edge sharing an endpoint already carries the
    /// player's road.
    pub fn road_connects(&self, edge: EdgeId, player: PlayerId) -> bool {
        let endpoints = self.edges[edge].nodes;
        for node in endpoints {
            if self.nodes[node]
                .building
                .is_some_and(|b| b.owner == player)
            {
                return true;
            }
            if self
                .edges_at(node)
                .any(|e| e.id != edge && e.owner == Some(player))
            {
                return true;
            }
        }
        false
    }

    /// Best harbor-trade ratio for a player giving `resource`, scanning
    /// every node that holds one of their buildings. Default 4:1.
    pub fn best_trade_ratio(&self, player: PlayerId, resource: Resource) -> u32 {
        let mut ratio = 4;
        for node in &self.nodes {
            if !node.building.is_some_and(|b| b.owner == player) {
                continue;
            }
            for harbor in &node.harbors {
                match harbor {
                    Harbor::Specific(r) if *r == resource => ratio = ratio.min(2),
                    Harbor::Generic => ratio = ratio.min(3),
                    _ => {}
                }
            }
        }
        ratio
    }

    /// Resources produced for a dice roll: every building adjacent to a
    /// matching, robber-free tile grants its owner 1 (town) or 2 (city)
    /// of the tile's resource.
    pub fn production_for_roll(&self, roll: u8) -> HashMap<PlayerId, HashMap<Resource, u32>> {
        let mut distribution: HashMap<PlayerId, HashMap<Resource, u32>> = HashMap::new();

        for tile in &self.tiles {
            if tile.number != Some(roll) || tile.has_robber {
                continue;
            }
            let resource = match tile.terrain.resource() {
                Some(r) => r,
                None => continue,
            };

            for node in self.nodes.iter().filter(|n| n.tiles.contains(&tile.id)) {
                if let Some(building) = node.building {
                    *distribution
                        .entry(building.owner)
                        .or_default()
                        .entry(resource)
                        .or_insert(0) += building.kind.production_multiplier();
                }
            }
        }

        distribution
    }

    /// Per-player building and road counts (towns, cities, roads)
    pub fn holdings(&self, player: PlayerId) -> (u32, u32, u32) {
        let mut towns = 0;
        let mut cities = 0;
        for node in &self.nodes {
            match node.building {
                Some(Building { owner, kind }) if owner == player => match kind {
                    BuildingKind::Town => towns += 1,
                    BuildingKind::City => cities += 1,
                },
                _ => {}
            }
        }
        let roads = self.edges.iter().filter(|e| e.owner == Some(player)).count() as u32;
        (towns, cities, roads)
    }

    // ==================== Mutation Methods ====================

    /// Place a town (validation is the engine's job)
    pub fn place_town(&mut self, node: NodeId, player: PlayerId) {
        self.nodes[node].building = Some(Building {
            owner: player,
            kind: BuildingKind::Town,
        });
    }

    /// Upgrade a town to a city
    pub fn upgrade_to_city(&mut self, node: NodeId, player: PlayerId) {
        self.nodes[node].building = Some(Building {
            owner: player,
            kind: BuildingKind::City,
        });
    }

    /// Place a road
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        self.edges[edge].owner = Some(player);
    }

    /// Move the robber to a new tile
    pub fn move_robber(&mut self, tile: TileId) {
        self.tiles[self.robber_tile].has_robber = false;
        self.tiles[tile].has_robber = true;
        self.robber_tile = tile;
    }

    // ==================== Longest Chain ====================

    /// Length of the player's longest road chain, counted in edges.
    ///
    /// Node-visited DFS over the player's own edge graph: a simple path
    /// may not revisit a node. Strict-rules adopters would switch this to
    /// an edge-visited search.
    pub fn longest_chain(&self, player: PlayerId) -> u32 {
        let owned: Vec<&Edge> = self
            .edges
            .iter()
            .filter(|e| e.owner == Some(player))
            .collect();
        if owned.is_empty() {
            return 0;
        }

        let mut start_nodes: Vec<NodeId> = owned.iter().flat_map(|e| e.nodes).collect();
        start_nodes.sort_unstable();
        start_nodes.dedup();

        let mut best = 0;
        let mut visited = vec![false; self.nodes.len()];
        for node in start_nodes {
            best = best.max(self.chain_from(node, player, &mut visited));
        }
        best
    }

    fn chain_from(&self, node: NodeId, player: PlayerId, visited: &mut [bool]) -> u32 {
        visited[node] = true;
        let mut best = 0;
        for edge in self.edges.iter().filter(|e| e.owner == Some(player)) {
            if !edge.nodes.contains(&node) {
                continue;
            }
            let other = if edge.nodes[0] == node {
                edge.nodes[1]
            } else {
                edge.nodes[0]
            };
            if !visited[other] {
                best = best.max(1 + self.chain_from(other, player, visited));
            }
        }
        visited[node] = false;
        best
    }
}

/// One-time initial placement: each seat in order receives two towns and
/// one road adjacent to its first town.
///
/// Candidate nodes must be buildable, empty, clear of the distance rule,
/// and not adjacent to the desert. Candidates are ranked by summed roll
/// probability of their numbered tiles; the road takes the adjacent empty
/// edge whose far endpoint ranks best.
pub fn place_initial_buildings(board: &mut Board, players: &[PlayerId]) {
    for &player in players {
        let mut first_town = None;
        for round in 0..2 {
            let candidate = best_start_node(board);
            let Some(node) = candidate else { continue };
            board.place_town(node, player);
            if round == 0 {
                first_town = Some(node);
            }
        }

        if let Some(town) = first_town {
            let road = board
                .edges_at(town)
                .filter(|e| e.owner.is_none())
                .map(|e| {
                    let far = if e.nodes[0] == town { e.nodes[1] } else { e.nodes[0] };
                    (e.id, start_node_score(board, far))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id);
            if let Some(edge) = road {
                board.place_road(edge, player);
            }
        }
    }
}

fn best_start_node(board: &Board) -> Option<NodeId> {
    board
        .nodes
        .iter()
        .filter(|n| {
            n.can_build
                && n.building.is_none()
                && board.satisfies_distance_rule(n.id)
                && !n
                    .tiles
                    .iter()
                    .any(|&t| board.tiles[t].terrain == Terrain::Desert)
        })
        .map(|n| (n.id, start_node_score(board, n.id)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn start_node_score(board: &Board, node: NodeId) -> f64 {
    board.nodes[node]
        .tiles
        .iter()
        .filter_map(|&t| board.tiles[t].number)
        .map(roll_probability)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board(seed: u64) -> Board {
        Board::generate(&mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_generated_board_shape() {
        let board = board(7);

        assert_eq!(board.tiles.len(), 37);
        assert_eq!(board.land_tiles().count(), 19);
        // Standard geometry: 54 buildable corners, 72 land-adjacent sides
        assert_eq!(board.nodes.len(), 54);
        assert_eq!(board.edges.len(), 72);
    }

    #[test]
    fn test_exactly_one_desert_with_robber() {
        for seed in 0..10 {
            let board = board(seed);
            let deserts: Vec<_> = board
                .tiles
                .iter()
                .filter(|t| t.terrain == Terrain::Desert)
                .collect();
            assert_eq!(deserts.len(), 1);
            assert!(deserts[0].has_robber);
            assert_eq!(board.robber_tile, deserts[0].id);
            assert_eq!(board.tiles.iter().filter(|t| t.has_robber).count(), 1);
        }
    }

    #[test]
    fn test_number_tokens_cover_non_desert_land() {
        let board = board(3);
        for tile in board.land_tiles() {
            match tile.terrain {
                Terrain::Desert => assert_eq!(tile.number, None),
                _ => {
                    let n = tile.number.expect("resource tiles carry a token");
                    assert!((2..=12).contains(&n) && n != 7);
                }
            }
        }
    }

    #[test]
    fn test_harbors_spaced_and_on_water() {
        for seed in 0..10 {
            let board = board(seed);
            let harbor_tiles: Vec<&Tile> =
                board.tiles.iter().filter(|t| t.harbor.is_some()).collect();

            assert!(harbor_tiles.len() <= 9);
            assert!(!harbor_tiles.is_empty());
            for tile in &harbor_tiles {
                assert_eq!(tile.terrain, Terrain::Water);
            }
            for a in &harbor_tiles {
                for b in &harbor_tiles {
                    if a.id != b.id {
                        assert!(a.coord.distance_to(&b.coord) >= 2);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_node_is_buildable_and_touches_land() {
        let board = board(11);
        for node in &board.nodes {
            assert!(node.can_build);
            assert!(!node.tiles.is_empty() && node.tiles.len() <= 3);
            assert!(node.tiles.iter().any(|&t| board.tiles[t].terrain.is_land()));
        }
    }

    #[test]
    fn test_some_shore_node_inherits_a_harbor() {
        let board = board(2);
        let with_harbor = board.nodes.iter().filter(|n| !n.harbors.is_empty()).count();
        assert!(with_harbor > 0, "harbor tiles should reach shore nodes");
    }

    #[test]
    fn test_edges_reference_valid_nodes() {
        let board = board(5);
        for edge in &board.edges {
            assert!(edge.nodes[0] < board.nodes.len());
            assert!(edge.nodes[1] < board.nodes.len());
            assert_ne!(edge.nodes[0], edge.nodes[1]);
        }
    }

    #[test]
    fn test_distance_rule() {
        let mut board = board(1);
        let node = board.nodes[0].id;

        assert!(board.satisfies_distance_rule(node));
        board.place_town(node, 0);

        for neighbor in board.neighbor_nodes(node) {
            assert!(
                !board.satisfies_distance_rule(neighbor),
                "neighbor of a built node must fail the distance rule"
            );
        }
    }

    #[test]
    fn test_road_connectivity() {
        let mut board = board(4);
        let node = board.nodes[10].id;
        board.place_town(node, 1);

        let adjacent: Vec<EdgeId> = board.edges_at(node).map(|e| e.id).collect();
        for edge in &adjacent {
            assert!(board.road_connects(*edge, 1));
        }

        // Extending from a placed road also connects
        board.place_road(adjacent[0], 1);
        let far = {
            let e = &board.edges[adjacent[0]];
            if e.nodes[0] == node { e.nodes[1] } else { e.nodes[0] }
        };
        let extension = board
            .edges_at(far)
            .find(|e| e.id != adjacent[0])
            .map(|e| e.id)
            .unwrap();
        assert!(board.road_connects(extension, 1));
    }

    #[test]
    fn test_production_multipliers() {
        let mut board = board(9);
        let tile = board
            .land_tiles()
            .find(|t| t.number.is_some())
            .cloned()
            .unwrap();
        let node = board
            .nodes
            .iter()
            .find(|n| n.tiles.contains(&tile.id))
            .map(|n| n.id)
            .unwrap();

        board.place_town(node, 0);
        let dist = board.production_for_roll(tile.number.unwrap());
        assert_eq!(dist[&0][&tile.terrain.resource().unwrap()], 1);

        board.upgrade_to_city(node, 0);
        let dist = board.production_for_roll(tile.number.unwrap());
        assert_eq!(dist[&0][&tile.terrain.resource().unwrap()], 2);
    }

    #[test]
    fn test_robber_blocks_production() {
        let mut board = board(9);
        let tile = board
            .land_tiles()
            .find(|t| t.number.is_some() && !t.has_robber)
            .cloned()
            .unwrap();
        let node = board
            .nodes
            .iter()
            .find(|n| n.tiles.contains(&tile.id))
            .map(|n| n.id)
            .unwrap();
        board.place_town(node, 0);

        board.move_robber(tile.id);
        let dist = board.production_for_roll(tile.number.unwrap());
        assert!(dist.get(&0).map_or(true, |m| m.is_empty()));
    }

    #[test]
    fn test_best_trade_ratio_defaults_to_four() {
        let board = board(6);
        assert_eq!(board.best_trade_ratio(0, Resource::Wood), 4);
    }

    #[test]
    fn test_longest_chain() {
        let mut board = board(12);

        assert_eq!(board.longest_chain(2), 0);

        // Walk a path of three connected edges
        let first = board.edges[0].clone();
        board.place_road(first.id, 2);
        let mut tail = first.nodes[1];
        let mut prev = first.id;
        for _ in 0..2 {
            let next = board
                .edges_at(tail)
                .find(|e| e.id != prev && e.owner.is_none())
                .map(|e| (e.id, e.nodes))
                .unwrap();
            board.place_road(next.0, 2);
            tail = if next.1[0] == tail { next.1[1] } else { next.1[0] };
            prev = next.0;
        }

        assert_eq!(board.longest_chain(2), 3);
    }

    #[test]
    fn test_initial_placement() {
        let mut board = board(8);
        place_initial_buildings(&mut board, &[0, 1]);

        for player in 0..2u8 {
            let (towns, cities, roads) = board.holdings(player);
            assert_eq!(towns, 2, "each seat starts with two towns");
            assert_eq!(cities, 0);
            assert_eq!(roads, 1, "each seat starts with one road");
        }

        // Distance rule holds between all starting towns
        for node in board.nodes.iter().filter(|n| n.building.is_some()) {
            for neighbor in board.neighbor_nodes(node.id) {
                assert!(board.nodes[neighbor].building.is_none());
            }
        }

        // No starting town touches the desert
        for node in board.nodes.iter().filter(|n| n.building.is_some()) {
            assert!(!node
                .tiles
                .iter()
                .any(|&t| board.tiles[t].terrain == Terrain::Desert));
        }
    }
}
