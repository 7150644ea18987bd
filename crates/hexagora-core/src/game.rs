//! The rules engine.
//!
//! [`GameSession`] owns all mutable game state. Every action goes through
//! [`GameSession::apply`], which either mutates state consistently and
//! returns the resulting events, or fails with a [`GameError`] and leaves
//! state untouched: every arm validates completely before writing
//! anything.

use crate::actions::{Action, GameEvent, ProductionGain};
use crate::board::{self, Board, BuildingKind, PlayerId, TileId};
use crate::player::{costs, AgentProfile, DevCardKind, Player, Resource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum chain length for the Longest Road award
const MIN_LONGEST_ROAD: u32 = 5;
/// Minimum knights for the Largest Army award
const MIN_LARGEST_ARMY: u32 = 3;
/// Victory points needed to win
const VICTORY_POINTS_TO_WIN: u32 = 10;

/// How an operation failed, for the HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: unknown ids, nonsense payloads
    InvalidRequest,
    /// A rule precondition was violated
    IllegalAction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalidRequest",
            ErrorKind::IllegalAction => "illegalAction",
        }
    }
}

/// Errors from applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("not this player's turn")]
    NotYourTurn,

    #[error("the game is already over")]
    GameOver,

    #[error("dice already rolled this turn")]
    AlreadyRolled,

    #[error("roll the dice before this action")]
    MustRollFirst,

    #[error("the robber must be moved first")]
    RobberPending,

    #[error("the robber already moved this turn")]
    RobberAlreadyMoved,

    #[error("the robber is already on that tile")]
    RobberSameTile,

    #[error("that edge already has a road")]
    EdgeOccupied,

    #[error("road must connect to one of your buildings or roads")]
    NotConnected,

    #[error("that node is already occupied")]
    NodeOccupied,

    #[error("distance rule: an adjacent node is already built")]
    DistanceRule,

    #[error("that node is not buildable")]
    NotBuildable,

    #[error("no town of yours to upgrade there")]
    NoTownToUpgrade,

    #[error("cannot afford {0}")]
    CannotAfford(String),

    #[error("the development deck is empty")]
    EmptyDeck,

    #[error("no playable {0:?} card in hand")]
    NoPlayableCard(DevCardKind),

    #[error("no free road grants remaining")]
    NoFreeRoads,

    #[error("give and receive must differ")]
    SameResource,

    #[error("unknown tile id {0}")]
    UnknownTile(usize),

    #[error("unknown node id {0}")]
    UnknownNode(usize),

    #[error("unknown edge id {0}")]
    UnknownEdge(usize),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::UnknownTile(_)
            | GameError::UnknownNode(_)
            | GameError::UnknownEdge(_)
            | GameError::SameResource => ErrorKind::InvalidRequest,
            _ => ErrorKind::IllegalAction,
        }
    }
}

/// The complete state of one game
#[derive(Debug, Clone)]
pub struct GameSession {
    pub board: Board,
    pub players: Vec<Player>,
    /// Index of the active player
    pub current: usize,
    /// Turn counter, starting at 1
    pub turn: u32,
    /// Total of the most recent roll this turn
    pub last_roll: Option<u8>,
    /// Who gained what from the most recent production roll
    pub last_production: Vec<ProductionGain>,
    /// Shuffled development deck; shrinks monotonically
    pub dev_deck: Vec<DevCardKind>,
    /// Append-only event history
    pub event_log: Vec<GameEvent>,
    /// A 7 was rolled or a Knight played and the robber has not moved yet
    pub robber_pending: bool,
    pub winner: Option<PlayerId>,
    /// Seed the session RNG was created from, for replays
    pub rng_seed: u64,
    rng: StdRng,
}

impl GameSession {
    /// Create a new game with the given seats (2-4), generating and
    /// pre-settling the board.
    pub fn new(seats: Vec<(String, AgentProfile)>, seed: Option<u64>) -> Self {
        assert!(
            (2..=4).contains(&seats.len()),
            "must have 2-4 players"
        );

        let rng_seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(rng_seed);

        let mut board = Board::generate(&mut rng);
        let players: Vec<Player> = seats
            .into_iter()
            .enumerate()
            .map(|(i, (name, agent))| Player::new(i as PlayerId, name, agent))
            .collect();

        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        board::place_initial_buildings(&mut board, &ids);

        let mut dev_deck = DevCardKind::standard_deck();
        DevCardKind::shuffle_deck(&mut dev_deck, &mut rng);

        let mut session = Self {
            board,
            players,
            current: 0,
            turn: 1,
            last_roll: None,
            last_production: Vec::new(),
            dev_deck,
            event_log: Vec::new(),
            robber_pending: false,
            winner: None,
            rng_seed,
            rng,
        };
        session.refresh_victory_points();
        session
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn active_player(&self) -> &Player {
        &self.players[self.current]
    }

    fn active_player_mut(&mut self) -> &mut Player {
        &mut self.players[self.current]
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Apply one action for `player`. Atomic: on error, state is exactly
    /// as it was.
    pub fn apply(&mut self, player: PlayerId, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        if player as usize != self.current {
            return Err(GameError::NotYourTurn);
        }

        let mut events = match action {
            Action::RollDice => {
                if self.active_player().has_rolled {
                    return Err(GameError::AlreadyRolled);
                }
                let die1 = self.rng.gen_range(1..=6);
                let die2 = self.rng.gen_range(1..=6);
                self.resolve_roll(die1, die2)?
            }

            Action::MoveRobber { hex_id } => self.move_robber(*hex_id)?,

            Action::BuildRoad { edge_id, free } => self.build_road(*edge_id, *free)?,

            Action::BuildTown { node_id } => self.build_town(*node_id)?,

            Action::BuildCity { node_id } => self.build_city(*node_id)?,

            Action::HarborTrade { give, receive } => self.harbor_trade(*give, *receive)?,

            Action::BuyDevCard => self.buy_dev_card()?,

            Action::PlayKnight => self.play_knight()?,

            Action::PlayRoadBuilding => self.play_road_building()?,

            Action::PlayYearOfPlenty {
                resource1,
                resource2,
            } => self.play_year_of_plenty(*resource1, *resource2)?,

            Action::PlayMonopoly { resource } => self.play_monopoly(*resource)?,

            Action::EndTurn => self.end_turn(),
        };

        if let Some(win) = self.refresh_victory_points() {
            events.push(win);
        }
        self.event_log.extend(events.iter().cloned());

        Ok(events)
    }

    /// Resolve a dice roll with known dice. This is the same path
    /// `rollDice` takes after sampling; it is public for replays and
    /// tests that need a specific total.
    pub fn resolve_roll(&mut self, die1: u8, die2: u8) -> Result<Vec<GameEvent>, GameError> {
        if self.active_player().has_rolled {
            return Err(GameError::AlreadyRolled);
        }

        let player = self.active_player().id;
        let total = die1 + die2;
        self.active_player_mut().has_rolled = true;
        self.last_roll = Some(total);

        let mut events = vec![GameEvent::DiceRolled {
            player,
            dice: [die1, die2],
            total,
        }];

        if total == 7 {
            self.robber_pending = true;
            self.last_production.clear();
            return Ok(events);
        }

        let distribution = self.board.production_for_roll(total);
        let mut gains: Vec<ProductionGain> = Vec::new();
        for (owner, resources) in distribution {
            for (resource, amount) in resources {
                self.players[owner as usize].resources.add(resource, amount);
                gains.push(ProductionGain {
                    player: owner,
                    resource,
                    amount,
                });
            }
        }
        gains.sort_by_key(|g| {
            (
                g.player,
                Resource::ALL.iter().position(|&r| r == g.resource),
            )
        });

        self.last_production = gains.clone();
        if !gains.is_empty() {
            events.push(GameEvent::ProductionDistributed { gains });
        }

        Ok(events)
    }

    fn move_robber(&mut self, tile: TileId) -> Result<Vec<GameEvent>, GameError> {
        if tile >= self.board.tiles.len() {
            return Err(GameError::UnknownTile(tile));
        }
        if self.active_player().robber_moved_this_turn {
            return Err(GameError::RobberAlreadyMoved);
        }
        if tile == self.board.robber_tile {
            return Err(GameError::RobberSameTile);
        }

        let player = self.active_player().id;
        let from = self.board.robber_tile;
        self.board.move_robber(tile);
        self.active_player_mut().robber_moved_this_turn = true;
        self.robber_pending = false;

        Ok(vec![GameEvent::RobberMoved {
            player,
            from,
            to: tile,
        }])
    }

    fn build_road(&mut self, edge: usize, free: bool) -> Result<Vec<GameEvent>, GameError> {
        if edge >= self.board.edges.len() {
            return Err(GameError::UnknownEdge(edge));
        }
        let player = self.active_player().id;
        if free {
            if self.active_player().free_roads == 0 {
                return Err(GameError::NoFreeRoads);
            }
        } else if !self.active_player().has_rolled {
            return Err(GameError::MustRollFirst);
        }
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if self.board.edges[edge].owner.is_some() {
            return Err(GameError::EdgeOccupied);
        }
        if !self.board.road_connects(edge, player) {
            return Err(GameError::NotConnected);
        }
        if !free && !self.active_player().resources.can_afford(&costs::road()) {
            return Err(GameError::CannotAfford("a road".to_string()));
        }

        if free {
            self.active_player_mut().free_roads -= 1;
        } else {
            self.active_player_mut().resources.subtract(&costs::road());
        }
        self.board.place_road(edge, player);

        let mut events = vec![GameEvent::RoadBuilt {
            player,
            edge,
            free,
        }];
        events.extend(self.check_longest_road());
        Ok(events)
    }

    fn build_town(&mut self, node: usize) -> Result<Vec<GameEvent>, GameError> {
        if node >= self.board.nodes.len() {
            return Err(GameError::UnknownNode(node));
        }
        if !self.active_player().has_rolled {
            return Err(GameError::MustRollFirst);
        }
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if self.board.nodes[node].building.is_some() {
            return Err(GameError::NodeOccupied);
        }
        if !self.board.nodes[node].can_build {
            return Err(GameError::NotBuildable);
        }
        if !self.board.satisfies_distance_rule(node) {
            return Err(GameError::DistanceRule);
        }
        if !self.active_player().resources.can_afford(&costs::town()) {
            return Err(GameError::CannotAfford("a town".to_string()));
        }

        let player = self.active_player().id;
        self.active_player_mut().resources.subtract(&costs::town());
        self.board.place_town(node, player);

        Ok(vec![GameEvent::TownBuilt { player, node }])
    }

    fn build_city(&mut self, node: usize) -> Result<Vec<GameEvent>, GameError> {
        if node >= self.board.nodes.len() {
            return Err(GameError::UnknownNode(node));
        }
        if !self.active_player().has_rolled {
            return Err(GameError::MustRollFirst);
        }
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        let player = self.active_player().id;
        let has_own_town = self.board.nodes[node]
            .building
            .is_some_and(|b| b.owner == player && b.kind == BuildingKind::Town);
        if !has_own_town {
            return Err(GameError::NoTownToUpgrade);
        }
        if !self.active_player().resources.can_afford(&costs::city()) {
            return Err(GameError::CannotAfford("a city".to_string()));
        }

        self.active_player_mut().resources.subtract(&costs::city());
        self.board.upgrade_to_city(node, player);

        Ok(vec![GameEvent::CityBuilt { player, node }])
    }

    fn harbor_trade(
        &mut self,
        give: Resource,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        if give == receive {
            return Err(GameError::SameResource);
        }
        if !self.active_player().has_rolled {
            return Err(GameError::MustRollFirst);
        }
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }

        let player = self.active_player().id;
        let ratio = self.board.best_trade_ratio(player, give);
        if self.active_player().resources.get(give) < ratio {
            return Err(GameError::CannotAfford(format!("{ratio}:1 trade")));
        }

        let hand = &mut self.active_player_mut().resources;
        hand.set(give, hand.get(give) - ratio);
        hand.add(receive, 1);
        self.active_player_mut().trades += 1;

        Ok(vec![GameEvent::HarborTraded {
            player,
            gave: give,
            gave_amount: ratio,
            received: receive,
        }])
    }

    fn buy_dev_card(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if !self.active_player().has_rolled {
            return Err(GameError::MustRollFirst);
        }
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if self.dev_deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        if !self
            .active_player()
            .resources
            .can_afford(&costs::dev_card())
        {
            return Err(GameError::CannotAfford("a development card".to_string()));
        }

        let card = self.dev_deck.pop().expect("checked non-empty");
        let player = self.active_player_mut();
        player.resources.subtract(&costs::dev_card());
        player.gain_dev_card(card);

        Ok(vec![GameEvent::DevCardBought { player: player.id }])
    }

    fn play_knight(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        // One robber movement per turn total, so a Knight after the
        // robber has moved could never meet its obligation.
        if self.active_player().robber_moved_this_turn {
            return Err(GameError::RobberAlreadyMoved);
        }
        if !self.active_player().has_playable_card(DevCardKind::Knight) {
            return Err(GameError::NoPlayableCard(DevCardKind::Knight));
        }

        let player = self.active_player_mut();
        player.take_playable_card(DevCardKind::Knight);
        player.knights_played += 1;
        let id = player.id;
        self.robber_pending = true;

        let mut events = vec![GameEvent::KnightPlayed { player: id }];
        events.extend(self.check_largest_army());
        Ok(events)
    }

    fn play_road_building(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if !self
            .active_player()
            .has_playable_card(DevCardKind::RoadBuilding)
        {
            return Err(GameError::NoPlayableCard(DevCardKind::RoadBuilding));
        }

        let player = self.active_player_mut();
        player.take_playable_card(DevCardKind::RoadBuilding);
        player.free_roads += 2;

        Ok(vec![GameEvent::RoadBuildingPlayed { player: player.id }])
    }

    fn play_year_of_plenty(
        &mut self,
        resource1: Resource,
        resource2: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if !self
            .active_player()
            .has_playable_card(DevCardKind::YearOfPlenty)
        {
            return Err(GameError::NoPlayableCard(DevCardKind::YearOfPlenty));
        }

        let player = self.active_player_mut();
        player.take_playable_card(DevCardKind::YearOfPlenty);
        player.resources.add(resource1, 1);
        player.resources.add(resource2, 1);

        Ok(vec![GameEvent::YearOfPlentyPlayed {
            player: player.id,
            resource1,
            resource2,
        }])
    }

    fn play_monopoly(&mut self, resource: Resource) -> Result<Vec<GameEvent>, GameError> {
        if self.robber_pending {
            return Err(GameError::RobberPending);
        }
        if !self
            .active_player()
            .has_playable_card(DevCardKind::Monopoly)
        {
            return Err(GameError::NoPlayableCard(DevCardKind::Monopoly));
        }

        let player = self.active_player().id;
        self.active_player_mut()
            .take_playable_card(DevCardKind::Monopoly);

        let mut taken = 0;
        for other in &mut self.players {
            if other.id != player {
                taken += other.resources.get(resource);
                other.resources.set(resource, 0);
            }
        }
        self.players[player as usize].resources.add(resource, taken);

        Ok(vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            taken,
        }])
    }

    fn end_turn(&mut self) -> Vec<GameEvent> {
        let player = self.active_player().id;
        self.active_player_mut().finish_turn();
        self.robber_pending = false;
        self.last_roll = None;

        self.current = (self.current + 1) % self.player_count();
        self.turn += 1;
        let next = self.players[self.current].id;

        vec![GameEvent::TurnEnded { player, next }]
    }

    // ==================== Awards & Victory ====================

    /// Pick the new award holder from `candidates` (already filtered to
    /// the threshold): unique maximum wins, ties keep the current holder,
    /// fresh ties crown no one.
    fn award_holder(
        candidates: &[(PlayerId, u32)],
        current_holder: Option<PlayerId>,
    ) -> Option<PlayerId> {
        let best = candidates.iter().map(|(_, v)| *v).max()?;
        let leaders: Vec<PlayerId> = candidates
            .iter()
            .filter(|(_, v)| *v == best)
            .map(|(p, _)| *p)
            .collect();

        if leaders.len() == 1 {
            Some(leaders[0])
        } else if current_holder.is_some_and(|h| leaders.contains(&h)) {
            current_holder
        } else {
            None
        }
    }

    fn check_longest_road(&mut self) -> Vec<GameEvent> {
        let candidates: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, self.board.longest_chain(p.id)))
            .filter(|(_, len)| *len >= MIN_LONGEST_ROAD)
            .collect();

        let current_holder = self.players.iter().find(|p| p.longest_road).map(|p| p.id);
        let new_holder = Self::award_holder(&candidates, current_holder);

        if new_holder == current_holder {
            return Vec::new();
        }

        for player in &mut self.players {
            player.longest_road = Some(player.id) == new_holder;
        }

        let length = candidates.iter().map(|(_, v)| *v).max().unwrap_or(0);
        vec![GameEvent::LongestRoadChanged {
            previous: current_holder,
            current: new_holder,
            length,
        }]
    }

    fn check_largest_army(&mut self) -> Vec<GameEvent> {
        let candidates: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, p.knights_played))
            .filter(|(_, n)| *n >= MIN_LARGEST_ARMY)
            .collect();

        let current_holder = self.players.iter().find(|p| p.largest_army).map(|p| p.id);
        let new_holder = Self::award_holder(&candidates, current_holder);

        if new_holder == current_holder {
            return Vec::new();
        }

        for player in &mut self.players {
            player.largest_army = Some(player.id) == new_holder;
        }

        let knights = candidates.iter().map(|(_, v)| *v).max().unwrap_or(0);
        vec![GameEvent::LargestArmyChanged {
            previous: current_holder,
            current: new_holder,
            knights,
        }]
    }

    /// Recompute derived VP for every player and detect a fresh winner.
    ///
    /// VP is never stored as truth: 1 per town, 2 per city, 2 per held
    /// award, 1 per victory-point card.
    fn refresh_victory_points(&mut self) -> Option<GameEvent> {
        for i in 0..self.players.len() {
            let id = self.players[i].id;
            let (towns, cities, _) = self.board.holdings(id);
            let player = &mut self.players[i];
            player.vp = towns
                + 2 * cities
                + if player.longest_road { 2 } else { 0 }
                + if player.largest_army { 2 } else { 0 }
                + player.vp_card_count();
        }

        if self.winner.is_none() {
            if let Some(winner) = self
                .players
                .iter()
                .find(|p| p.vp >= VICTORY_POINTS_TO_WIN)
            {
                self.winner = Some(winner.id);
                return Some(GameEvent::GameWon {
                    player: winner.id,
                    vp: winner.vp,
                });
            }
        }
        None
    }
}
