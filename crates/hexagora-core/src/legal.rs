//! Legal-action enumeration.
//!
//! [`legal_actions`] produces, for one player, every action that would
//! currently apply without error: the source of truth for the agent
//! driver's fallbacks and the UI's clickability hints. Candidate lists
//! are ranked best-first with the shared evaluation scores, because the
//! driver walks them in order when a proposal turns out illegal.

use crate::actions::Action;
use crate::board::{EdgeId, NodeId, PlayerId, TileId};
use crate::eval::{
    edge_expansion_score, node_production_score, robber_target_score, ScoreMode,
};
use crate::game::GameSession;
use crate::player::{costs, Resource};
use serde::Serialize;

/// One affordable (give, receive) harbor trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePair {
    pub give: Resource,
    pub receive: Resource,
}

/// Everything a player may legally do right now, keyed by action type.
/// Build and robber candidates are sorted by descending score.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalActions {
    pub roll_dice: bool,
    pub end_turn: bool,
    pub move_robber: Vec<TileId>,
    pub build_town: Vec<NodeId>,
    pub build_city: Vec<NodeId>,
    pub build_road: Vec<EdgeId>,
    /// Road candidates consume a Road Building grant instead of resources
    pub free_road: bool,
    pub buy_dev_card: bool,
    pub harbor_trade: Vec<TradePair>,
}

impl LegalActions {
    /// Flatten into concrete actions, roll first, pass last.
    pub fn to_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.roll_dice {
            actions.push(Action::RollDice);
        }
        for &hex_id in &self.move_robber {
            actions.push(Action::MoveRobber { hex_id });
        }
        for &node_id in &self.build_city {
            actions.push(Action::BuildCity { node_id });
        }
        for &node_id in &self.build_town {
            actions.push(Action::BuildTown { node_id });
        }
        for &edge_id in &self.build_road {
            actions.push(Action::BuildRoad {
                edge_id,
                free: self.free_road,
            });
        }
        if self.buy_dev_card {
            actions.push(Action::BuyDevCard);
        }
        for pair in &self.harbor_trade {
            actions.push(Action::HarborTrade {
                give: pair.give,
                receive: pair.receive,
            });
        }
        if self.end_turn {
            actions.push(Action::EndTurn);
        }
        actions
    }

    /// Whether anything beyond rolling and passing is on the table
    pub fn has_progress(&self) -> bool {
        !self.move_robber.is_empty()
            || !self.build_town.is_empty()
            || !self.build_city.is_empty()
            || !self.build_road.is_empty()
            || self.buy_dev_card
            || !self.harbor_trade.is_empty()
    }
}

fn sort_desc<T: Copy>(items: &mut [(T, f64)]) {
    items.sort_by(|a, b| b.1.total_cmp(&a.1));
}

/// Enumerate the legal actions for `player`.
///
/// Gating mirrors the engine exactly: before the roll only `rollDice`
/// and `endTurn` exist; while the robber obligation is open only
/// `moveRobber` and `endTurn`; in the main phase everything placeable
/// and affordable, with `moveRobber` offered until the one movement of
/// the turn is used up.
pub fn legal_actions(session: &GameSession, player: PlayerId) -> LegalActions {
    let mut legal = LegalActions::default();
    if session.winner.is_some() || session.current != player as usize {
        return legal;
    }

    let p = &session.players[player as usize];
    let board = &session.board;
    legal.end_turn = true;

    if !p.has_rolled {
        legal.roll_dice = true;
        return legal;
    }

    let robber_targets = |legal: &mut LegalActions| {
        let mut scored: Vec<(TileId, f64)> = board
            .tiles
            .iter()
            .filter(|t| t.id != board.robber_tile)
            .map(|t| (t.id, robber_target_score(board, t.id, player)))
            .collect();
        sort_desc(&mut scored);
        legal.move_robber = scored.into_iter().map(|(id, _)| id).collect();
    };

    if session.robber_pending {
        robber_targets(&mut legal);
        return legal;
    }
    if !p.robber_moved_this_turn {
        robber_targets(&mut legal);
    }

    if p.resources.can_afford(&costs::town()) {
        let mut scored: Vec<(NodeId, f64)> = board
            .nodes
            .iter()
            .filter(|n| {
                n.building.is_none()
                    && n.can_build
                    && board.satisfies_distance_rule(n.id)
            })
            .map(|n| (n.id, node_production_score(board, n.id, ScoreMode::Town)))
            .collect();
        sort_desc(&mut scored);
        legal.build_town = scored.into_iter().map(|(id, _)| id).collect();
    }

    if p.resources.can_afford(&costs::city()) {
        let mut scored: Vec<(NodeId, f64)> = board
            .nodes
            .iter()
            .filter(|n| {
                n.building.is_some_and(|b| {
                    b.owner == player && b.kind == crate::board::BuildingKind::Town
                })
            })
            .map(|n| (n.id, node_production_score(board, n.id, ScoreMode::City)))
            .collect();
        sort_desc(&mut scored);
        legal.build_city = scored.into_iter().map(|(id, _)| id).collect();
    }

    legal.free_road = p.free_roads > 0;
    if legal.free_road || p.resources.can_afford(&costs::road()) {
        let mut scored: Vec<(EdgeId, f64)> = board
            .edges
            .iter()
            .filter(|e| e.owner.is_none() && board.road_connects(e.id, player))
            .map(|e| (e.id, edge_expansion_score(board, e.id)))
            .collect();
        sort_desc(&mut scored);
        legal.build_road = scored.into_iter().map(|(id, _)| id).collect();
    }

    legal.buy_dev_card =
        !session.dev_deck.is_empty() && p.resources.can_afford(&costs::dev_card());

    for give in Resource::ALL {
        let ratio = board.best_trade_ratio(player, give);
        if p.resources.get(give) < ratio {
            continue;
        }
        for receive in Resource::ALL {
            if receive != give {
                legal.harbor_trade.push(TradePair { give, receive });
            }
        }
    }

    legal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{AgentProfile, ResourceHand};

    fn session(seed: u64) -> GameSession {
        GameSession::new(
            vec![
                ("A".to_string(), AgentProfile::default()),
                ("B".to_string(), AgentProfile::default()),
            ],
            Some(seed),
        )
    }

    #[test]
    fn test_pre_roll_only_roll_and_end() {
        let session = session(1);
        let legal = legal_actions(&session, 0);

        assert!(legal.roll_dice);
        assert!(legal.end_turn);
        assert!(!legal.has_progress());
    }

    #[test]
    fn test_other_seat_gets_nothing() {
        let session = session(2);
        let legal = legal_actions(&session, 1);
        assert!(!legal.roll_dice);
        assert!(!legal.end_turn);
        assert!(!legal.has_progress());
    }

    #[test]
    fn test_robber_obligation_narrows_choices() {
        let mut session = session(3);
        session.resolve_roll(3, 4).unwrap();

        let legal = legal_actions(&session, 0);
        assert!(!legal.roll_dice);
        assert!(legal.end_turn);
        assert!(!legal.move_robber.is_empty());
        assert!(legal.build_town.is_empty());
        assert!(legal.build_road.is_empty());
        assert!(!legal.buy_dev_card);

        // Never offers the tile the robber already sits on
        assert!(!legal.move_robber.contains(&session.board.robber_tile));
    }

    #[test]
    fn test_affordability_gates_builds() {
        let mut session = session(4);
        session.resolve_roll(2, 3).unwrap();

        session.players[0].resources = ResourceHand::new();
        let legal = legal_actions(&session, 0);
        assert!(legal.build_town.is_empty());
        assert!(legal.build_city.is_empty());
        assert!(legal.build_road.is_empty());
        assert!(!legal.buy_dev_card);
        assert!(legal.harbor_trade.is_empty());

        session.players[0].resources = ResourceHand::with_amounts(9, 9, 9, 9, 9);
        let legal = legal_actions(&session, 0);
        assert!(!legal.build_road.is_empty());
        // Two starting towns to upgrade
        assert_eq!(legal.build_city.len(), 2);
        assert!(legal.buy_dev_card);
        // Every give has four receive partners at 4:1 or better
        assert_eq!(legal.harbor_trade.len(), 20);
    }

    #[test]
    fn test_everything_listed_applies_cleanly() {
        // Soundness: each enumerated action must succeed from the state
        // that produced it.
        for seed in 0..5 {
            let mut session = session(seed);
            session.resolve_roll(2, 4).unwrap();
            session.players[0].resources = ResourceHand::with_amounts(4, 4, 4, 4, 4);

            let legal = legal_actions(&session, 0);
            for action in legal.to_actions() {
                let mut fork = session.clone();
                fork.apply(0, &action)
                    .unwrap_or_else(|e| panic!("legal action {action:?} failed: {e}"));
            }
        }
    }

    #[test]
    fn test_candidates_are_ranked() {
        let mut session = session(6);
        session.resolve_roll(2, 3).unwrap();
        session.players[0].resources = ResourceHand::with_amounts(9, 9, 9, 9, 9);

        let legal = legal_actions(&session, 0);
        let scores: Vec<f64> = legal
            .build_town
            .iter()
            .map(|&n| node_production_score(&session.board, n, ScoreMode::Town))
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "town candidates must be sorted");
        }
    }

    #[test]
    fn test_finished_game_offers_nothing() {
        let mut session = session(7);
        session.winner = Some(1);
        let legal = legal_actions(&session, 0);
        assert!(!legal.end_turn && !legal.roll_dice && !legal.has_progress());
    }
}
