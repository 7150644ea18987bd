//! Approximate forward model for the search agents.
//!
//! [`rough_apply`] steps a *cloned* session cheaply: it pays costs
//! (saturating at zero), writes building and road ownership without
//! re-validating distance or connectivity (candidate generation already
//! filtered those), samples dice from the caller's RNG, and keeps VP
//! current incrementally. It never recomputes the longest-road or
//! largest-army awards; search heuristics work off raw counts.
//!
//! This is only ever used to score positions. The rules engine in
//! [`crate::game`] is the sole authority for real moves.

use crate::actions::Action;
use crate::game::GameSession;
use crate::player::{costs, DevCard, DevCardKind};
use rand::Rng;

/// Apply `action` for the active player without full validation.
pub fn rough_apply<R: Rng>(session: &mut GameSession, action: &Action, rng: &mut R) {
    let current = session.current;

    match action {
        Action::RollDice => {
            let total = rng.gen_range(1..=6) + rng.gen_range(1..=6);
            session.players[current].has_rolled = true;
            session.last_roll = Some(total);
            if total == 7 {
                session.robber_pending = true;
                return;
            }
            for (owner, resources) in session.board.production_for_roll(total) {
                for (resource, amount) in resources {
                    session.players[owner as usize].resources.add(resource, amount);
                }
            }
        }

        Action::MoveRobber { hex_id } => {
            if *hex_id < session.board.tiles.len() && *hex_id != session.board.robber_tile {
                session.board.move_robber(*hex_id);
            }
            session.players[current].robber_moved_this_turn = true;
            session.robber_pending = false;
        }

        Action::BuildRoad { edge_id, free } => {
            if *edge_id >= session.board.edges.len() {
                return;
            }
            let player = &mut session.players[current];
            if *free && player.free_roads > 0 {
                player.free_roads -= 1;
            } else {
                player.resources.subtract_saturating(&costs::road());
            }
            let id = player.id;
            session.board.place_road(*edge_id, id);
        }

        Action::BuildTown { node_id } => {
            if *node_id >= session.board.nodes.len() {
                return;
            }
            let player = &mut session.players[current];
            player.resources.subtract_saturating(&costs::town());
            player.vp += 1;
            let id = player.id;
            session.board.place_town(*node_id, id);
        }

        Action::BuildCity { node_id } => {
            if *node_id >= session.board.nodes.len() {
                return;
            }
            let player = &mut session.players[current];
            player.resources.subtract_saturating(&costs::city());
            player.vp += 1;
            let id = player.id;
            session.board.upgrade_to_city(*node_id, id);
        }

        Action::HarborTrade { give, receive } => {
            let ratio = session.board.best_trade_ratio(session.players[current].id, *give);
            let player = &mut session.players[current];
            let have = player.resources.get(*give);
            player.resources.set(*give, have.saturating_sub(ratio));
            player.resources.add(*receive, 1);
            player.trades += 1;
        }

        Action::BuyDevCard => {
            if let Some(kind) = session.dev_deck.pop() {
                let player = &mut session.players[current];
                player.resources.subtract_saturating(&costs::dev_card());
                player.dev_cards.push(DevCard {
                    kind,
                    can_play: false,
                });
                if kind == DevCardKind::VictoryPoint {
                    player.vp += 1;
                }
            }
        }

        Action::PlayKnight => {
            let player = &mut session.players[current];
            player.take_playable_card(DevCardKind::Knight);
            player.knights_played += 1;
            session.robber_pending = true;
        }

        Action::PlayRoadBuilding => {
            let player = &mut session.players[current];
            player.take_playable_card(DevCardKind::RoadBuilding);
            player.free_roads += 2;
        }

        Action::PlayYearOfPlenty {
            resource1,
            resource2,
        } => {
            let player = &mut session.players[current];
            player.take_playable_card(DevCardKind::YearOfPlenty);
            player.resources.add(*resource1, 1);
            player.resources.add(*resource2, 1);
        }

        Action::PlayMonopoly { resource } => {
            session.players[current].take_playable_card(DevCardKind::Monopoly);
            let mut taken = 0;
            for (i, other) in session.players.iter_mut().enumerate() {
                if i != current {
                    taken += other.resources.get(*resource);
                    other.resources.set(*resource, 0);
                }
            }
            session.players[current].resources.add(*resource, taken);
        }

        Action::EndTurn => {
            session.players[current].finish_turn();
            session.robber_pending = false;
            session.last_roll = None;
            session.current = (session.current + 1) % session.players.len();
            session.turn += 1;
        }
    }
}
