//! Search agents: heuristic, minimax, and MCTS.
//!
//! All three implement [`Policy`], "produce one action for this state",
//! over the legal-action generator and the rough forward model. LLM-backed
//! seats live in the server crate and compose with these through the same
//! capability.

use crate::actions::Action;
use crate::board::PlayerId;
use crate::eval::evaluate_state;
use crate::game::GameSession;
use crate::legal::legal_actions;
use crate::sim::rough_apply;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// UCB1 exploration constant
const UCB_EXPLORATION: f64 = 1.35;
/// MCTS iteration budget
const DEFAULT_ITERATIONS: u32 = 220;
/// Rollout length in actions
const DEFAULT_ROLLOUT_DEPTH: u32 = 4;
/// Alpha-beta search depth
const DEFAULT_MINIMAX_DEPTH: u32 = 2;

/// Which local search drives a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    #[default]
    None,
    Heuristic,
    Minimax,
    Mcts,
}

/// Free-form tuning knobs from the seat config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub iterations: Option<u32>,
    pub depth: Option<u32>,
    pub rollout_depth: Option<u32>,
}

impl AlgorithmKind {
    /// Instantiate the configured policy. `None` falls back to the
    /// heuristic, which is also the driver's override policy.
    pub fn build(self, params: &SearchParams) -> Box<dyn Policy> {
        match self {
            AlgorithmKind::None | AlgorithmKind::Heuristic => Box::new(HeuristicPolicy),
            AlgorithmKind::Minimax => Box::new(MinimaxPolicy::new(
                params.depth.unwrap_or(DEFAULT_MINIMAX_DEPTH),
            )),
            AlgorithmKind::Mcts => Box::new(MctsPolicy::new(
                params.iterations.unwrap_or(DEFAULT_ITERATIONS),
                params.rollout_depth.unwrap_or(DEFAULT_ROLLOUT_DEPTH),
            )),
        }
    }
}

/// Produce one action for the given state
pub trait Policy: Send {
    fn decide(&mut self, session: &GameSession, player: PlayerId) -> Action;
}

// ==================== Heuristic ====================

/// Greedy priority cascade: roll, satisfy the robber, then the best
/// affordable city, town, road, a development card, and finally pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPolicy;

impl Policy for HeuristicPolicy {
    fn decide(&mut self, session: &GameSession, player: PlayerId) -> Action {
        let legal = legal_actions(session, player);

        if legal.roll_dice {
            return Action::RollDice;
        }
        if session.robber_pending {
            if let Some(&hex_id) = legal.move_robber.first() {
                return Action::MoveRobber { hex_id };
            }
        }
        if let Some(&node_id) = legal.build_city.first() {
            return Action::BuildCity { node_id };
        }
        if let Some(&node_id) = legal.build_town.first() {
            return Action::BuildTown { node_id };
        }
        if let Some(&edge_id) = legal.build_road.first() {
            return Action::BuildRoad {
                edge_id,
                free: legal.free_road,
            };
        }
        if legal.buy_dev_card {
            return Action::BuyDevCard;
        }
        Action::EndTurn
    }
}

// ==================== Minimax ====================

/// Depth-limited alpha-beta over the legal candidates, stepping the rough
/// forward model. Single-agent approximation: the root seat maximizes,
/// every other seat minimizes.
pub struct MinimaxPolicy {
    pub depth: u32,
    rng: StdRng,
}

impl MinimaxPolicy {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(depth: u32, seed: u64) -> Self {
        Self {
            depth,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn search(
        &mut self,
        session: &GameSession,
        depth: u32,
        mut alpha: f64,
        mut beta: f64,
        root: PlayerId,
    ) -> f64 {
        if depth == 0 || session.players.iter().any(|p| p.vp >= 10) {
            return evaluate_state(session, root);
        }

        let mover = session.players[session.current].id;
        let candidates = legal_actions(session, mover).to_actions();
        if candidates.is_empty() {
            return evaluate_state(session, root);
        }

        let maximizing = mover == root;
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for action in candidates {
            let mut fork = session.clone();
            rough_apply(&mut fork, &action, &mut self.rng);
            let value = self.search(&fork, depth - 1, alpha, beta, root);

            if maximizing {
                best = best.max(value);
                alpha = alpha.max(best);
            } else {
                best = best.min(value);
                beta = beta.min(best);
            }
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

impl Policy for MinimaxPolicy {
    fn decide(&mut self, session: &GameSession, player: PlayerId) -> Action {
        let candidates = legal_actions(session, player).to_actions();
        if candidates.is_empty() {
            return Action::EndTurn;
        }

        let mut best = candidates[0].clone();
        let mut best_value = f64::NEG_INFINITY;
        let mut alpha = f64::NEG_INFINITY;

        for action in &candidates {
            let mut fork = session.clone();
            rough_apply(&mut fork, action, &mut self.rng);
            let value =
                self.search(&fork, self.depth.saturating_sub(1), alpha, f64::INFINITY, player);
            if value > best_value {
                best_value = value;
                best = action.clone();
            }
            alpha = alpha.max(value);
        }
        best
    }
}

// ==================== MCTS ====================

/// Root statistics from one MCTS run, mainly for inspection and tests
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best: Action,
    pub root_visits: Vec<(Action, u32)>,
}

struct TreeNode {
    parent: Option<usize>,
    action: Option<Action>,
    state: GameSession,
    untried: Vec<Action>,
    children: Vec<usize>,
    visits: u32,
    value_sum: f64,
}

/// UCB1 Monte-Carlo tree search with heuristic rollouts.
///
/// The tree is an arena of nodes addressed by index; no owning pointers.
/// The move played is the root child with the most visits; an empty root
/// falls back to the heuristic policy.
pub struct MctsPolicy {
    pub iterations: u32,
    pub rollout_depth: u32,
    rng: StdRng,
}

impl MctsPolicy {
    pub fn new(iterations: u32, rollout_depth: u32) -> Self {
        Self {
            iterations,
            rollout_depth,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(iterations: u32, rollout_depth: u32, seed: u64) -> Self {
        Self {
            iterations,
            rollout_depth,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run the full search and expose the root statistics.
    pub fn search(&mut self, session: &GameSession, player: PlayerId) -> SearchReport {
        let root_candidates = legal_actions(session, player).to_actions();
        if root_candidates.is_empty() {
            return SearchReport {
                best: HeuristicPolicy.decide(session, player),
                root_visits: Vec::new(),
            };
        }

        let mut arena = vec![TreeNode {
            parent: None,
            action: None,
            state: session.clone(),
            untried: root_candidates,
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
        }];

        for _ in 0..self.iterations {
            // Selection: descend fully-expanded nodes by UCB1
            let mut idx = 0;
            while arena[idx].untried.is_empty() && !arena[idx].children.is_empty() {
                idx = Self::best_ucb_child(&arena, idx);
            }

            // Expansion: attach one untried action
            if let Some(action) = arena[idx].untried.pop() {
                let mut state = arena[idx].state.clone();
                rough_apply(&mut state, &action, &mut self.rng);
                let untried = {
                    let mover = state.players[state.current].id;
                    legal_actions(&state, mover).to_actions()
                };
                arena.push(TreeNode {
                    parent: Some(idx),
                    action: Some(action),
                    state,
                    untried,
                    children: Vec::new(),
                    visits: 0,
                    value_sum: 0.0,
                });
                let child = arena.len() - 1;
                arena[idx].children.push(child);
                idx = child;
            }

            // Simulation: heuristic playout from the new leaf
            let value = self.rollout(&arena[idx].state, player);

            // Backpropagation
            let mut cursor = Some(idx);
            while let Some(i) = cursor {
                arena[i].visits += 1;
                arena[i].value_sum += value;
                cursor = arena[i].parent;
            }
        }

        let root_visits: Vec<(Action, u32)> = arena[0]
            .children
            .iter()
            .map(|&c| (arena[c].action.clone().expect("child has action"), arena[c].visits))
            .collect();

        // Robust child: most-visited
        let best = root_visits
            .iter()
            .max_by_key(|(_, visits)| *visits)
            .map(|(action, _)| action.clone());

        match best {
            Some(best) => SearchReport { best, root_visits },
            None => SearchReport {
                best: HeuristicPolicy.decide(session, player),
                root_visits,
            },
        }
    }

    fn best_ucb_child(arena: &[TreeNode], idx: usize) -> usize {
        let parent_visits = arena[idx].visits.max(1) as f64;
        arena[idx]
            .children
            .iter()
            .copied()
            .max_by(|&a, &b| {
                Self::ucb(arena, a, parent_visits).total_cmp(&Self::ucb(arena, b, parent_visits))
            })
            .expect("selection only descends into expanded nodes")
    }

    fn ucb(arena: &[TreeNode], child: usize, parent_visits: f64) -> f64 {
        let node = &arena[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let exploit = node.value_sum / node.visits as f64;
        let explore = UCB_EXPLORATION * (parent_visits.ln() / node.visits as f64).sqrt();
        exploit + explore
    }

    fn rollout(&mut self, state: &GameSession, root: PlayerId) -> f64 {
        let mut sim = state.clone();
        for _ in 0..self.rollout_depth {
            if sim.players.iter().any(|p| p.vp >= 10) {
                break;
            }
            let mover = sim.players[sim.current].id;
            let action = HeuristicPolicy.decide(&sim, mover);
            let passing = action == Action::EndTurn;
            rough_apply(&mut sim, &action, &mut self.rng);
            if passing {
                break;
            }
        }
        evaluate_state(&sim, root)
    }
}

impl Policy for MctsPolicy {
    fn decide(&mut self, session: &GameSession, player: PlayerId) -> Action {
        self.search(session, player).best
    }
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
    fn test_heuristic_rolls_first() {
        let session = session(1);
        assert_eq!(HeuristicPolicy.decide(&session, 0), Action::RollDice);
    }

    #[test]
    fn test_heuristic_satisfies_robber_obligation() {
        let mut session = session(2);
        session.resolve_roll(3, 4).unwrap();

        let action = HeuristicPolicy.decide(&session, 0);
        assert!(matches!(action, Action::MoveRobber { .. }));
    }

    #[test]
    fn test_heuristic_prefers_city_over_town() {
        let mut session = session(3);
        session.resolve_roll(2, 3).unwrap();
        session.players[0].resources = ResourceHand::with_amounts(9, 9, 9, 9, 9);

        let action = HeuristicPolicy.decide(&session, 0);
        assert!(matches!(action, Action::BuildCity { .. }));
    }

    #[test]
    fn test_heuristic_passes_when_broke() {
        let mut session = session(4);
        session.resolve_roll(2, 3).unwrap();
        session.players[0].resources = ResourceHand::new();
        session.players[0].robber_moved_this_turn = true;

        assert_eq!(HeuristicPolicy.decide(&session, 0), Action::EndTurn);
    }

    #[test]
    fn test_minimax_returns_applicable_action() {
        let mut session = session(5);
        session.resolve_roll(2, 4).unwrap();
        session.players[0].resources = ResourceHand::with_amounts(3, 3, 3, 3, 3);

        let mut policy = MinimaxPolicy::with_seed(2, 42);
        let action = policy.decide(&session, 0);
        session.apply(0, &action).expect("minimax picks legal actions");
    }

    #[test]
    fn test_mcts_returns_applicable_action() {
        let mut session = session(6);
        session.resolve_roll(2, 4).unwrap();
        session.players[0].resources = ResourceHand::with_amounts(3, 3, 3, 3, 3);

        let mut policy = MctsPolicy::with_seed(64, 4, 42);
        let action = policy.decide(&session, 0);
        session.apply(0, &action).expect("mcts picks legal actions");
    }

    #[test]
    fn test_mcts_seeded_runs_are_identical() {
        let mut session = session(7);
        session.resolve_roll(2, 4).unwrap();
        session.players[0].resources = ResourceHand::with_amounts(2, 2, 2, 2, 2);

        let report_a = MctsPolicy::with_seed(80, 4, 99).search(&session, 0);
        let report_b = MctsPolicy::with_seed(80, 4, 99).search(&session, 0);

        assert_eq!(report_a.best, report_b.best);
        assert_eq!(report_a.root_visits, report_b.root_visits);
    }

    #[test]
    fn test_build_policy_respects_params() {
        let params = SearchParams {
            iterations: Some(10),
            depth: Some(1),
            rollout_depth: Some(2),
        };
        // Smoke-check every kind decides something legal
        for kind in [
            AlgorithmKind::None,
            AlgorithmKind::Heuristic,
            AlgorithmKind::Minimax,
            AlgorithmKind::Mcts,
        ] {
            let session = session(8);
            let mut policy = kind.build(&params);
            let action = policy.decide(&session, 0);
            let mut fork = session.clone();
            fork.apply(0, &action)
                .unwrap_or_else(|e| panic!("{kind:?} picked illegal action {action:?}: {e}"));
        }
    }
}
