//! The agent driver: runs one full turn for a non-human seat.
//!
//! Loop shape: obtain a proposal (local search, or the provider with
//! feedback-augmented retries), sanitize it, override passing proposals
//! when a productive move exists, then apply through the engine, with
//! the ranked candidate list as fallback when a positional proposal turns
//! out illegal. The session lock is held per sub-action only; provider
//! I/O happens with the lock released.
//!
//! The driver never mutates state except through [`GameSession::apply`].

use crate::protocol::{agent_snapshot, AgentTurnRequest, ApiError, AppliedAction};
use crate::provider::{Proposal, ProviderClient, ProviderKind, ProviderRequest};
use crate::registry::GameEntry;
use hexagora_core::{
    legal_actions, Action, AgentKind, AgentProfile, AlgorithmKind, AlgorithmMode, GameError,
    GameEvent, GameSession, PlayerId,
};
use tracing::{debug, warn};

/// Budget of engine actions per agent turn
pub const MAX_ACTIONS_PER_TURN: usize = 8;
/// Provider retries per proposal, each with the previous error fed back
pub const MAX_LLM_ATTEMPTS: usize = 3;

const SYSTEM_PROMPT: &str = "You are playing a seat in a hex-board resource-trading strategy game. \
Each turn you roll dice, optionally build roads, towns, and cities, trade through harbors, buy or \
play development cards, and end your turn. Reply with exactly one JSON object of the form \
{\"action\": \"<name>\", \"payload\": {…}, \"reason\": \"<short text>\", \"confidence\": 0.0-1.0} \
and nothing else. Valid actions: rollDice, moveRobber {hexId}, buildRoad {edgeId}, \
buildTown {nodeId}, buildCity {nodeId}, harborTrade {giveResource, receiveResource}, buyDevCard, \
playKnight, playRoadBuilding, playYearOfPlenty {resource1, resource2}, playMonopoly {resource}, \
endTurn. Ids are indices into the arrays of the state snapshot. Prefer actions listed under \
\"legal\".";

/// Everything one `run_agent_turn` call did
#[derive(Debug, Default)]
pub struct TurnOutcome {
    pub actions: Vec<AppliedAction>,
    /// Trailing error after the last applied action, if any
    pub error: Option<String>,
    /// The sanitized proposal of a dry run (`autoApply: false`)
    pub proposal: Option<Action>,
}

/// Run one full turn for the current (non-human) seat.
pub async fn run_agent_turn(
    entry: &GameEntry,
    request: &AgentTurnRequest,
    client: &dyn ProviderClient,
) -> Result<TurnOutcome, ApiError> {
    let (seat, profile) = {
        let session = entry.session.lock().await;
        if session.is_finished() {
            return Ok(TurnOutcome::default());
        }
        let player = session.active_player();
        (player.id, player.agent.clone())
    };

    if profile.kind == AgentKind::Human {
        return Err(ApiError::BadRequest(
            "the current seat is human-controlled".to_string(),
        ));
    }

    let mut outcome = TurnOutcome::default();
    let mut feedback = request.notes.clone();

    for _ in 0..MAX_ACTIONS_PER_TURN {
        // Re-check under the lock, then work on a clone so reads can
        // interleave while we think.
        let snapshot = {
            let session = entry.session.lock().await;
            if session.winner.is_some() || session.active_player().id != seat {
                return Ok(outcome);
            }
            session.clone()
        };

        let (mut action, mut reason) = match profile.kind {
            AgentKind::Algorithm => {
                let mut policy = profile.algorithm.build(&profile.params);
                (policy.decide(&snapshot, seat), None)
            }
            _ => {
                match llm_proposal(client, entry, &profile, request, &snapshot, seat, feedback.take())
                    .await
                {
                    Ok(proposal) => (proposal.action, proposal.reason),
                    Err(detail) => {
                        // Retries exhausted: synthesize a pass and let
                        // the override below find something productive.
                        (Action::EndTurn, Some(detail))
                    }
                }
            }
        };

        // Strategic override: a passing proposal while productive moves
        // exist gets replaced, so a stalling model cannot idle the seat.
        let already_rolled = snapshot.players[seat as usize].has_rolled;
        if action.is_passing() || (action == Action::RollDice && already_rolled) {
            let override_kind = if profile.algorithm_mode == AlgorithmMode::LlmPlusAlgo
                && profile.algorithm != AlgorithmKind::None
            {
                profile.algorithm
            } else {
                AlgorithmKind::Heuristic
            };
            let pick = override_kind.build(&profile.params).decide(&snapshot, seat);
            if !pick.is_passing() && pick != action {
                debug!(seat, proposed = action.kind(), picked = pick.kind(), "override");
                reason = Some("passing proposal overridden by local strategy".to_string());
                action = pick;
            }
        }

        if request.auto_apply == Some(false) {
            outcome.proposal = Some(action);
            return Ok(outcome);
        }

        let applied = {
            let mut session = entry.session.lock().await;
            safe_apply(&mut session, seat, action, reason)
        };

        match applied {
            Ok(applied) => {
                let turn_over = applied.action == Action::EndTurn
                    || applied
                        .events
                        .iter()
                        .any(|e| matches!(e, GameEvent::TurnEnded { .. } | GameEvent::GameWon { .. }));
                outcome.actions.push(applied);
                outcome.error = None;
                if turn_over {
                    return Ok(outcome);
                }
            }
            Err(err) => {
                let detail = format!("could not apply a proposal: {err}");
                warn!(seat, %err, "agent proposal failed all fallbacks");
                feedback = Some(detail.clone());
                outcome.error = Some(detail);
            }
        }
    }

    Ok(outcome)
}

/// Apply, falling back to the ranked candidate list for positional
/// actions and to a single `endTurn` for everything else.
fn safe_apply(
    session: &mut GameSession,
    seat: PlayerId,
    action: Action,
    reason: Option<String>,
) -> Result<AppliedAction, GameError> {
    let first = match session.apply(seat, &action) {
        Ok(events) => {
            return Ok(AppliedAction {
                action,
                reason,
                events,
            })
        }
        Err(e) => e,
    };

    let legal = legal_actions(session, seat);
    let candidates: Vec<Action> = match &action {
        Action::BuildTown { .. } => legal
            .build_town
            .iter()
            .map(|&node_id| Action::BuildTown { node_id })
            .collect(),
        Action::BuildCity { .. } => legal
            .build_city
            .iter()
            .map(|&node_id| Action::BuildCity { node_id })
            .collect(),
        Action::BuildRoad { .. } => legal
            .build_road
            .iter()
            .map(|&edge_id| Action::BuildRoad {
                edge_id,
                free: legal.free_road,
            })
            .collect(),
        Action::MoveRobber { .. } => legal
            .move_robber
            .iter()
            .map(|&hex_id| Action::MoveRobber { hex_id })
            .collect(),
        _ => {
            // Non-positional: one shot at ending the turn instead
            return match session.apply(seat, &Action::EndTurn) {
                Ok(events) => Ok(AppliedAction {
                    action: Action::EndTurn,
                    reason: Some(format!("fell back to endTurn after: {first}")),
                    events,
                }),
                Err(_) => Err(first),
            };
        }
    };

    let mut last = first;
    for candidate in candidates {
        match session.apply(seat, &candidate) {
            Ok(events) => {
                return Ok(AppliedAction {
                    action: candidate,
                    reason: Some(format!("ranked fallback after: {last}")),
                    events,
                })
            }
            Err(e) => last = e,
        }
    }
    Err(last)
}

async fn llm_proposal(
    client: &dyn ProviderClient,
    entry: &GameEntry,
    profile: &AgentProfile,
    request: &AgentTurnRequest,
    snapshot: &GameSession,
    seat: PlayerId,
    notes: Option<String>,
) -> Result<Proposal, String> {
    let provider = request
        .provider
        .or_else(|| profile.provider.as_deref().and_then(ProviderKind::from_name));
    let Some(provider) = provider else {
        return Err("no provider configured for this seat".to_string());
    };
    let Some(model) = request.model.clone().or_else(|| profile.model.clone()) else {
        return Err("no model configured for this seat".to_string());
    };

    let api_key = request
        .api_key
        .clone()
        .or_else(|| entry.seat_keys.get(seat as usize).cloned().flatten());
    let endpoint = request
        .api_endpoint
        .clone()
        .or_else(|| profile.api_endpoint.clone());

    let snapshot_json =
        serde_json::to_string(&agent_snapshot(snapshot, seat)).unwrap_or_else(|_| "{}".to_string());

    let mut extra = notes;
    let mut last_error = String::new();
    for attempt in 1..=MAX_LLM_ATTEMPTS {
        let user = match &extra {
            Some(text) => format!("{text}\n\nCurrent state:\n{snapshot_json}"),
            None => format!("Current state:\n{snapshot_json}"),
        };
        let provider_request = ProviderRequest {
            provider,
            model: model.clone(),
            api_key: api_key.clone(),
            endpoint: endpoint.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user,
        };

        match client.request_action(&provider_request).await {
            Ok(proposal) => return Ok(proposal),
            Err(e) => {
                warn!(seat, attempt, error = %e, "provider proposal attempt failed");
                last_error = e.to_string();
                extra = Some(format!(
                    "Your previous reply could not be used: {last_error}. \
                     Reply with exactly one JSON object."
                ));
            }
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{parse_proposal, ProviderError, VerifyOutcome};
    use crate::registry::Registry;
    use async_trait::async_trait;
    use hexagora_core::{AgentProfile, ResourceHand};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that replays one canned completion
    struct StubProvider {
        reply: String,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProviderClient for StubProvider {
        async fn verify(
            &self,
            _provider: ProviderKind,
            _api_key: Option<&str>,
            _endpoint: Option<&str>,
        ) -> VerifyOutcome {
            VerifyOutcome {
                ok: true,
                status: 200,
                message: "stub".to_string(),
            }
        }

        async fn request_action(
            &self,
            _request: &ProviderRequest,
        ) -> Result<Proposal, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            parse_proposal(&self.reply)
        }
    }

    fn algorithm_profile() -> AgentProfile {
        AgentProfile {
            kind: AgentKind::Algorithm,
            algorithm_mode: AlgorithmMode::AlgoOnly,
            algorithm: AlgorithmKind::Heuristic,
            ..Default::default()
        }
    }

    fn llm_profile() -> AgentProfile {
        AgentProfile {
            kind: AgentKind::Llm,
            provider: Some("openai".to_string()),
            model: Some("test-model".to_string()),
            algorithm_mode: AlgorithmMode::LlmOnly,
            ..Default::default()
        }
    }

    fn make_entry(seat0: AgentProfile, seed: u64) -> std::sync::Arc<GameEntry> {
        let registry = Registry::new();
        let session = GameSession::new(
            vec![
                ("Agent".to_string(), seat0),
                ("Opponent".to_string(), AgentProfile::default()),
            ],
            Some(seed),
        );
        registry.create(session, vec![Some("sk-test".to_string()), None])
    }

    #[tokio::test]
    async fn test_algorithm_turn_rolls_builds_and_ends() {
        let entry = make_entry(algorithm_profile(), 101);
        {
            let mut session = entry.session.lock().await;
            // Exactly a city upgrade in hand
            session.players[0].resources = ResourceHand::with_amounts(0, 0, 2, 0, 3);
        }

        let stub = StubProvider::new("{}");
        let outcome = run_agent_turn(&entry, &AgentTurnRequest::default(), &stub)
            .await
            .unwrap();

        assert!(outcome.error.is_none());
        assert_eq!(outcome.actions[0].action, Action::RollDice);
        assert!(outcome
            .actions
            .iter()
            .any(|a| matches!(a.action, Action::BuildCity { .. })));
        assert_eq!(
            outcome.actions.last().unwrap().action,
            Action::EndTurn,
            "an agent turn finishes by passing"
        );
        // Algorithm seats never consult the provider
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);

        let session = entry.session.lock().await;
        assert_eq!(session.current, 1, "control advances by exactly one seat");
    }

    #[tokio::test]
    async fn test_out_of_range_proposal_falls_back_to_ranked_candidates() {
        let entry = make_entry(llm_profile(), 102);
        let legal_towns = {
            let mut session = entry.session.lock().await;
            session.resolve_roll(2, 3).unwrap();
            session.players[0].resources = ResourceHand::with_amounts(1, 1, 1, 1, 0);
            legal_actions(&session, 0).build_town
        };
        assert!(!legal_towns.is_empty(), "fixture needs a legal town spot");

        let stub = StubProvider::new(r#"{"action": "buildTown", "payload": {"nodeId": 9999}}"#);
        let outcome = run_agent_turn(&entry, &AgentTurnRequest::default(), &stub)
            .await
            .unwrap();

        let built = outcome
            .actions
            .iter()
            .find_map(|a| match a.action {
                Action::BuildTown { node_id } => Some(node_id),
                _ => None,
            })
            .expect("the fallback should have built a town");
        assert!(
            legal_towns.contains(&built),
            "fallback must pick one of the ranked legal spots"
        );
    }

    #[tokio::test]
    async fn test_stalling_proposal_is_overridden() {
        let entry = make_entry(llm_profile(), 103);
        {
            let mut session = entry.session.lock().await;
            session.resolve_roll(2, 3).unwrap();
            session.players[0].resources = ResourceHand::with_amounts(0, 0, 2, 0, 3);
        }

        let stub = StubProvider::new(r#"{"action": "endTurn", "payload": {}}"#);
        let outcome = run_agent_turn(&entry, &AgentTurnRequest::default(), &stub)
            .await
            .unwrap();

        assert!(
            outcome
                .actions
                .iter()
                .any(|a| matches!(a.action, Action::BuildCity { .. })),
            "a passing proposal with an affordable city must be overridden"
        );
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_heuristic() {
        let entry = make_entry(llm_profile(), 104);

        // Unparseable every time: retries burn out, the synthesized pass
        // goes through the override, and the turn still progresses.
        let stub = StubProvider::new("sorry, I cannot help with that");
        let outcome = run_agent_turn(&entry, &AgentTurnRequest::default(), &stub)
            .await
            .unwrap();

        assert_eq!(outcome.actions[0].action, Action::RollDice);
        assert_eq!(outcome.actions.last().unwrap().action, Action::EndTurn);
        // Each proposal burned the full retry budget
        assert!(stub.calls.load(Ordering::SeqCst) >= MAX_LLM_ATTEMPTS);

        let session = entry.session.lock().await;
        assert_eq!(session.current, 1);
    }

    #[tokio::test]
    async fn test_human_seat_is_refused() {
        let entry = make_entry(AgentProfile::default(), 105);
        let stub = StubProvider::new("{}");
        let result = run_agent_turn(&entry, &AgentTurnRequest::default(), &stub).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_dry_run_applies_nothing() {
        let entry = make_entry(llm_profile(), 106);
        let turn_before = {
            let session = entry.session.lock().await;
            session.turn
        };

        let stub = StubProvider::new(r#"{"action": "rollDice", "payload": {}}"#);
        let request = AgentTurnRequest {
            auto_apply: Some(false),
            ..Default::default()
        };
        let outcome = run_agent_turn(&entry, &request, &stub).await.unwrap();

        assert_eq!(outcome.proposal, Some(Action::RollDice));
        assert!(outcome.actions.is_empty());

        let session = entry.session.lock().await;
        assert_eq!(session.turn, turn_before);
        assert!(!session.players[0].has_rolled);
    }
}
