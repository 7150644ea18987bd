//! HTTP surface: routes, handlers, shared state.
//!
//! The registry serializes mutations per game; handlers lock, mutate
//! through the engine, project, and respond. Engine failures map to 400
//! with a taxonomy kind, unknown games to 404, provider trouble to 5xx.

use crate::driver::run_agent_turn;
use crate::protocol::{
    game_view, ActionResponse, AgentTurnRequest, AgentTurnResponse, ApiError, CreateGameRequest,
    CreateGameResponse, DeleteResponse, SeatConfig, SeatKind, VerifyRequest,
};
use crate::provider::{HttpProviderClient, ProviderClient};
use crate::registry::Registry;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use hexagora_core::{Action, AlgorithmKind, AlgorithmMode, GameSession};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Shared application state: the game registry and the provider client
pub struct AppState {
    pub registry: Registry,
    pub provider: Arc<dyn ProviderClient>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_provider(Arc::new(HttpProviderClient::new()))
    }

    pub fn with_provider(provider: Arc<dyn ProviderClient>) -> Self {
        Self {
            registry: Registry::new(),
            provider,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Mount every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/games", web::post().to(create_game))
        .route("/games", web::delete().to(delete_all_games))
        .route("/games/{id}", web::get().to(get_game))
        .route("/games/{id}", web::delete().to(delete_game))
        .route("/games/{id}/actions", web::post().to(apply_action))
        .route("/games/{id}/agent-turn", web::post().to(agent_turn))
        .route("/providers/verify", web::post().to(verify_provider));
}

fn validate_configs(configs: &[SeatConfig]) -> Result<(), ApiError> {
    for (i, config) in configs.iter().enumerate() {
        if config.kind != SeatKind::Llm {
            continue;
        }
        if config.algorithm_mode == AlgorithmMode::AlgoOnly {
            if config.algorithm == AlgorithmKind::None {
                return Err(ApiError::BadRequest(format!(
                    "seat {i}: algorithmMode algo_only needs an algorithm"
                )));
            }
        } else {
            if config.provider.is_none() {
                return Err(ApiError::BadRequest(format!(
                    "seat {i}: llm seats need a provider"
                )));
            }
            if config.model.is_none() {
                return Err(ApiError::BadRequest(format!(
                    "seat {i}: llm seats need a model"
                )));
            }
        }
    }
    Ok(())
}

async fn create_game(
    state: web::Data<AppState>,
    body: web::Json<CreateGameRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    if !(2..=4).contains(&request.num_players) {
        return Err(ApiError::BadRequest(
            "numPlayers must be between 2 and 4".to_string(),
        ));
    }

    let configs: Vec<SeatConfig> = if request.player_configs.is_empty() {
        (0..request.num_players).map(|_| SeatConfig::default()).collect()
    } else if request.player_configs.len() == request.num_players as usize {
        request.player_configs
    } else {
        return Err(ApiError::BadRequest(
            "playerConfigs must match numPlayers".to_string(),
        ));
    };
    validate_configs(&configs)?;

    let seats = configs
        .iter()
        .enumerate()
        .map(|(i, c)| {
            (
                c.name.clone().unwrap_or_else(|| format!("Player {}", i + 1)),
                c.agent_profile(),
            )
        })
        .collect();
    let seat_keys: Vec<Option<String>> = configs.iter().map(|c| c.api_key.clone()).collect();

    let session = GameSession::new(seats, request.seed);
    let harbors = session
        .board
        .tiles
        .iter()
        .filter(|t| t.harbor.is_some())
        .count();
    if harbors < 9 {
        debug!(harbors, "harbor spacing left fewer than nine harbors");
    }

    let entry = state.registry.create(session, seat_keys);
    info!(game = %entry.id, "game created");

    let session = entry.session.lock().await;
    Ok(HttpResponse::Ok().json(CreateGameResponse {
        id: entry.id,
        state: game_view(entry.id, &session),
    }))
}

async fn get_game(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entry = state.registry.get(&id).ok_or(ApiError::NotFound)?;
    let session = entry.session.lock().await;
    Ok(HttpResponse::Ok().json(game_view(id, &session)))
}

async fn apply_action(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entry = state.registry.get(&id).ok_or(ApiError::NotFound)?;

    let value = body.into_inner();
    let name = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("missing \"action\" field".to_string()))?;
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);
    let action =
        Action::from_parts(name, &payload).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut session = entry.session.lock().await;
    let player = session.active_player().id;
    let events = session.apply(player, &action)?;

    Ok(HttpResponse::Ok().json(ActionResponse {
        action,
        events,
        state: game_view(id, &session),
    }))
}

async fn agent_turn(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AgentTurnRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entry = state.registry.get(&id).ok_or(ApiError::NotFound)?;

    let outcome = run_agent_turn(&entry, &body.into_inner(), state.provider.as_ref()).await?;

    let session = entry.session.lock().await;
    Ok(HttpResponse::Ok().json(AgentTurnResponse {
        actions: outcome.actions,
        state: game_view(id, &session),
        error: outcome.error,
        proposal: outcome.proposal,
    }))
}

async fn verify_provider(
    state: web::Data<AppState>,
    body: web::Json<VerifyRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let outcome = state
        .provider
        .verify(
            request.provider,
            request.api_key.as_deref(),
            request.api_endpoint.as_deref(),
        )
        .await;

    let status = if outcome.ok {
        StatusCode::OK
    } else if outcome.status == 401 || outcome.status == 403 {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    HttpResponse::build(status).json(outcome)
}

async fn delete_game(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if state.registry.remove(&id) {
        info!(game = %id, "game deleted");
        Ok(HttpResponse::Ok().json(DeleteResponse { deleted: 1 }))
    } else {
        Err(ApiError::NotFound)
    }
}

async fn delete_all_games(state: web::Data<AppState>) -> HttpResponse {
    let deleted = state.registry.clear();
    info!(deleted, "all games deleted");
    HttpResponse::Ok().json(DeleteResponse { deleted })
}
