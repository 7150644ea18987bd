//! The action and event vocabulary.
//!
//! Actions travel as `{"action": "<name>", "payload": {…}}`. Parsing goes
//! through [`Action::from_parts`], which is also the driver's sanitizer:
//! it understands every payload field by name, drops anything it does not
//! know, and rejects unknown action names with a typed error. Agent
//! proposals and manual client moves share this one entry point.

use crate::board::{EdgeId, NodeId, PlayerId, TileId};
use crate::player::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// All actions a player can take
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "action",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Roll the dice (once, at the start of the turn)
    RollDice,
    /// Move the robber to a tile (after a 7 or a Knight)
    MoveRobber { hex_id: TileId },
    /// Build a road; `free` consumes a Road Building grant
    BuildRoad { edge_id: EdgeId, free: bool },
    /// Build a town on a node
    BuildTown { node_id: NodeId },
    /// Upgrade an own town to a city
    BuildCity { node_id: NodeId },
    /// Trade with the bank at the best harbor ratio
    HarborTrade {
        #[serde(rename = "giveResource")]
        give: Resource,
        #[serde(rename = "receiveResource")]
        receive: Resource,
    },
    /// Buy the top card of the development deck
    BuyDevCard,
    PlayKnight,
    PlayRoadBuilding,
    PlayYearOfPlenty {
        resource1: Resource,
        resource2: Resource,
    },
    PlayMonopoly { resource: Resource },
    /// Pass the turn to the next seat
    EndTurn,
}

/// Failures turning raw `{action, payload}` parts into an [`Action`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
    #[error("unknown action \"{0}\"")]
    UnknownAction(String),

    #[error("payload field \"{0}\" is missing or malformed")]
    BadField(&'static str),
}

fn index_field(payload: &Value, key: &'static str) -> Result<usize, ActionParseError> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or(ActionParseError::BadField(key))
}

fn resource_field(payload: &Value, key: &'static str) -> Result<Resource, ActionParseError> {
    let value = payload.get(key).ok_or(ActionParseError::BadField(key))?;
    serde_json::from_value(value.clone()).map_err(|_| ActionParseError::BadField(key))
}

impl Action {
    /// Build an action from its wire parts. Unknown payload fields are
    /// ignored; a missing payload is treated as `{}`.
    pub fn from_parts(action: &str, payload: &Value) -> Result<Self, ActionParseError> {
        match action {
            "rollDice" => Ok(Action::RollDice),
            "moveRobber" => Ok(Action::MoveRobber {
                hex_id: index_field(payload, "hexId")?,
            }),
            "buildRoad" => Ok(Action::BuildRoad {
                edge_id: index_field(payload, "edgeId")?,
                free: payload.get("free").and_then(Value::as_bool).unwrap_or(false),
            }),
            "buildTown" => Ok(Action::BuildTown {
                node_id: index_field(payload, "nodeId")?,
            }),
            "buildCity" => Ok(Action::BuildCity {
                node_id: index_field(payload, "nodeId")?,
            }),
            "harborTrade" => Ok(Action::HarborTrade {
                give: resource_field(payload, "giveResource")?,
                receive: resource_field(payload, "receiveResource")?,
            }),
            "buyDevCard" => Ok(Action::BuyDevCard),
            "playKnight" => Ok(Action::PlayKnight),
            "playRoadBuilding" => Ok(Action::PlayRoadBuilding),
            "playYearOfPlenty" => Ok(Action::PlayYearOfPlenty {
                resource1: resource_field(payload, "resource1")?,
                resource2: resource_field(payload, "resource2")?,
            }),
            "playMonopoly" => Ok(Action::PlayMonopoly {
                resource: resource_field(payload, "resource")?,
            }),
            "endTurn" => Ok(Action::EndTurn),
            other => Err(ActionParseError::UnknownAction(other.to_string())),
        }
    }

    /// The wire name of this action
    pub fn kind(&self) -> &'static str {
        match self {
            Action::RollDice => "rollDice",
            Action::MoveRobber { .. } => "moveRobber",
            Action::BuildRoad { .. } => "buildRoad",
            Action::BuildTown { .. } => "buildTown",
            Action::BuildCity { .. } => "buildCity",
            Action::HarborTrade { .. } => "harborTrade",
            Action::BuyDevCard => "buyDevCard",
            Action::PlayKnight => "playKnight",
            Action::PlayRoadBuilding => "playRoadBuilding",
            Action::PlayYearOfPlenty { .. } => "playYearOfPlenty",
            Action::PlayMonopoly { .. } => "playMonopoly",
            Action::EndTurn => "endTurn",
        }
    }

    /// Whether this action passes rather than plays
    pub fn is_passing(&self) -> bool {
        matches!(self, Action::EndTurn)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            action: String,
            #[serde(default)]
            payload: Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        Action::from_parts(&raw.action, &raw.payload).map_err(serde::de::Error::custom)
    }
}

/// One player's gain from a production roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionGain {
    pub player: PlayerId,
    pub resource: Resource,
    pub amount: u32,
}

/// Events appended to the session log as actions resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    DiceRolled {
        player: PlayerId,
        dice: [u8; 2],
        total: u8,
    },
    ProductionDistributed {
        gains: Vec<ProductionGain>,
    },
    RobberMoved {
        player: PlayerId,
        from: TileId,
        to: TileId,
    },
    RoadBuilt {
        player: PlayerId,
        edge: EdgeId,
        free: bool,
    },
    TownBuilt {
        player: PlayerId,
        node: NodeId,
    },
    CityBuilt {
        player: PlayerId,
        node: NodeId,
    },
    HarborTraded {
        player: PlayerId,
        gave: Resource,
        gave_amount: u32,
        received: Resource,
    },
    DevCardBought {
        player: PlayerId,
    },
    KnightPlayed {
        player: PlayerId,
    },
    RoadBuildingPlayed {
        player: PlayerId,
    },
    YearOfPlentyPlayed {
        player: PlayerId,
        resource1: Resource,
        resource2: Resource,
    },
    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        taken: u32,
    },
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },
    TurnEnded {
        player: PlayerId,
        next: PlayerId,
    },
    GameWon {
        player: PlayerId,
        vp: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_build_town() {
        let action = Action::from_parts("buildTown", &json!({"nodeId": 12})).unwrap();
        assert_eq!(action, Action::BuildTown { node_id: 12 });
    }

    #[test]
    fn test_parse_drops_unknown_fields() {
        let payload = json!({"nodeId": 3, "mood": "optimistic", "extra": [1, 2]});
        let action = Action::from_parts("buildTown", &payload).unwrap();
        assert_eq!(action, Action::BuildTown { node_id: 3 });
    }

    #[test]
    fn test_parse_empty_payloads() {
        assert_eq!(
            Action::from_parts("rollDice", &json!({})).unwrap(),
            Action::RollDice
        );
        assert_eq!(
            Action::from_parts("endTurn", &Value::Null).unwrap(),
            Action::EndTurn
        );
    }

    #[test]
    fn test_parse_unknown_action() {
        let err = Action::from_parts("tradeWithPlayer", &json!({})).unwrap_err();
        assert!(matches!(err, ActionParseError::UnknownAction(_)));
    }

    #[test]
    fn test_parse_missing_field() {
        let err = Action::from_parts("moveRobber", &json!({})).unwrap_err();
        assert_eq!(err, ActionParseError::BadField("hexId"));
    }

    #[test]
    fn test_parse_resource_synonyms() {
        let payload = json!({"giveResource": "lumber", "receiveResource": "wool"});
        let action = Action::from_parts("harborTrade", &payload).unwrap();
        assert_eq!(
            action,
            Action::HarborTrade {
                give: Resource::Wood,
                receive: Resource::Sheep,
            }
        );
    }

    #[test]
    fn test_deserialize_full_body() {
        let action: Action =
            serde_json::from_value(json!({"action": "buildRoad", "payload": {"edgeId": 7}}))
                .unwrap();
        assert_eq!(
            action,
            Action::BuildRoad {
                edge_id: 7,
                free: false,
            }
        );

        // Missing payload is fine for unit-like actions
        let action: Action = serde_json::from_value(json!({"action": "buyDevCard"})).unwrap();
        assert_eq!(action, Action::BuyDevCard);
    }

    #[test]
    fn test_serialize_wire_shape() {
        let value = serde_json::to_value(Action::MoveRobber { hex_id: 4 }).unwrap();
        assert_eq!(value, json!({"action": "moveRobber", "payload": {"hexId": 4}}));

        let value = serde_json::to_value(Action::EndTurn).unwrap();
        assert_eq!(value, json!({"action": "endTurn"}));
    }
}
