use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The fixed set of shared-item kinds the board understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Todo,
    Note,
    Photo,
    Schedule,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Todo => "todo",
            EventKind::Note => "note",
            EventKind::Photo => "photo",
            EventKind::Schedule => "schedule",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(EventKind::Todo),
            "note" => Ok(EventKind::Note),
            "photo" => Ok(EventKind::Photo),
            "schedule" => Ok(EventKind::Schedule),
            _ => Err(()),
        }
    }
}

/// 2D placement of an item on the shared board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A shared item owned jointly by the two members of a couple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupleEvent {
    pub id: Uuid,
    pub couple_id: Uuid,
    pub creator_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub position: Option<Position>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape as stored; position lives in two nullable columns.
#[derive(Debug, Clone, FromRow)]
pub struct CoupleEventRow {
    pub id: Uuid,
    pub couple_id: Uuid,
    pub creator_id: String,
    pub content: String,
    pub kind: String,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CoupleEventRow> for CoupleEvent {
    fn from(row: CoupleEventRow) -> Self {
        // The CHECK constraint keeps kind inside the fixed set; an unknown
        // value here means the schema and the enum drifted apart.
        let kind = EventKind::from_str(&row.kind).unwrap_or(EventKind::Note);
        let position = match (row.position_x, row.position_y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        };
        Self {
            id: row.id,
            couple_id: row.couple_id,
            creator_id: row.creator_id,
            content: row.content,
            kind,
            position,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_the_fixed_set_only() {
        assert_eq!("todo".parse::<EventKind>(), Ok(EventKind::Todo));
        assert_eq!("schedule".parse::<EventKind>(), Ok(EventKind::Schedule));
        assert!("mood".parse::<EventKind>().is_err());
        assert!("TODO".parse::<EventKind>().is_err());
        assert!("".parse::<EventKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EventKind::Photo).unwrap(), "\"photo\"");
        assert_eq!(EventKind::Photo.as_str(), "photo");
    }

    #[test]
    fn position_round_trips() {
        let p = Position { x: 1.0, y: 2.0 };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0}"#);
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn row_with_half_set_position_maps_to_none() {
        let row = CoupleEventRow {
            id: Uuid::new_v4(),
            couple_id: Uuid::new_v4(),
            creator_id: "u1".to_string(),
            content: "买花".to_string(),
            kind: "todo".to_string(),
            position_x: Some(1.0),
            position_y: None,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let event = CoupleEvent::from(row);
        assert_eq!(event.position, None);
        assert_eq!(event.kind, EventKind::Todo);
    }

    #[test]
    fn event_wire_format_uses_type_and_camel_case() {
        let event = CoupleEvent {
            id: Uuid::new_v4(),
            couple_id: Uuid::new_v4(),
            creator_id: "u1".to_string(),
            content: "纪念日".to_string(),
            kind: EventKind::Schedule,
            position: Some(Position { x: 1.0, y: 2.0 }),
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "schedule");
        assert_eq!(json["creatorId"], "u1");
        assert_eq!(json["position"]["x"], 1.0);
        assert_eq!(json["position"]["y"], 2.0);

        let back: CoupleEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.position, Some(Position { x: 1.0, y: 2.0 }));
    }
}
