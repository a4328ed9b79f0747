//! User intents: the inputs a presentation layer sends to the simulation.

use std::str::FromStr;

use serde::Deserialize;
use zonewatch_runtime::Event;

use crate::zone::ZoneId;

pub const SET_FILTER: &str = "Intent/SetFilter";
pub const SELECT: &str = "Intent/Select";
pub const CLEAR_SELECTION: &str = "Intent/ClearSelection";
pub const ESCAPE: &str = "Intent/Escape";

/// Pattern matching every intent event type
pub const ANY_INTENT: &str = "Intent/*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    SetFilter(String),
    Select(ZoneId),
    ClearSelection,
    /// Cancel signal from the host UI, e.g. the escape key
    Escape,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("Unknown intent: {0}")]
    Unknown(String),

    #[error("Missing field '{field}' in {event_type}")]
    MissingField {
        event_type: String,
        field: &'static str,
    },

    #[error("Invalid zone id: {0}")]
    InvalidZoneId(String),
}

#[derive(Deserialize)]
struct FilterData {
    text: String,
}

#[derive(Deserialize)]
struct SelectData {
    id: ZoneId,
}

impl UserIntent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UserIntent::SetFilter(_) => SET_FILTER,
            UserIntent::Select(_) => SELECT,
            UserIntent::ClearSelection => CLEAR_SELECTION,
            UserIntent::Escape => ESCAPE,
        }
    }

    /// Wrap this intent in a runtime event
    pub fn to_event(&self, source: &str) -> Event {
        let data = match self {
            UserIntent::SetFilter(text) => serde_json::json!({ "text": text }),
            UserIntent::Select(id) => serde_json::json!({ "id": id.get() }),
            UserIntent::ClearSelection | UserIntent::Escape => serde_json::Value::Null,
        };
        Event::new(self.event_type(), source, data)
    }
}

impl TryFrom<&Event> for UserIntent {
    type Error = IntentError;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        let missing = |field| IntentError::MissingField {
            event_type: event.event_type.clone(),
            field,
        };

        match event.event_type.as_str() {
            SET_FILTER => {
                let data: FilterData = event.parse_data().map_err(|_| missing("text"))?;
                Ok(UserIntent::SetFilter(data.text))
            }
            SELECT => {
                let data: SelectData = event.parse_data().map_err(|_| missing("id"))?;
                Ok(UserIntent::Select(data.id))
            }
            CLEAR_SELECTION => Ok(UserIntent::ClearSelection),
            ESCAPE => Ok(UserIntent::Escape),
            other => Err(IntentError::Unknown(other.to_string())),
        }
    }
}

/// Parse a command line: `filter <text>`, `select <id>`, `clear`, `esc`
impl FromStr for UserIntent {
    type Err = IntentError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "filter" | "f" => Ok(UserIntent::SetFilter(rest.to_string())),
            "select" | "s" => rest
                .parse::<u32>()
                .map(|id| UserIntent::Select(ZoneId(id)))
                .map_err(|_| IntentError::InvalidZoneId(rest.to_string())),
            "clear" => Ok(UserIntent::ClearSelection),
            "esc" | "escape" => Ok(UserIntent::Escape),
            _ => Err(IntentError::Unknown(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        assert_eq!("filter a5".parse::<UserIntent>(), Ok(UserIntent::SetFilter("a5".to_string())));
        assert_eq!(
            "filter  Zone 5 ".parse::<UserIntent>(),
            Ok(UserIntent::SetFilter("Zone 5".to_string()))
        );
        assert_eq!("filter".parse::<UserIntent>(), Ok(UserIntent::SetFilter(String::new())));
        assert_eq!("select 12".parse::<UserIntent>(), Ok(UserIntent::Select(ZoneId(12))));
        assert_eq!("ESC".parse::<UserIntent>(), Ok(UserIntent::Escape));
        assert_eq!("clear".parse::<UserIntent>(), Ok(UserIntent::ClearSelection));

        assert_eq!(
            "select twelve".parse::<UserIntent>(),
            Err(IntentError::InvalidZoneId("twelve".to_string()))
        );
        assert!(matches!("dance".parse::<UserIntent>(), Err(IntentError::Unknown(_))));
    }

    #[test]
    fn test_event_conversion() {
        let intent = UserIntent::SetFilter("room b".to_string());
        let event = intent.to_event("test");
        assert_eq!(event.event_type, SET_FILTER);
        assert!(event.matches(ANY_INTENT));
        assert_eq!(UserIntent::try_from(&event), Ok(intent));

        let event = UserIntent::Select(ZoneId(9)).to_event("test");
        assert_eq!(event.data["id"], 9);
        assert_eq!(UserIntent::try_from(&event), Ok(UserIntent::Select(ZoneId(9))));
    }

    #[test]
    fn test_malformed_events() {
        let event = Event::now(SELECT, "test");
        assert_eq!(
            UserIntent::try_from(&event),
            Err(IntentError::MissingField {
                event_type: SELECT.to_string(),
                field: "id",
            })
        );

        let event = Event::now("Intent/Dance", "test");
        assert!(matches!(UserIntent::try_from(&event), Err(IntentError::Unknown(_))));
    }
}
