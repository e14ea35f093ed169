use serde::{Deserialize, Serialize};

/// The only authorization distinction in the system: the user who created a
/// session may mutate it, everyone else is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Initiator,
    Participant,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Participant => "participant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initiator" => Some(Self::Initiator),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }
}
