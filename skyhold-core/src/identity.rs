use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Airline,
    Traveler,
}

/// The resolved identity performing an operation.
///
/// Produced by the authentication middleware; the core never looks at credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    /// Set only for `Role::Airline`: the airline this account operates
    pub airline_id: Option<Uuid>,
}

impl Actor {
    pub fn admin(id: Uuid) -> Self {
        Self { id, role: Role::Admin, airline_id: None }
    }

    pub fn airline(id: Uuid, airline_id: Uuid) -> Self {
        Self { id, role: Role::Airline, airline_id: Some(airline_id) }
    }

    pub fn traveler(id: Uuid) -> Self {
        Self { id, role: Role::Traveler, airline_id: None }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True only for an airline account operating `airline_id`
    pub fn operates(&self, airline_id: Uuid) -> bool {
        self.role == Role::Airline && self.airline_id == Some(airline_id)
    }
}
