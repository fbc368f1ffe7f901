//! Access roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of the backend's role names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Access level controlling visible routes and API authorization.
///
/// Serialized with the backend's names (`"Admin"`, `"Cajero"`, ...), which are
/// also what the role update endpoint expects as its plain-text body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    /// Full access, including user administration.
    Admin,
    /// Cashier.
    Cajero,
    /// Cook.
    Cocinero,
    /// Delivery driver.
    Delivery,
    /// Customer. Assigned to every self-registered account.
    #[default]
    Cliente,
    /// Employee without a specific station.
    Empleado,
}

impl Role {
    /// Every role, in the order the backend declares them.
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::Cajero,
        Self::Cocinero,
        Self::Delivery,
        Self::Cliente,
        Self::Empleado,
    ];

    /// The backend's name for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Cajero => "Cajero",
            Self::Cocinero => "Cocinero",
            Self::Delivery => "Delivery",
            Self::Cliente => "Cliente",
            Self::Empleado => "Empleado",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleParseError(s.to_string()))
    }
}
