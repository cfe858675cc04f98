//! Status and role enums for stored documents.
//!
//! Serde renames on these enums match the string values already present in
//! stored documents; changing them breaks round-tripping of existing data.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders are written as `pending` during checkout and patched to
/// `completed` once the cart has been cleared. The field is preserved on
/// every order document even though no later transition is exercised yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Account type discriminant.
///
/// Matches the `userType` tag on user profile documents. The role of a
/// profile is fixed at registration and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Company,
    Admin,
}

impl UserType {
    /// The stored string form, as used in equality queries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Self::Company),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user type: {s}")),
        }
    }
}

/// How a company intends to work with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationType {
    Distributor,
    Reseller,
    Customization,
    Online,
    Other,
}

/// Preferred contact channel for a company account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreferredChannel {
    #[default]
    Email,
    Phone,
    Whatsapp,
}

/// Preferred correspondence language.
///
/// Stored values are the Romanian-language labels used by the registration
/// form since the first release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PreferredLanguage {
    #[default]
    #[serde(rename = "rom")]
    Romanian,
    #[serde(rename = "maghiar")]
    Hungarian,
    #[serde(rename = "englez")]
    English,
}

/// Permission flags for admin accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_manage_users: bool,
}

impl Default for AdminPermissions {
    /// New admins can view but nothing else until flags are granted.
    fn default() -> Self {
        Self {
            can_view: true,
            can_edit: false,
            can_delete: false,
            can_manage_users: false,
        }
    }
}
