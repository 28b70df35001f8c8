//! Persisted session model.
//!
//! The structured store entry looks like
//! `{"state": {"user": {...}, "token": "...", "isAuthenticated": true}, "version": 0}`.
//! Roles are a set in memory and a list on disk. Older writers produced other
//! shapes (a bare string, or an object of role flags); those are normalized
//! once here at deserialization.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Developer,
    User,
    Viewer,
}

impl Role {
    /// Case-insensitive; accepts a `ROLE_` prefix.
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("ROLE_").unwrap_or(upper.as_str()) {
            "ADMIN" => Some(Role::Admin),
            "DEVELOPER" => Some(Role::Developer),
            "USER" => Some(Role::User),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::Developer => "DEVELOPER",
            Role::User => "USER",
            Role::Viewer => "VIEWER",
        };
        f.write_str(s)
    }
}

/// Authenticated account as cached by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: BTreeSet<Role>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// The session slice of client state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl Session {
    pub fn authenticated(token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            user,
            token: Some(token.into()),
            is_authenticated: true,
        }
    }

    /// Token if present and non-blank.
    pub fn usable_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// On-disk envelope around [`Session`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: Session,
    #[serde(default)]
    pub version: u32,
}

fn deserialize_roles<'de, D>(deserializer: D) -> Result<BTreeSet<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(RolesVisitor)
}

struct RolesVisitor;

impl RolesVisitor {
    fn insert(roles: &mut BTreeSet<Role>, raw: &str) {
        match Role::parse(raw) {
            Some(role) => {
                roles.insert(role);
            }
            None => tracing::warn!(role = raw, "Dropping unknown role"),
        }
    }
}

impl<'de> Visitor<'de> for RolesVisitor {
    type Value = BTreeSet<Role>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of roles, a role string, or a map of role flags")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(BTreeSet::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(BTreeSet::new())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let mut roles = BTreeSet::new();
        for part in v.split(',').filter(|p| !p.trim().is_empty()) {
            Self::insert(&mut roles, part);
        }
        Ok(roles)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut roles = BTreeSet::new();
        while let Some(raw) = seq.next_element::<String>()? {
            Self::insert(&mut roles, &raw);
        }
        Ok(roles)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut roles = BTreeSet::new();
        while let Some((raw, enabled)) = map.next_entry::<String, serde_json::Value>()? {
            if enabled.as_bool().unwrap_or(true) {
                Self::insert(&mut roles, &raw);
            }
        }
        Ok(roles)
    }
}
