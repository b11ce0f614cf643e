use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier attached to a staff member.
///
/// Roles are intentionally opaque strings at this layer. The only policy the
/// backend enforces itself is the admin gate on inventory mutation routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convention: "admin" and "owner" may create/edit/delete inventory.
    pub fn is_admin(&self) -> bool {
        matches!(self.as_str(), "admin" | "owner")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
