//! Organizations and their members

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use super::Row;
use super::Value;
use crate::error::FieldError;

/// A stored organization.
#[derive(Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo: String,
}

impl Row for Organization {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => Value::from(self.id.as_str()),
            "created_at" => Value::from(self.created_at),
            "updated_at" => Value::from(self.updated_at),
            "name" => Value::from(self.name.as_str()),
            "slug" => Value::from(self.slug.as_str()),
            "description" => Value::from(self.description.clone()),
            "logo" => Value::from(self.logo.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

/// Fields for creating an organization.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub logo: String,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>, logo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            logo: logo.into(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Fields for updating an organization. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub logo: Option<String>,
}

impl OrganizationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.logo.is_none()
    }
}

/// Role of a user within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            other => Err(FieldError::invalid("role", other)),
        }
    }
}

/// Membership of a user in an organization. Blog authors are members.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationMember {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
    /// Free-form metadata; `display_name` is shown as the author.
    pub org_metadata: serde_json::Value,
}

impl OrganizationMember {
    /// Display name from the membership metadata, falling back to the user id.
    pub fn display_name(&self) -> &str {
        self.org_metadata
            .get("display_name")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.user_id)
    }
}

/// Fields for adding a member to an organization.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
    pub display_name: String,
}

impl NewMember {
    pub fn new(
        user_id: impl Into<String>,
        organization_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: organization_id.into(),
            role: Role::Member,
            display_name: display_name.into(),
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_user() {
        let mut member = OrganizationMember {
            id: "m1".into(),
            created_at: None,
            updated_at: None,
            user_id: "u1".into(),
            organization_id: "o1".into(),
            role: Role::Admin,
            org_metadata: serde_json::json!({}),
        };
        assert_eq!(member.display_name(), "u1");

        member.org_metadata = serde_json::json!({ "display_name": "Grace" });
        assert_eq!(member.display_name(), "Grace");
    }
}
