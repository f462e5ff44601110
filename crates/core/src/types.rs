//! Users, roles, resources and the access vocabulary shared by every crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Platform role. `SuperAdmin` is the platform operator and always resolves
/// to [`AccessLevel::Total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Secretary,
    Director,
    Manager,
    Operator,
    Citizen,
}

impl Role {
    pub fn all() -> Vec<Role> {
        vec![
            Role::SuperAdmin,
            Role::Admin,
            Role::Secretary,
            Role::Director,
            Role::Manager,
            Role::Operator,
            Role::Citizen,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Secretary => "secretary",
            Role::Director => "director",
            Role::Manager => "manager",
            Role::Operator => "operator",
            Role::Citizen => "citizen",
        }
    }

    /// Human readable name for listings.
    pub fn label(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Administrator",
            Role::Admin => "Administrator",
            Role::Secretary => "Secretary",
            Role::Director => "Director",
            Role::Manager => "Manager",
            Role::Operator => "Operator",
            Role::Citizen => "Citizen",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::all()
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| CoreError::Validation(format!("unknown role `{s}`")))
    }
}

/// Coarse-grained permission on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Total,
    ReadOnly,
    Denied,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Total => "total",
            AccessLevel::ReadOnly => "read_only",
            AccessLevel::Denied => "denied",
        }
    }

    /// Whether this level is sufficient for `action`.
    pub fn permits(&self, action: Action) -> bool {
        match (self, action) {
            (AccessLevel::Total, _) => true,
            (AccessLevel::ReadOnly, Action::View) => true,
            (AccessLevel::ReadOnly, _) | (AccessLevel::Denied, _) => false,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "total" => Ok(AccessLevel::Total),
            "read_only" => Ok(AccessLevel::ReadOnly),
            "denied" => Ok(AccessLevel::Denied),
            other => Err(CoreError::Validation(format!("unknown access level `{other}`"))),
        }
    }
}

/// Operation a caller wants to perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
    ManageUsers,
}

impl Action {
    pub fn all() -> Vec<Action> {
        vec![
            Action::View,
            Action::Create,
            Action::Edit,
            Action::Delete,
            Action::Approve,
            Action::ManageUsers,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::ManageUsers => "manage_users",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::all()
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| CoreError::Validation(format!("unknown action `{s}`")))
    }
}

/// Dotted resource path such as `health.medications`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Validate the dotted-path form: one or more non-empty segments of
    /// `[a-z0-9_]` separated by `.`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let valid = !raw.is_empty()
            && raw.split('.').all(|seg| {
                !seg.is_empty()
                    && seg
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            });
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(CoreError::Validation(format!("malformed resource id `{raw}`")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First path segment, e.g. `health` for `health.medications`.
    pub fn module(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceId::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// A protected system resource. Static configuration, loaded at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub module: String,
}

/// One row of the base access matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub role: Role,
    pub resource: ResourceId,
    pub access: AccessLevel,
}

/// Municipal department a user may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Secretariat {
    Administration,
    Health,
    Education,
    Finance,
    Infrastructure,
    SocialAssistance,
    Environment,
}

impl Secretariat {
    pub fn all() -> Vec<Secretariat> {
        vec![
            Secretariat::Administration,
            Secretariat::Health,
            Secretariat::Education,
            Secretariat::Finance,
            Secretariat::Infrastructure,
            Secretariat::SocialAssistance,
            Secretariat::Environment,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Secretariat::Administration => "Administration",
            Secretariat::Health => "Health",
            Secretariat::Education => "Education",
            Secretariat::Finance => "Finance",
            Secretariat::Infrastructure => "Infrastructure",
            Secretariat::SocialAssistance => "Social Assistance",
            Secretariat::Environment => "Environment",
        }
    }
}

/// Platform user. Never hard-deleted; `active = false` is the soft delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub secretariat: Option<Secretariat>,
    pub role: Role,
    pub active: bool,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by the entity store.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub active: Option<bool>,
    pub credential_hash: Option<String>,
}

/// Kind of mutation recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    UserCreated,
    UserActivated,
    UserDeactivated,
    PasswordReset,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::UserCreated => "user_created",
            ActivityAction::UserActivated => "user_activated",
            ActivityAction::UserDeactivated => "user_deactivated",
            ActivityAction::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record. `sequence` and the hash pair are assigned by the
/// activity log on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub sequence: u64,
    /// User who performed the action.
    pub actor: Uuid,
    /// User the action was applied to.
    pub subject: Uuid,
    pub action: ActivityAction,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub event_hash: String,
    pub previous_hash: String,
}

impl ActivityLogEntry {
    /// Build an unsequenced entry stamped with the current time.
    pub fn new(actor: Uuid, subject: Uuid, action: ActivityAction, detail: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            actor,
            subject,
            action,
            detail,
            timestamp: Utc::now(),
            event_hash: String::new(),
            previous_hash: String::new(),
        }
    }
}
