//! User lifecycle: create, activate/deactivate, credential reset, search and
//! stats. Every mutation appends an activity-log entry through the store.
//!
//! State machine: `created -> active <-> inactive`. There is no delete;
//! deactivation is the soft delete.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use civic_core::config::UserPolicyConfig;
use civic_core::error::{CoreError, CoreResult};
use civic_core::types::{ActivityAction, ActivityLogEntry, Role, Secretariat, User, UserUpdate};

use crate::credentials::{hash_credential, verify_credential};
use crate::store::EntityStore;

const STATUS_UNCHANGED: &str = "status unchanged";

/// Input for [`UserManager::create_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub secretariat: Option<Secretariat>,
    pub role: Role,
    pub credential: String,
}

/// Aggregate counts over the current user set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub by_role: BTreeMap<Role, usize>,
}

/// Result of a user search. Iterating filters lazily and can be repeated.
#[derive(Debug, Clone)]
pub struct UserSearch {
    users: Vec<User>,
    needle: String,
}

impl UserSearch {
    pub fn iter(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.iter().filter(move |u| {
            self.needle.is_empty()
                || u.name.to_lowercase().contains(&self.needle)
                || u.email.to_lowercase().contains(&self.needle)
        })
    }
}

impl<'s> IntoIterator for &'s UserSearch {
    type Item = &'s User;
    type IntoIter = Box<dyn Iterator<Item = &'s User> + 's>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// User lifecycle operations over an entity store.
pub struct UserManager<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    policy: UserPolicyConfig,
}

impl<'a, S: EntityStore + ?Sized> UserManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_policy(store, UserPolicyConfig::default())
    }

    pub fn with_policy(store: &'a S, policy: UserPolicyConfig) -> Self {
        Self { store, policy }
    }

    fn check_credential(&self, credential: &str) -> CoreResult<()> {
        if credential.is_empty() {
            return Err(CoreError::Validation("credential is required".into()));
        }
        if credential.chars().count() < self.policy.min_credential_len {
            return Err(CoreError::Validation(format!(
                "credential must have at least {} characters",
                self.policy.min_credential_len
            )));
        }
        Ok(())
    }

    fn log(
        &self,
        actor: Uuid,
        subject: Uuid,
        action: ActivityAction,
        detail: String,
    ) -> CoreResult<ActivityLogEntry> {
        self.store
            .append_activity_log(ActivityLogEntry::new(actor, subject, action, detail))
    }

    /// Create an active user. Nothing is written when validation fails or
    /// the email is taken.
    pub fn create_user(&self, actor: Uuid, input: NewUser) -> CoreResult<User> {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(CoreError::Validation("name is required".into()));
        }
        if email.is_empty() {
            return Err(CoreError::Validation("email is required".into()));
        }
        if !email.contains('@') {
            return Err(CoreError::Validation(format!("email `{email}` is invalid")));
        }
        self.check_credential(&input.credential)?;

        if self.store.get_user_by_email(&email)?.is_some() {
            return Err(CoreError::Conflict(format!(
                "email `{email}` is already registered"
            )));
        }

        let credential_hash = hash_credential(&input.credential, self.policy.credential_cost)?;
        let now = Utc::now();
        let user = self.store.insert_user(User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            secretariat: input.secretariat,
            role: input.role,
            active: true,
            credential_hash,
            created_at: now,
            updated_at: now,
        })?;

        self.log(
            actor,
            user.id,
            ActivityAction::UserCreated,
            format!("created user {} with role {}", user.email, user.role),
        )?;
        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Set the active flag. Setting the current value changes nothing but is
    /// still logged. The change and its log entry are applied under the
    /// user's store lock, so concurrent toggles log in the order they landed.
    pub fn toggle_user_status(
        &self,
        actor: Uuid,
        user_id: Uuid,
        active: bool,
    ) -> CoreResult<User> {
        let action = if active {
            ActivityAction::UserActivated
        } else {
            ActivityAction::UserDeactivated
        };
        let log = |user: &User, previous: bool| {
            let detail = match (previous == user.active, active) {
                (true, _) => STATUS_UNCHANGED,
                (false, true) => "user activated",
                (false, false) => "user deactivated",
            };
            ActivityLogEntry::new(actor, user.id, action, detail.to_string())
        };
        let (user, entry) = self.store.set_user_active(user_id, active, &log)?;
        if entry.detail == STATUS_UNCHANGED {
            debug!(user_id = %user_id, active, "Status unchanged");
        }
        info!(user_id = %user_id, active, sequence = entry.sequence, "User status set");
        Ok(user)
    }

    /// Replace the stored credential hash. The raw value is never logged.
    pub fn reset_credential(
        &self,
        actor: Uuid,
        user_id: Uuid,
        new_credential: &str,
    ) -> CoreResult<()> {
        self.check_credential(new_credential)?;
        let credential_hash = hash_credential(new_credential, self.policy.credential_cost)?;
        self.store.update_user(
            user_id,
            UserUpdate {
                credential_hash: Some(credential_hash),
                ..UserUpdate::default()
            },
        )?;
        self.log(
            actor,
            user_id,
            ActivityAction::PasswordReset,
            "credential reset".into(),
        )?;
        info!(user_id = %user_id, "Credential reset");
        Ok(())
    }

    /// Check a candidate credential against the stored hash.
    pub fn verify_credential(&self, user_id: Uuid, candidate: &str) -> CoreResult<bool> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))?;
        Ok(verify_credential(candidate, &user.credential_hash))
    }

    pub fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))
    }

    /// All users sorted by name.
    pub fn list_users(&self) -> CoreResult<Vec<User>> {
        let mut users = self.store.get_users()?;
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    pub fn users_by_secretariat(&self, secretariat: Secretariat) -> CoreResult<Vec<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .filter(|u| u.secretariat == Some(secretariat))
            .collect())
    }

    /// Case-insensitive substring match over name and email. An empty query
    /// matches everyone.
    pub fn search_users(&self, query: &str) -> CoreResult<UserSearch> {
        Ok(UserSearch {
            users: self.list_users()?,
            needle: query.trim().to_lowercase(),
        })
    }

    /// Recomputed from the store on every call.
    pub fn get_user_stats(&self) -> CoreResult<UserStats> {
        let users = self.store.get_users()?;
        let mut stats = UserStats {
            total: users.len(),
            ..UserStats::default()
        };
        for user in &users {
            if user.active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            *stats.by_role.entry(user.role).or_default() += 1;
        }
        Ok(stats)
    }

    /// Newest activity first.
    pub fn recent_activity(&self, limit: usize) -> CoreResult<Vec<ActivityLogEntry>> {
        let mut entries = self.store.get_activity_log()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}
