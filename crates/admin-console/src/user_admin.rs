//! Guarded user administration: the surface the presentation layer calls.
//!
//! Every call names the acting user by id. The actor is re-read from the
//! store on each call so a deactivation or role change takes effect on the
//! very next request, then checked through [`AccessGuard`] before the
//! lifecycle manager runs.
//!
//! Super-admin accounts are only created or changed by another super_admin,
//! whatever the matrix grants on user management.

use tracing::warn;
use uuid::Uuid;

use civic_core::config::UserPolicyConfig;
use civic_core::error::{CoreError, CoreResult};
use civic_core::types::{
    AccessLevel, Action, ActivityLogEntry, Resource, Role, Secretariat, User,
};
use civic_platform::guard::AccessGuard;
use civic_platform::rbac::AccessResolver;
use civic_platform::store::EntityStore;
use civic_platform::users::{NewUser, UserManager, UserSearch, UserStats};

const USERS: &str = "users.management";
const ACTIVITY_LOG: &str = "users.activity_log";
const ACCESS_CONTROL: &str = "settings.access_control";

pub struct UserAdmin<'a, S: EntityStore + ?Sized> {
    users: UserManager<'a, S>,
    guard: AccessGuard<'a>,
    resolver: &'a AccessResolver,
}

impl<'a, S: EntityStore + ?Sized> UserAdmin<'a, S> {
    pub fn new(store: &'a S, resolver: &'a AccessResolver) -> Self {
        Self::with_policy(store, resolver, UserPolicyConfig::default())
    }

    pub fn with_policy(
        store: &'a S,
        resolver: &'a AccessResolver,
        policy: UserPolicyConfig,
    ) -> Self {
        Self {
            users: UserManager::with_policy(store, policy),
            guard: AccessGuard::new(resolver),
            resolver,
        }
    }

    fn authorize(&self, actor_id: Uuid, resource: &str, action: Action) -> CoreResult<User> {
        self.authorize_with_level(actor_id, resource, action)
            .map(|(actor, _)| actor)
    }

    fn authorize_with_level(
        &self,
        actor_id: Uuid,
        resource: &str,
        action: Action,
    ) -> CoreResult<(User, AccessLevel)> {
        let actor = self.users.get_user(actor_id)?;
        let level = self.guard.authorize(&actor, resource, action)?;
        Ok((actor, level))
    }

    /// A super_admin target needs a super_admin actor, whatever `level` the
    /// matrix granted on user management.
    fn guard_super_admin(
        actor: &User,
        level: AccessLevel,
        action: Action,
        target_role: Role,
    ) -> CoreResult<()> {
        if target_role == Role::SuperAdmin && actor.role != Role::SuperAdmin {
            warn!(
                user_id = %actor.id,
                role = %actor.role,
                action = %action,
                "Super-admin account change refused"
            );
            return Err(CoreError::AccessDenied {
                role: actor.role,
                resource: USERS.to_string(),
                action,
                level,
            });
        }
        Ok(())
    }

    pub fn create_user(&self, actor_id: Uuid, input: NewUser) -> CoreResult<User> {
        let (actor, level) = self.authorize_with_level(actor_id, USERS, Action::Create)?;
        Self::guard_super_admin(&actor, level, Action::Create, input.role)?;
        self.users.create_user(actor.id, input)
    }

    pub fn set_user_active(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        active: bool,
    ) -> CoreResult<User> {
        let (actor, level) = self.authorize_with_level(actor_id, USERS, Action::Edit)?;
        let target = self.users.get_user(user_id)?;
        Self::guard_super_admin(&actor, level, Action::Edit, target.role)?;
        self.users.toggle_user_status(actor.id, user_id, active)
    }

    pub fn reset_credential(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        new_credential: &str,
    ) -> CoreResult<()> {
        let (actor, level) = self.authorize_with_level(actor_id, USERS, Action::ManageUsers)?;
        let target = self.users.get_user(user_id)?;
        Self::guard_super_admin(&actor, level, Action::ManageUsers, target.role)?;
        self.users.reset_credential(actor.id, user_id, new_credential)
    }

    pub fn get_user(&self, actor_id: Uuid, user_id: Uuid) -> CoreResult<User> {
        self.authorize(actor_id, USERS, Action::View)?;
        self.users.get_user(user_id)
    }

    pub fn list_users(&self, actor_id: Uuid) -> CoreResult<Vec<User>> {
        self.authorize(actor_id, USERS, Action::View)?;
        self.users.list_users()
    }

    pub fn users_by_secretariat(
        &self,
        actor_id: Uuid,
        secretariat: Secretariat,
    ) -> CoreResult<Vec<User>> {
        self.authorize(actor_id, USERS, Action::View)?;
        self.users.users_by_secretariat(secretariat)
    }

    pub fn search_users(&self, actor_id: Uuid, query: &str) -> CoreResult<UserSearch> {
        self.authorize(actor_id, USERS, Action::View)?;
        self.users.search_users(query)
    }

    pub fn user_stats(&self, actor_id: Uuid) -> CoreResult<UserStats> {
        self.authorize(actor_id, USERS, Action::View)?;
        self.users.get_user_stats()
    }

    pub fn recent_activity(
        &self,
        actor_id: Uuid,
        limit: usize,
    ) -> CoreResult<Vec<ActivityLogEntry>> {
        self.authorize(actor_id, ACTIVITY_LOG, Action::View)?;
        self.users.recent_activity(limit)
    }

    /// A role's full row of the access matrix, for the permissions screen.
    pub fn permissions_for_role(
        &self,
        actor_id: Uuid,
        role: Role,
    ) -> CoreResult<Vec<(Resource, AccessLevel)>> {
        self.authorize(actor_id, ACCESS_CONTROL, Action::View)?;
        Ok(self.resolver.snapshot().permissions_for_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use civic_platform::rbac::AccessMatrix;
    use civic_platform::store::InMemoryStore;

    fn console<'a>(
        store: &'a InMemoryStore,
        resolver: &'a AccessResolver,
    ) -> UserAdmin<'a, InMemoryStore> {
        let policy = UserPolicyConfig {
            credential_cost: 4,
            ..UserPolicyConfig::default()
        };
        UserAdmin::with_policy(store, resolver, policy)
    }

    fn new_user(name: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            secretariat: Some(Secretariat::Health),
            role,
            credential: "s3cret!".into(),
        }
    }

    fn bootstrap(store: &InMemoryStore, role: Role) -> Uuid {
        bootstrap_named(store, role, &format!("{}@city.gov", role.as_str()))
    }

    fn bootstrap_named(store: &InMemoryStore, role: Role, email: &str) -> Uuid {
        let now = Utc::now();
        store
            .insert_user(User {
                id: Uuid::new_v4(),
                name: format!("{role} account"),
                email: email.to_string(),
                secretariat: None,
                role,
                active: true,
                credential_hash: String::new(),
                created_at: now,
                updated_at: now,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_admin_manages_users() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let admin_id = bootstrap(&store, Role::Admin);
        let admin = console(&store, &resolver);

        let user = admin
            .create_user(admin_id, new_user("Ana", "ana@city.gov", Role::Operator))
            .unwrap();
        let off = admin.set_user_active(admin_id, user.id, false).unwrap();
        assert!(!off.active);
        admin.reset_credential(admin_id, user.id, "another1").unwrap();

        let log = admin.recent_activity(admin_id, 10).unwrap();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|e| e.actor == admin_id));
    }

    #[test]
    fn test_read_only_role_cannot_mutate() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let secretary_id = bootstrap(&store, Role::Secretary);
        let admin = console(&store, &resolver);

        assert_eq!(admin.list_users(secretary_id).unwrap().len(), 1);
        let err = admin
            .create_user(secretary_id, new_user("Ana", "ana@city.gov", Role::Operator))
            .unwrap_err();
        assert!(matches!(err, CoreError::AccessDenied { .. }));
        assert_eq!(store.get_users().unwrap().len(), 1);
        // No read access to the activity log at all.
        assert!(matches!(
            admin.recent_activity(secretary_id, 5),
            Err(CoreError::AccessDenied { .. })
        ));
    }

    #[test]
    fn test_deactivated_actor_is_refused_immediately() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let root_id = bootstrap(&store, Role::SuperAdmin);
        let admin_id = bootstrap(&store, Role::Admin);
        let admin = console(&store, &resolver);

        admin.set_user_active(root_id, admin_id, false).unwrap();
        assert!(matches!(
            admin.list_users(admin_id),
            Err(CoreError::InactiveUser(id)) if id == admin_id
        ));
    }

    #[test]
    fn test_unknown_actor_is_not_found() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let admin = console(&store, &resolver);
        assert!(matches!(
            admin.list_users(Uuid::new_v4()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_permissions_view() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let admin_id = bootstrap(&store, Role::Admin);
        let admin = console(&store, &resolver);

        let row = admin.permissions_for_role(admin_id, Role::Citizen).unwrap();
        let tracking = row
            .iter()
            .find(|(r, _)| r.id.as_str() == "protocols.tracking")
            .map(|(_, level)| *level);
        assert_eq!(tracking, Some(AccessLevel::ReadOnly));
        assert!(row
            .iter()
            .filter(|(r, _)| r.module == "health")
            .all(|(_, level)| *level == AccessLevel::Denied));
    }

    #[test]
    fn test_only_super_admin_creates_super_admin() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let root_id = bootstrap(&store, Role::SuperAdmin);
        let admin_id = bootstrap(&store, Role::Admin);
        let admin = console(&store, &resolver);

        let err = admin
            .create_user(admin_id, new_user("Eve", "eve@city.gov", Role::SuperAdmin))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::AccessDenied { role: Role::Admin, action: Action::Create, .. }
        ));
        assert_eq!(store.get_users().unwrap().len(), 2);
        assert!(store.activity_log().entries().is_empty());

        let second_root = admin
            .create_user(root_id, new_user("Rui", "rui@city.gov", Role::SuperAdmin))
            .unwrap();
        assert_eq!(second_root.role, Role::SuperAdmin);
    }

    #[test]
    fn test_admin_cannot_change_super_admin_account() {
        let store = InMemoryStore::new();
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let root_id = bootstrap(&store, Role::SuperAdmin);
        let other_root = bootstrap_named(&store, Role::SuperAdmin, "root2@city.gov");
        let admin_id = bootstrap(&store, Role::Admin);
        let admin = console(&store, &resolver);

        assert!(matches!(
            admin.set_user_active(admin_id, root_id, false),
            Err(CoreError::AccessDenied { action: Action::Edit, .. })
        ));
        assert!(matches!(
            admin.reset_credential(admin_id, root_id, "taken0ver"),
            Err(CoreError::AccessDenied { action: Action::ManageUsers, .. })
        ));
        assert!(store.get_user(root_id).unwrap().unwrap().active);
        assert!(store.activity_log().entries().is_empty());

        // Another super_admin may.
        let off = admin.set_user_active(other_root, root_id, false).unwrap();
        assert!(!off.active);
        // Admins still manage ordinary accounts.
        let operator = admin
            .create_user(admin_id, new_user("Ana", "ana@city.gov", Role::Operator))
            .unwrap();
        assert!(!admin.set_user_active(admin_id, operator.id, false).unwrap().active);
    }
}
