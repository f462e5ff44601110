//! Session-time authorization: the resolver is role-scoped only, so every
//! production check goes through [`AccessGuard`], which refuses inactive
//! users before consulting the matrix.

use tracing::warn;

use civic_core::error::{CoreError, CoreResult};
use civic_core::types::{AccessLevel, Action, User};

use crate::rbac::AccessResolver;

pub struct AccessGuard<'a> {
    resolver: &'a AccessResolver,
}

impl<'a> AccessGuard<'a> {
    pub fn new(resolver: &'a AccessResolver) -> Self {
        Self { resolver }
    }

    /// Authorize `user` to perform `action` on `resource_id`.
    ///
    /// Inactive users are refused regardless of role, super_admin included.
    pub fn authorize(
        &self,
        user: &User,
        resource_id: &str,
        action: Action,
    ) -> CoreResult<AccessLevel> {
        if !user.active {
            warn!(user_id = %user.id, resource = resource_id, "Inactive user refused");
            return Err(CoreError::InactiveUser(user.id));
        }
        let level = self.resolver.resolve(user.role, resource_id)?;
        if !level.permits(action) {
            warn!(
                user_id = %user.id,
                role = %user.role,
                resource = resource_id,
                action = %action,
                "Access denied"
            );
            return Err(CoreError::AccessDenied {
                role: user.role,
                resource: resource_id.to_string(),
                action,
                level,
            });
        }
        Ok(level)
    }

    /// Boolean form of [`authorize`](Self::authorize); caller errors still
    /// propagate.
    pub fn is_allowed(&self, user: &User, resource_id: &str, action: Action) -> CoreResult<bool> {
        match self.authorize(user, resource_id, action) {
            Ok(_) => Ok(true),
            Err(CoreError::InactiveUser(_)) | Err(CoreError::AccessDenied { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::AccessMatrix;
    use chrono::Utc;
    use civic_core::types::Role;
    use uuid::Uuid;

    fn user(role: Role, active: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Guarded".into(),
            email: "guarded@city.gov".into(),
            secretariat: None,
            role,
            active,
            credential_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_user_uses_matrix() {
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let guard = AccessGuard::new(&resolver);
        let operator = user(Role::Operator, true);

        assert_eq!(
            guard.authorize(&operator, "health.medications", Action::View).unwrap(),
            AccessLevel::ReadOnly
        );
        let err = guard
            .authorize(&operator, "health.medications", Action::Edit)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::AccessDenied {
                level: AccessLevel::ReadOnly,
                ..
            }
        ));
    }

    #[test]
    fn test_inactive_user_refused_even_as_super_admin() {
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let guard = AccessGuard::new(&resolver);
        let root = user(Role::SuperAdmin, false);

        assert!(matches!(
            guard.authorize(&root, "settings.system", Action::View),
            Err(CoreError::InactiveUser(_))
        ));
        assert!(!guard.is_allowed(&root, "settings.system", Action::View).unwrap());
    }

    #[test]
    fn test_malformed_resource_propagates() {
        let resolver = AccessResolver::new(AccessMatrix::municipal_default().unwrap());
        let guard = AccessGuard::new(&resolver);
        let admin = user(Role::Admin, true);
        assert!(matches!(
            guard.is_allowed(&admin, "bad id", Action::View),
            Err(CoreError::Validation(_))
        ));
    }
}
