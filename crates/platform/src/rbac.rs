//! Role × resource access resolution.
//!
//! The matrix is immutable once built. [`AccessResolver`] holds the current
//! matrix behind an [`ArcSwap`]; a reload replaces the whole table with one
//! pointer swap, so a reader sees either the old matrix or the new one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};

use civic_core::config::AccessRulesFile;
use civic_core::error::{CoreError, CoreResult};
use civic_core::types::{AccessLevel, AccessRule, Action, Resource, ResourceId, Role};

use crate::resources::{municipal_resources, municipal_rules, ResourceRegistry};

/// A fully validated role × resource table.
#[derive(Debug, Clone)]
pub struct AccessMatrix {
    version: u64,
    registry: ResourceRegistry,
    rules: HashMap<(Role, ResourceId), AccessLevel>,
}

impl AccessMatrix {
    /// Build a matrix from a registry and its rule rows.
    ///
    /// Rejects duplicate (role, resource) rows, explicit `super_admin` rows
    /// and rows naming resources the registry does not know.
    pub fn build(registry: ResourceRegistry, rules: Vec<AccessRule>) -> CoreResult<Self> {
        let mut table = HashMap::with_capacity(rules.len());
        for rule in rules {
            if rule.role == Role::SuperAdmin {
                return Err(CoreError::Validation(format!(
                    "super_admin cannot carry an explicit rule (resource `{}`)",
                    rule.resource
                )));
            }
            if !registry.contains(&rule.resource) {
                return Err(CoreError::Validation(format!(
                    "rule for `{}` names an unregistered resource `{}`",
                    rule.role, rule.resource
                )));
            }
            let key = (rule.role, rule.resource);
            if table.contains_key(&key) {
                return Err(CoreError::Validation(format!(
                    "duplicate rule for ({}, {})",
                    key.0, key.1
                )));
            }
            table.insert(key, rule.access);
        }
        Ok(Self {
            version: 0,
            registry,
            rules: table,
        })
    }

    /// The built-in municipal registry and rule table.
    pub fn municipal_default() -> CoreResult<Self> {
        Self::build(
            ResourceRegistry::new(municipal_resources())?,
            municipal_rules(),
        )
    }

    pub fn from_rules_file(file: AccessRulesFile) -> CoreResult<Self> {
        Self::build(ResourceRegistry::new(file.resources)?, file.rules)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Resolve the level for a well-formed resource id.
    pub fn level(&self, role: Role, resource: &ResourceId) -> AccessLevel {
        if role == Role::SuperAdmin {
            return AccessLevel::Total;
        }
        if !self.registry.contains(resource) {
            debug!(resource = %resource, "Unknown resource resolved to denied");
            return AccessLevel::Denied;
        }
        self.rules
            .get(&(role, resource.clone()))
            .copied()
            .unwrap_or(AccessLevel::Denied)
    }

    /// Every registered resource with the level `role` holds on it.
    pub fn permissions_for_role(&self, role: Role) -> Vec<(Resource, AccessLevel)> {
        self.registry
            .iter()
            .map(|r| (r.clone(), self.level(role, &r.id)))
            .collect()
    }
}

/// Process-wide resolver over the current access matrix.
pub struct AccessResolver {
    matrix: ArcSwap<AccessMatrix>,
    next_version: AtomicU64,
    reload_lock: Mutex<()>,
}

impl AccessResolver {
    pub fn new(mut matrix: AccessMatrix) -> Self {
        matrix.version = 1;
        info!(
            rules = matrix.rule_count(),
            resources = matrix.registry.len(),
            "Access matrix loaded"
        );
        Self {
            matrix: ArcSwap::from_pointee(matrix),
            next_version: AtomicU64::new(1),
            reload_lock: Mutex::new(()),
        }
    }

    /// Resolve `role`'s access level on `resource_id`.
    ///
    /// A malformed id is a caller error. A well-formed id that is not
    /// registered, or has no rule for `role`, resolves to `Denied`.
    pub fn resolve(&self, role: Role, resource_id: &str) -> CoreResult<AccessLevel> {
        let resource = ResourceId::parse(resource_id)?;
        Ok(self.matrix.load().level(role, &resource))
    }

    /// `view` needs `total` or `read_only`; every other action needs `total`.
    pub fn can_perform(&self, role: Role, resource_id: &str, action: Action) -> CoreResult<bool> {
        Ok(self.resolve(role, resource_id)?.permits(action))
    }

    /// Pin the current matrix so several checks see one consistent version.
    pub fn snapshot(&self) -> Arc<AccessMatrix> {
        self.matrix.load_full()
    }

    pub fn version(&self) -> u64 {
        self.matrix.load().version
    }

    /// Atomically replace the whole matrix. Returns the new version.
    pub fn reload(&self, mut matrix: AccessMatrix) -> u64 {
        let _guard = self.reload_lock.lock();
        let version = self.next_version.fetch_add(1, Ordering::AcqRel) + 1;
        matrix.version = version;
        let rules = matrix.rule_count();
        self.matrix.store(Arc::new(matrix));
        info!(version, rules, "Access matrix reloaded");
        version
    }
}
