//! Static resource registry and the built-in municipal access matrix.

use std::collections::BTreeMap;

use civic_core::error::{CoreError, CoreResult};
use civic_core::types::AccessLevel::{self, ReadOnly, Total};
use civic_core::types::{AccessRule, Resource, ResourceId, Role};

/// The set of protected resources known to the platform, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(resources: Vec<Resource>) -> CoreResult<Self> {
        let mut map = BTreeMap::new();
        for resource in resources {
            let id = resource.id.clone();
            if map.insert(id.clone(), resource).is_some() {
                return Err(CoreError::Validation(format!(
                    "resource `{id}` is registered twice"
                )));
            }
        }
        Ok(Self { resources: map })
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Distinct module names, sorted.
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.resources.values().map(|r| r.module.clone()).collect();
        modules.sort();
        modules.dedup();
        modules
    }

    pub fn by_module(&self, module: &str) -> Vec<Resource> {
        self.resources
            .values()
            .filter(|r| r.module == module)
            .cloned()
            .collect()
    }
}

const MUNICIPAL_RESOURCES: &[(&str, &str)] = &[
    ("dashboard.overview", "Overview"),
    ("users.management", "User Management"),
    ("users.activity_log", "Activity Log"),
    ("health.medications", "Medications"),
    ("health.appointments", "Appointments"),
    ("health.units", "Health Units"),
    ("education.schools", "Schools"),
    ("education.enrollments", "Enrollments"),
    ("finance.budget", "Budget"),
    ("finance.payments", "Payments"),
    ("protocols.requests", "Protocol Requests"),
    ("protocols.tracking", "Protocol Tracking"),
    ("reports.analytics", "Analytics Reports"),
    ("settings.system", "System Settings"),
    ("settings.access_control", "Access Control"),
];

/// Registry for the standard municipal deployment.
pub fn municipal_resources() -> Vec<Resource> {
    MUNICIPAL_RESOURCES
        .iter()
        .filter_map(|(id, name)| {
            ResourceId::parse(id).ok().map(|id| Resource {
                module: id.module().to_string(),
                id,
                name: (*name).to_string(),
            })
        })
        .collect()
}

// Unlisted (role, resource) pairs are denied. super_admin never appears here.
const MUNICIPAL_RULES: &[(Role, &str, AccessLevel)] = &[
    (Role::Admin, "dashboard.overview", Total),
    (Role::Admin, "users.management", Total),
    (Role::Admin, "users.activity_log", Total),
    (Role::Admin, "health.medications", Total),
    (Role::Admin, "health.appointments", Total),
    (Role::Admin, "health.units", Total),
    (Role::Admin, "education.schools", Total),
    (Role::Admin, "education.enrollments", Total),
    (Role::Admin, "finance.budget", Total),
    (Role::Admin, "finance.payments", Total),
    (Role::Admin, "protocols.requests", Total),
    (Role::Admin, "protocols.tracking", Total),
    (Role::Admin, "reports.analytics", Total),
    (Role::Admin, "settings.system", ReadOnly),
    (Role::Admin, "settings.access_control", Total),
    (Role::Secretary, "dashboard.overview", ReadOnly),
    (Role::Secretary, "users.management", ReadOnly),
    (Role::Secretary, "health.medications", Total),
    (Role::Secretary, "health.appointments", Total),
    (Role::Secretary, "health.units", Total),
    (Role::Secretary, "education.schools", Total),
    (Role::Secretary, "education.enrollments", Total),
    (Role::Secretary, "finance.budget", Total),
    (Role::Secretary, "finance.payments", ReadOnly),
    (Role::Secretary, "protocols.requests", Total),
    (Role::Secretary, "protocols.tracking", Total),
    (Role::Secretary, "reports.analytics", ReadOnly),
    (Role::Director, "dashboard.overview", ReadOnly),
    (Role::Director, "health.medications", Total),
    (Role::Director, "health.appointments", Total),
    (Role::Director, "health.units", ReadOnly),
    (Role::Director, "education.schools", Total),
    (Role::Director, "education.enrollments", Total),
    (Role::Director, "finance.budget", ReadOnly),
    (Role::Director, "protocols.requests", Total),
    (Role::Director, "protocols.tracking", Total),
    (Role::Director, "reports.analytics", ReadOnly),
    (Role::Manager, "dashboard.overview", ReadOnly),
    (Role::Manager, "health.medications", Total),
    (Role::Manager, "health.appointments", Total),
    (Role::Manager, "health.units", ReadOnly),
    (Role::Manager, "education.schools", ReadOnly),
    (Role::Manager, "education.enrollments", Total),
    (Role::Manager, "protocols.requests", Total),
    (Role::Manager, "protocols.tracking", ReadOnly),
    (Role::Manager, "reports.analytics", ReadOnly),
    (Role::Operator, "dashboard.overview", ReadOnly),
    (Role::Operator, "health.medications", ReadOnly),
    (Role::Operator, "health.appointments", Total),
    (Role::Operator, "education.enrollments", ReadOnly),
    (Role::Operator, "protocols.requests", Total),
    (Role::Operator, "protocols.tracking", ReadOnly),
    (Role::Citizen, "protocols.requests", Total),
    (Role::Citizen, "protocols.tracking", ReadOnly),
];

/// Base rule table for the standard municipal deployment.
pub fn municipal_rules() -> Vec<AccessRule> {
    MUNICIPAL_RULES
        .iter()
        .filter_map(|(role, id, access)| {
            ResourceId::parse(id).ok().map(|resource| AccessRule {
                role: *role,
                resource,
                access: *access,
            })
        })
        .collect()
}
