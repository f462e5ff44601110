//! Entity store boundary and the in-memory implementation used for
//! development and tests.
//!
//! The store owns per-record mutation discipline: `update_user` and
//! `set_user_active` hold the user's shard lock for the whole
//! read-modify-write, and email uniqueness is claimed atomically on insert.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use civic_core::error::{CoreError, CoreResult};
use civic_core::tenancy::{RevenuePoint, Subscription, Tenant, TenantFilter};
use civic_core::types::{ActivityLogEntry, User, UserUpdate};

use crate::audit::ActivityLog;

/// Read/write operations the platform needs from persistence.
pub trait EntityStore: Send + Sync {
    fn get_users(&self) -> CoreResult<Vec<User>>;
    fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;
    /// Case-insensitive lookup.
    fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;
    /// Fails with `Conflict` when the email is taken.
    fn insert_user(&self, user: User) -> CoreResult<User>;
    /// Fails with `NotFound` for an unknown id.
    fn update_user(&self, id: Uuid, update: UserUpdate) -> CoreResult<User>;
    /// Set the active flag and append the entry built by `log` without
    /// releasing the user's lock in between, so the log records transitions
    /// in the order they were applied. `log` sees the user after the change
    /// and the previous flag value. `NotFound` for an unknown id.
    fn set_user_active(
        &self,
        id: Uuid,
        active: bool,
        log: &dyn Fn(&User, bool) -> ActivityLogEntry,
    ) -> CoreResult<(User, ActivityLogEntry)>;
    fn append_activity_log(&self, entry: ActivityLogEntry) -> CoreResult<ActivityLogEntry>;
    /// Entries in append order.
    fn get_activity_log(&self) -> CoreResult<Vec<ActivityLogEntry>>;
    fn get_tenants(&self, filter: Option<&TenantFilter>) -> CoreResult<Vec<Tenant>>;
    fn get_subscriptions(&self, tenant_ids: Option<&[Uuid]>) -> CoreResult<Vec<Subscription>>;
    /// Up to `months_back` most recent points, oldest first.
    fn get_revenue_history(&self, months_back: usize) -> CoreResult<Vec<RevenuePoint>>;
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// In-memory entity store backed by `DashMap`.
pub struct InMemoryStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    activity: ActivityLog,
    tenants: DashMap<Uuid, Tenant>,
    subscriptions: DashMap<Uuid, Subscription>,
    revenue: RwLock<Vec<RevenuePoint>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            activity: ActivityLog::new(),
            tenants: DashMap::new(),
            subscriptions: DashMap::new(),
            revenue: RwLock::new(Vec::new()),
        }
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn upsert_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.id, tenant);
    }

    /// Replace the tenant's subscription (one per tenant).
    pub fn upsert_subscription(&self, subscription: Subscription) {
        self.subscriptions.insert(subscription.tenant_id, subscription);
    }

    /// Insert or replace the point for its month.
    pub fn record_revenue(&self, point: RevenuePoint) {
        let mut revenue = self.revenue.write();
        match revenue.iter_mut().find(|p| p.month == point.month) {
            Some(existing) => *existing = point,
            None => revenue.push(point),
        }
    }

    /// Load a tenant/subscription/revenue snapshot in one call.
    pub fn load_snapshot(
        &self,
        tenants: Vec<Tenant>,
        subscriptions: Vec<Subscription>,
        revenue: Vec<RevenuePoint>,
    ) {
        let counts = (tenants.len(), subscriptions.len(), revenue.len());
        tenants.into_iter().for_each(|t| self.upsert_tenant(t));
        subscriptions
            .into_iter()
            .for_each(|s| self.upsert_subscription(s));
        revenue.into_iter().for_each(|p| self.record_revenue(p));
        info!(
            tenants = counts.0,
            subscriptions = counts.1,
            revenue_points = counts.2,
            "Snapshot loaded"
        );
    }
}

impl EntityStore for InMemoryStore {
    fn get_users(&self) -> CoreResult<Vec<User>> {
        Ok(self.users.iter().map(|e| e.value().clone()).collect())
    }

    fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|e| e.value().clone()))
    }

    fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let id = match self.emails.get(&email_key(email)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get_user(id)
    }

    fn insert_user(&self, user: User) -> CoreResult<User> {
        match self.emails.entry(email_key(&user.email)) {
            Entry::Occupied(_) => Err(CoreError::Conflict(format!(
                "email `{}` is already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    fn update_user(&self, id: Uuid, update: UserUpdate) -> CoreResult<User> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))?;
        if let Some(active) = update.active {
            entry.active = active;
        }
        if let Some(hash) = update.credential_hash {
            entry.credential_hash = hash;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn set_user_active(
        &self,
        id: Uuid,
        active: bool,
        log: &dyn Fn(&User, bool) -> ActivityLogEntry,
    ) -> CoreResult<(User, ActivityLogEntry)> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))?;
        let previous = entry.active;
        if previous != active {
            entry.active = active;
            entry.updated_at = Utc::now();
        }
        // Lock order is always user shard, then activity log.
        let logged = self.activity.append(log(entry.value(), previous));
        Ok((entry.clone(), logged))
    }

    fn append_activity_log(&self, entry: ActivityLogEntry) -> CoreResult<ActivityLogEntry> {
        Ok(self.activity.append(entry))
    }

    fn get_activity_log(&self) -> CoreResult<Vec<ActivityLogEntry>> {
        Ok(self.activity.entries())
    }

    fn get_tenants(&self, filter: Option<&TenantFilter>) -> CoreResult<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self
            .tenants
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(e.value())))
            .map(|e| e.value().clone())
            .collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tenants)
    }

    fn get_subscriptions(&self, tenant_ids: Option<&[Uuid]>) -> CoreResult<Vec<Subscription>> {
        Ok(match tenant_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.subscriptions.get(id).map(|e| e.value().clone()))
                .collect(),
            None => self
                .subscriptions
                .iter()
                .map(|e| e.value().clone())
                .collect(),
        })
    }

    fn get_revenue_history(&self, months_back: usize) -> CoreResult<Vec<RevenuePoint>> {
        let mut points = self.revenue.read().clone();
        points.sort_by(|a, b| a.month.cmp(&b.month));
        let skip = points.len().saturating_sub(months_back);
        Ok(points.split_off(skip))
    }
}
