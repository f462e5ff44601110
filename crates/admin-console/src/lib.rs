//! Admin console for the municipal platform: the composition layer the
//! presentation shell calls into. Combines the entity store, access control
//! and the metrics engine.
//!
//! # Modules
//!
//! - [`user_admin`]: guarded user administration (create, activate, reset, search)
//! - [`provider_dashboard`]: cross-tenant SaaS dashboard and tenant table

pub mod provider_dashboard;
pub mod user_admin;

pub use provider_dashboard::{DashboardReport, ProviderDashboard, TenantRow};
pub use user_admin::UserAdmin;
