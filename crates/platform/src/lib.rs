//! Platform services: role/resource access control, user lifecycle,
//! activity logging and the entity store boundary.

pub mod audit;
pub mod credentials;
pub mod guard;
pub mod rbac;
pub mod resources;
pub mod store;
pub mod users;

pub use audit::ActivityLog;
pub use guard::AccessGuard;
pub use rbac::{AccessMatrix, AccessResolver};
pub use resources::ResourceRegistry;
pub use store::{EntityStore, InMemoryStore};
pub use users::{NewUser, UserManager, UserSearch, UserStats};
