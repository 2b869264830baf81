//! Routers segregated by access level. Each one is mounted under `/api/v1` by
//! [`crate::create_router`], which decides what middleware wraps it.

/// Anonymous routes: authentication and read-only catalogue access.
pub mod public;

/// Routes open to any authenticated user, whatever the role.
pub mod authenticated;

/// Management routes for admins and sub-admins. Each handler names the roles
/// it accepts through the Role Guard.
pub mod admin;
