/// Router Module Index
///
/// Routes are split by the guard that protects them, so a route's access level
/// is decided by which module registers it rather than by each handler alone.
/// All three routers are nested under `/api` by [`crate::create_router`].

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the `require_identity` layer (any valid token).
/// Self and ownership checks run inside the handlers.
pub mod authenticated;

/// Routes behind the `require_admin` layer.
pub mod admin;
