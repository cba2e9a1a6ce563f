pub mod assignments;

pub mod auth;

pub mod stats;

pub mod system;

pub mod users;

pub mod webauthn;

pub use assignments::configure_assignment_routes;
pub use auth::configure_auth_routes;
pub use stats::configure_stats_routes;
pub use system::configure_system_routes;
pub use users::configure_user_routes;
pub use webauthn::configure_webauthn_routes;
