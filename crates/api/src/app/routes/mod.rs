use axum::{Router, routing::get};

pub mod appointments;
pub mod attendance;
pub mod auth;
pub mod catalog;
pub mod common;
pub mod customers;
pub mod finance;
pub mod inventory;
pub mod payroll;
pub mod points;
pub mod settings;
pub mod staff;
pub mod system;
pub mod vouchers;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/customers", customers::router())
        .nest("/services", catalog::router())
        .nest("/appointments", appointments::router())
        .nest("/staff", staff::router())
        .nest("/attendance", attendance::router())
        .nest("/payroll", payroll::router())
        .nest("/inventory", inventory::router())
        .nest("/vouchers", vouchers::router())
        .nest("/points", points::router())
        .nest("/finance", finance::router())
        .nest("/settings", settings::router())
}
