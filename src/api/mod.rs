//! HTTP routes

pub mod health;
pub mod plants;
pub mod ui;

pub use health::health_routes;
pub use plants::plant_routes;
pub use ui::ui_routes;
