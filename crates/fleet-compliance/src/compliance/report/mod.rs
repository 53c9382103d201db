mod audit;
mod summary;
pub mod views;

pub use audit::vehicle_audit;
pub use summary::{aggregate, fleet_health_pct, monitored_vehicle_count, record_statuses};
