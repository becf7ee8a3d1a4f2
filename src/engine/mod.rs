pub mod batch;
pub mod capacity;
pub mod emergency;
pub mod escalation;
pub mod geofence;
pub mod overrides;
pub mod route;
pub mod sla;
