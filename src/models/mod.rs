pub mod batch;
pub mod courier;
pub mod emergency;
pub mod escalation;
pub mod order;
pub mod override_log;
pub mod tracking;
