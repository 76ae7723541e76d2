pub mod interpreter;
pub mod locale;
pub mod scheduler;
pub mod solar_envelope;
pub mod telemetry_service;
