pub mod scene;
pub mod status;
pub mod telemetry;
