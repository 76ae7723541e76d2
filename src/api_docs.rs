use utoipa::OpenApi;
use crate::controllers::dashboard_controller;
use crate::models::{scene, status, telemetry};
use crate::services::interpreter;
use crate::services::solar_envelope;

#[derive(OpenApi)]
#[openapi(
    paths(
        dashboard_controller::get_scene,
        dashboard_controller::get_status,
        dashboard_controller::get_locale
    ),
    components(
        schemas(
            scene::Scene,
            scene::Transition,
            scene::TransitionKind,
            status::SchedulerStatus,
            telemetry::Sample,
            telemetry::Flows,
            telemetry::Background,
            interpreter::Changes,
            solar_envelope::SolarEnvelope
        )
    ),
    tags(
        (name = "powerflow-display", description = "Live power flow dashboard API")
    )
)]
pub struct ApiDoc;
