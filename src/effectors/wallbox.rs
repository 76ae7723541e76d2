use crate::effectors::{EffectContext, EffectFuture, Effector};
use crate::models::telemetry::WallboxStatus;
use crate::services::interpreter::RenderState;

const FILL_IDLE: &str = "#444";
const FILL_SOLAR: &str = "#4c0";
const FILL_MIXED: &str = "#ee4";

/// Wallbox icon with car, plug and charge mode colour.
pub struct WallboxEffector {
    ctx: EffectContext,
}

impl WallboxEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }
}

impl Effector for WallboxEffector {
    fn name(&self) -> &'static str {
        "wallbox"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.wallbox || state.changes.flows
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(async move {
            let power = state.flows.wallbox;
            // the label keeps its last reading while the car is not drawing
            let label = (power > 0.0).then(|| self.ctx.locale().format_power(power));
            let status = state.wallbox;
            self.ctx.update(|scene| {
                let wallbox = &mut scene.wallbox;
                if let Some(label) = label {
                    wallbox.label = label;
                }
                match status {
                    WallboxStatus::Absent => {
                        wallbox.visible = false;
                        wallbox.car = false;
                        wallbox.plug_at_box = false;
                        wallbox.label_visible = false;
                    }
                    WallboxStatus::Ready => {
                        wallbox.visible = true;
                        wallbox.car = false;
                        wallbox.plug_at_box = true;
                        wallbox.label_visible = false;
                        wallbox.fill = FILL_IDLE.to_owned();
                    }
                    WallboxStatus::Connected { charging, solar_only } => {
                        wallbox.visible = true;
                        wallbox.car = true;
                        wallbox.plug_at_box = false;
                        wallbox.label_visible = true;
                        wallbox.fill = match (charging, solar_only) {
                            (false, _) => FILL_IDLE,
                            (true, true) => FILL_SOLAR,
                            (true, false) => FILL_MIXED,
                        }
                        .to_owned();
                    }
                }
            })
        })
    }
}
