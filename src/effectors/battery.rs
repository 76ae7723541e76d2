use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{percent_hue, TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// Fill level, colour and SOC label of the battery gauge.
pub struct BatteryGaugeEffector {
    ctx: EffectContext,
}

impl BatteryGaugeEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }
}

impl Effector for BatteryGaugeEffector {
    fn name(&self) -> &'static str {
        "battery-gauge"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.soc
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(async move {
            let soc = state.sample.soc;
            let label = format!("{}{}%", self.ctx.locale().get(keys::SOC), soc);
            self.ctx.update(|scene| {
                scene.battery.soc = Some(soc);
                scene.battery.fill_hue = percent_hue(soc);
                scene.battery.remaining = 100.0 - soc;
                scene.battery.label = label;
            })
        })
    }
}

/// Drop falling into the battery while charging, bubble rising while discharging.
pub struct BatteryFlowEffector {
    ctx: EffectContext,
}

impl BatteryFlowEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        let flows = &state.flows;
        if flows.battery_charge > thresholds::BATTERY_IN {
            let scale = if self.ctx.motion.slow {
                1.0
            } else {
                0.5 + thresholds::SCALE * self.ctx.power_share(flows.battery_charge)
            };
            self.ctx.play(TransitionSlot::Battery, TransitionKind::ChargeDrop, scale).await
        } else if flows.battery_discharge > thresholds::BATTERY_OUT {
            let scale = if self.ctx.motion.slow {
                1.0
            } else {
                0.5 + thresholds::SCALE * self.ctx.power_share(flows.battery_discharge)
            };
            self.ctx.play(TransitionSlot::Battery, TransitionKind::DischargeBubble, scale).await
        } else {
            Ok(())
        }
    }
}

impl Effector for BatteryFlowEffector {
    fn name(&self) -> &'static str {
        "battery-flow"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        !self.ctx.motion.disabled
            && (state.flows.battery_charge > thresholds::BATTERY_IN
                || state.flows.battery_discharge > thresholds::BATTERY_OUT)
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
    }
}
