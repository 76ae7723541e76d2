use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{ArrowId, TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// One flow arrow between two nodes, with its label and travelling spark.
pub struct ArrowEffector {
    id: ArrowId,
    threshold: f64,
    color: &'static str,
    label_key: &'static str,
    ctx: EffectContext,
}

impl ArrowEffector {
    pub fn new(id: ArrowId, ctx: EffectContext) -> Self {
        let (threshold, color, label_key) = match id {
            ArrowId::PvToGrid => (thresholds::GRID, "#fd5", keys::GRID_IN),
            ArrowId::PvToBattery => (thresholds::BATTERY_IN, "#18f", keys::BATTERY_IN),
            ArrowId::PvToHome => (thresholds::HOME_DIRECT, "#1a2", keys::DIRECT),
            ArrowId::GridToHome => (thresholds::GRID, "#777", keys::GRID_OUT),
            ArrowId::BatteryToHome => (thresholds::BATTERY_OUT, "#18f", keys::BATTERY_OUT),
        };
        Self { id, threshold, color, label_key, ctx }
    }

    pub fn all(ctx: &EffectContext) -> impl Iterator<Item = Self> + '_ {
        ArrowId::ALL.into_iter().map(|id| Self::new(id, ctx.clone()))
    }

    /// Power carried along this arrow.
    fn power(&self, state: &RenderState) -> f64 {
        let flows = &state.flows;
        match self.id {
            // nothing is exported from PV at night, whatever the meter says
            ArrowId::PvToGrid if state.is_night() => 0.0,
            ArrowId::PvToGrid => flows.grid_export,
            ArrowId::PvToBattery => flows.battery_charge,
            ArrowId::PvToHome => flows.direct_consumption,
            ArrowId::GridToHome => flows.grid_import,
            ArrowId::BatteryToHome => flows.battery_discharge,
        }
    }

    fn active(&self, state: &RenderState) -> bool {
        self.power(state) > self.threshold
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        let power = self.power(state);
        let visible = power > self.threshold;
        // below the threshold the arrow reads zero
        let power = if visible { power } else { 0.0 };
        let label = self.ctx.locale().power_label(self.label_key, power);
        self.ctx.update(|scene| {
            let arrow = scene.arrows.get_mut(self.id);
            arrow.visible = visible;
            arrow.sparkle_color = self.color.to_owned();
            arrow.label = label;
        })?;

        if visible && !self.ctx.motion.disabled {
            let scale = self.ctx.spark_scale(power);
            self.ctx.play(TransitionSlot::Arrow(self.id), TransitionKind::Spark, scale).await?;
        }
        Ok(())
    }
}

impl Effector for ArrowEffector {
    fn name(&self) -> &'static str {
        match self.id {
            ArrowId::PvToGrid => "arrow-pv-grid",
            ArrowId::PvToBattery => "arrow-pv-battery",
            ArrowId::PvToHome => "arrow-pv-home",
            ArrowId::GridToHome => "arrow-grid-home",
            ArrowId::BatteryToHome => "arrow-battery-home",
        }
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.flows || state.changes.night || (self.active(state) && !self.ctx.motion.disabled)
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
    }
}
