use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// Household: consumption label, lit window and chimney smoke.
pub struct HomeEffector {
    ctx: EffectContext,
}

impl HomeEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }

    fn consumption(state: &RenderState) -> f64 {
        if state.flows.home > thresholds::HOME { state.flows.home } else { 0.0 }
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        let consumption = Self::consumption(state);
        let label = self.ctx.locale().power_label(keys::CONSUMPTION, consumption);
        self.ctx.update(|scene| {
            scene.home.label = label;
            scene.home.window_lit = consumption > 0.0;
        })?;
        if consumption > 0.0 && self.ctx.motion.full() {
            self.ctx.play(TransitionSlot::Home, TransitionKind::Smoke, 1.0).await?;
        }
        Ok(())
    }
}

impl Effector for HomeEffector {
    fn name(&self) -> &'static str {
        "home"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.flows || (Self::consumption(state) > 0.0 && self.ctx.motion.full())
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
    }
}
