use crate::effectors::{EffectContext, EffectFuture, Effector};
use crate::models::scene::percent_hue;
use crate::services::interpreter::RenderState;

/// Autarky and self-consumption percentages.
pub struct RatioEffector {
    ctx: EffectContext,
}

impl RatioEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }
}

impl Effector for RatioEffector {
    fn name(&self) -> &'static str {
        "ratios"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.autarky || state.changes.self_consumption
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(async move {
            let changes = state.changes;
            let autarky = state.sample.autarky;
            let own = state.sample.self_consumption;
            self.ctx.update(|scene| {
                if changes.autarky {
                    scene.ratios.autarky_text = format!("{autarky}%");
                    scene.ratios.autarky_hue = percent_hue(autarky);
                }
                if changes.self_consumption {
                    scene.ratios.self_consumption_text = format!("{own}%");
                    scene.ratios.self_consumption_hue = percent_hue(own);
                }
            })
        })
    }
}
