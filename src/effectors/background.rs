use crate::effectors::{EffectContext, EffectFuture, Effector};
use crate::services::interpreter::RenderState;

/// Page tint after the dominant source supplying the household.
pub struct BackgroundEffector {
    ctx: EffectContext,
}

impl BackgroundEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }
}

impl Effector for BackgroundEffector {
    fn name(&self) -> &'static str {
        "background"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.background && !self.ctx.motion.disabled
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(async move {
            let background = state.background;
            self.ctx.update(|scene| scene.background = background)
        })
    }
}
