use crate::effectors::{EffectContext, EffectFuture, Effector};
use crate::services::interpreter::RenderState;

/// Additional external generator feeding the house.
pub struct ExternalSourceEffector {
    ctx: EffectContext,
}

impl ExternalSourceEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }
}

impl Effector for ExternalSourceEffector {
    fn name(&self) -> &'static str {
        "external"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.flows
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(async move {
            let power = state.flows.external;
            let label = if power > 0.0 { self.ctx.locale().format_power(power) } else { String::new() };
            self.ctx.update(|scene| {
                scene.external.visible = power > 0.0;
                scene.external.label = label;
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effectors::Motion;
    use crate::effectors::test_support::{context, scene};
    use crate::models::telemetry::Sample;
    use crate::services::interpreter::tests::{day_envelope, quiet_sample};
    use crate::services::interpreter::{interpret, AppliedCache};

    #[tokio::test]
    async fn test_supplying_source_is_shown() {
        let ctx = context(Motion::default());
        let effector = ExternalSourceEffector::new(ctx.clone());
        let supplying = Sample { external_power: -400.0, ..quiet_sample() };
        effector.apply(&interpret(&supplying, &day_envelope(), &AppliedCache::default())).await.unwrap();
        let shown = scene(&ctx).external;
        assert!(shown.visible);
        assert_eq!(shown.label, "400 W");

        let drawing = Sample { external_power: 50.0, ..quiet_sample() };
        effector.apply(&interpret(&drawing, &day_envelope(), &AppliedCache::default())).await.unwrap();
        let shown = scene(&ctx).external;
        assert!(!shown.visible);
        assert!(shown.label.is_empty());
    }
}
