use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// Power line icon: label plus sparks towards the house (import) or away from it (export).
pub struct GridEffector {
    ctx: EffectContext,
}

impl GridEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }

    /// Sparks run unless animations are off or the export is only battery or
    /// household noise without any PV generation.
    fn animates(&self, state: &RenderState) -> bool {
        let grid = state.sample.grid_power;
        let pv_generating = state.flows.pv > thresholds::PV;
        !self.ctx.motion.disabled && (pv_generating || grid >= 0.0) && grid.abs() > thresholds::GRID
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        let grid = state.sample.grid_power;
        let magnitude = grid.abs();
        let pv_generating = state.flows.pv > thresholds::PV;
        let label = if magnitude > thresholds::GRID && (pv_generating || grid > 0.0) {
            self.ctx.locale().power_label(keys::GRID_POWER, magnitude)
        } else {
            String::new()
        };
        let animates = self.animates(state);
        self.ctx.update(|scene| {
            scene.grid.label = label;
            if animates {
                scene.grid.sparks_towards = grid > thresholds::GRID;
                scene.grid.sparks_away = grid < -thresholds::GRID;
            }
        })?;
        if !animates {
            return Ok(());
        }

        let scale = 0.5 + 0.5 * thresholds::SCALE * self.ctx.power_share(magnitude);
        self.ctx.play(TransitionSlot::Grid, TransitionKind::GridSparks, scale).await?;
        self.ctx.update(|scene| {
            scene.grid.sparks_towards = false;
            scene.grid.sparks_away = false;
        })
    }
}

impl Effector for GridEffector {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.flows || self.animates(state)
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
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
    use std::time::Duration;

    fn state(sample: Sample) -> RenderState {
        interpret(&sample, &day_envelope(), &AppliedCache::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_sparks_towards_house() {
        let ctx = context(Motion::default());
        let grid = GridEffector::new(ctx.clone());
        let st = state(Sample { grid_power: 1200.0, home_power: 1200.0, ..quiet_sample() });
        let play = grid.apply(&st);
        tokio::pin!(play);
        tokio::select! {
            _ = &mut play => panic!("finished too early"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        let shown = scene(&ctx).grid;
        assert_eq!(shown.label, "Netz: 1200 W");
        assert!(shown.sparks_towards && !shown.sparks_away);
        assert_eq!(shown.transition.map(|t| t.kind), Some(TransitionKind::GridSparks));

        play.await.unwrap();
        let done = scene(&ctx).grid;
        assert!(!done.sparks_towards && done.transition.is_none());
        assert_eq!(done.label, "Netz: 1200 W");
    }

    #[tokio::test]
    async fn test_export_without_pv_stays_quiet() {
        let ctx = context(Motion::default());
        let grid = GridEffector::new(ctx.clone());
        let st = state(Sample { grid_power: -300.0, battery_power: -300.0, ..quiet_sample() });
        assert!(!grid.animates(&st));
        grid.apply(&st).await.unwrap();
        let shown = scene(&ctx).grid;
        assert!(shown.label.is_empty());
        assert!(!shown.sparks_away);
        assert!(shown.transition.is_none());
    }

    #[test]
    fn test_export_with_pv_animates() {
        let grid = GridEffector::new(context(Motion::default()));
        let st = state(Sample { pv_power: 2000.0, grid_power: -500.0, home_power: 1500.0, ..quiet_sample() });
        assert!(grid.animates(&st));

        let still = GridEffector::new(context(Motion { slow: true, disabled: true }));
        assert!(!still.animates(&st));
    }
}
