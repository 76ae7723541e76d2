use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// Sun, cloud, moon and the tree shadow over the PV strings.
pub struct SkyEffector {
    ctx: EffectContext,
}

impl SkyEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }

    fn beams_play(&self, state: &RenderState) -> bool {
        self.ctx.motion.full()
            && !state.is_night()
            && generating(state) >= state.envelope.estimated_peak_capacity / thresholds::CLOUDY
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        if state.is_night() {
            return self.ctx.update(|scene| {
                scene.sky.moon = true;
                scene.sky.sun = false;
                scene.sky.cloud = false;
                scene.sky.label.clear();
            });
        }

        let pv = generating(state);
        let capacity = state.envelope.estimated_peak_capacity;
        let label = self.ctx.locale().power_label(keys::PV_SYSTEM, pv);
        let shaded = lopsided(state.sample.pv_string1, state.sample.pv_string2);
        let sun = pv >= capacity / thresholds::CLOUDY;
        self.ctx.update(|scene| {
            scene.sky.moon = false;
            scene.sky.label = label;
            scene.sky.cloud = pv < capacity / thresholds::SUN_PART;
            scene.sky.sun = sun;
            // the shadow only matters while the sun is visible
            if sun {
                scene.sky.tree = shaded;
            }
        })?;

        if self.beams_play(state) {
            self.ctx.play(TransitionSlot::Sky, TransitionKind::Beams, 1.0).await?;
        }
        Ok(())
    }
}

/// PV power that counts as generation at all.
fn generating(state: &RenderState) -> f64 {
    if state.flows.pv > thresholds::PV { state.flows.pv } else { 0.0 }
}

/// One string delivers noticeably less than the other.
fn lopsided(string1: f64, string2: f64) -> bool {
    let total = string1 + string2;
    total != 0.0 && ((string1 - string2) / total).abs() > thresholds::LOPSIDED
}

impl Effector for SkyEffector {
    fn name(&self) -> &'static str {
        "sky"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        let c = &state.changes;
        c.night || c.envelope || c.flows || self.beams_play(state)
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
    }
}
