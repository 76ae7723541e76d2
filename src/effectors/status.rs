use crate::effectors::{EffectContext, EffectError, EffectFuture, Effector};
use crate::models::scene::{TransitionKind, TransitionSlot};
use crate::models::telemetry::{EmsHeadline, UpsStatus};
use crate::services::interpreter::RenderState;
use crate::services::locale::keys;

/// UPS and EMS indicators, island mode, and the grid blink while feed-in is limited.
pub struct StatusEffector {
    ctx: EffectContext,
}

impl StatusEffector {
    pub fn new(ctx: EffectContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, state: &RenderState) -> Result<(), EffectError> {
        let locale = self.ctx.locale();
        let island = state.ups == UpsStatus::Island;
        let banner = if island { locale.get(keys::ISLAND).to_owned() } else { String::new() };
        let ups = match state.ups {
            UpsStatus::Island => Some((keys::UPS_ON, "#cc3")),
            UpsStatus::Available => Some((keys::UPS_AVAILABLE, "#4c0")),
            UpsStatus::Missing => Some((keys::UPS_MISSING, "#999")),
            UpsStatus::ManuallyOff => Some((keys::UPS_MANUALLY_OFF, "#e22")),
            UpsStatus::Unknown | UpsStatus::Other(_) => None,
        }
        .map(|(key, color)| (locale.get(key).to_owned(), color));
        let ems_key = match state.ems.headline() {
            EmsHeadline::None => keys::EMS_NONE,
            EmsHeadline::Charge => keys::EMS_CHARGE,
            EmsHeadline::Discharge => keys::EMS_DISCHARGE,
            EmsHeadline::FeedIn => keys::EMS_FEED_IN,
        };
        let ems_text = locale.get(ems_key).to_owned();
        let ems = state.ems;

        self.ctx.update(|scene| {
            scene.grid.island = island;
            scene.status.banner = banner;
            // unknown codes leave the last indication in place
            if let Some((text, color)) = ups {
                scene.status.ups_text = text;
                scene.status.bolt_color = color.to_owned();
            }
            scene.status.ems_text = ems_text;
            scene.status.battery_shifted = ems.battery_locked();
            scene.status.clock = ems.clock_locked();
            scene.status.weather = ems.weather_locked();
        })?;

        if ems.feed_in_limited() && !self.ctx.motion.disabled {
            self.ctx.play(TransitionSlot::GridBlink, TransitionKind::GridBlink, 1.0).await?;
        }
        Ok(())
    }
}

impl Effector for StatusEffector {
    fn name(&self) -> &'static str {
        "status"
    }

    fn is_due(&self, state: &RenderState) -> bool {
        state.changes.status
    }

    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
        Box::pin(self.run(state))
    }
}
