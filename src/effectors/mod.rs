//! Visual effectors. Each one owns a part of the [`Scene`] and turns a
//! [`RenderState`] into scene updates plus, optionally, a timed transition.

pub mod arrows;
pub mod background;
pub mod battery;
pub mod external;
pub mod grid;
pub mod home;
pub mod ratios;
pub mod sky;
pub mod status;
pub mod wallbox;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::Config;
use crate::models::scene::{Scene, Transition, TransitionKind, TransitionSlot};
use crate::models::telemetry::thresholds;
use crate::services::interpreter::RenderState;
use crate::services::locale::{keys, Locale};
use crate::shared_state::AppState;

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("scene lock poisoned")]
    ScenePoisoned,
    /// The effect could not be shown with the inputs it was given.
    #[error("effect failed: {0}")]
    Failed(String),
}

pub type EffectFuture<'a> = BoxFuture<'a, Result<(), EffectError>>;

/// One visual subject of the dashboard.
pub trait Effector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this tick has anything to show for the subject.
    fn is_due(&self, state: &RenderState) -> bool;

    /// Applies the state. The future completes when the transition has played.
    fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Motion {
    /// Reduced motion
    pub slow: bool,
    /// No transitions at all
    pub disabled: bool,
}

impl Motion {
    /// Decorative effects (beams, smoke) only run with full motion.
    pub fn full(&self) -> bool {
        !self.slow && !self.disabled
    }
}

/// Static inputs every effector shares.
#[derive(Debug, Clone)]
pub struct EffectContext {
    pub app: AppState,
    pub motion: Motion,
    pub duration: Duration,
    pub peak_power_w: f64,
}

impl EffectContext {
    pub fn from_config(app: AppState, config: &Config) -> Self {
        Self {
            app,
            motion: Motion {
                slow: config.animation.slow,
                disabled: config.animation.disabled,
            },
            duration: config.effect_duration(),
            peak_power_w: config.peak_power_w(),
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.app.locale
    }

    /// Share of the plant's peak power, capped at 1.
    pub fn power_share(&self, watts: f64) -> f64 {
        watts.min(self.peak_power_w) / self.peak_power_w
    }

    /// Spark size growing with the power it represents.
    pub fn spark_scale(&self, watts: f64) -> f64 {
        1.0 + thresholds::SCALE * self.power_share(watts)
    }

    pub fn update(&self, f: impl FnOnce(&mut Scene)) -> Result<(), EffectError> {
        self.app.update_scene(f)
    }

    /// Shows a transition in `slot` for one effect duration, then removes it.
    pub async fn play(&self, slot: TransitionSlot, kind: TransitionKind, scale: f64) -> Result<(), EffectError> {
        if !scale.is_finite() {
            return Err(EffectError::Failed(format!("{kind:?} in {slot:?} has scale {scale}")));
        }
        let transition = Transition {
            kind,
            started_at: Utc::now(),
            duration_ms: self.duration.as_millis() as u64,
            scale,
            spin: !self.motion.slow,
        };
        self.update(|scene| *scene.transition_mut(slot) = Some(transition.clone()))?;
        tokio::time::sleep(self.duration).await;
        self.update(|scene| {
            let current = scene.transition_mut(slot);
            if current.as_ref() == Some(&transition) {
                *current = None;
            }
        })
    }
}

/// The full set of effectors, one per visual subject.
pub fn standard_set(ctx: &EffectContext) -> Vec<Arc<dyn Effector>> {
    let mut set: Vec<Arc<dyn Effector>> = vec![
        Arc::new(status::StatusEffector::new(ctx.clone())),
        Arc::new(ratios::RatioEffector::new(ctx.clone())),
        Arc::new(background::BackgroundEffector::new(ctx.clone())),
        Arc::new(battery::BatteryGaugeEffector::new(ctx.clone())),
        Arc::new(battery::BatteryFlowEffector::new(ctx.clone())),
        Arc::new(external::ExternalSourceEffector::new(ctx.clone())),
        Arc::new(wallbox::WallboxEffector::new(ctx.clone())),
        Arc::new(sky::SkyEffector::new(ctx.clone())),
        Arc::new(grid::GridEffector::new(ctx.clone())),
        Arc::new(home::HomeEffector::new(ctx.clone())),
    ];
    for arrow in arrows::ArrowEffector::all(ctx) {
        set.push(Arc::new(arrow));
    }
    set
}

/// Fills the static captions from the locale table.
pub fn translate_captions(app: &AppState) -> Result<(), EffectError> {
    let locale = app.locale.clone();
    app.update_scene(|scene| {
        scene.captions.title = locale.get(keys::TITLE).to_owned();
        scene.captions.own_quota = locale.get(keys::OWN_QUOTA).to_owned();
        scene.captions.lock = locale.get(keys::LOCK).to_owned();
        scene.captions.autarky = locale.get(keys::AUTARKY).to_owned();
        scene.captions.emergency_power = locale.get(keys::EMERGENCY_POWER).to_owned();
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_play_sets_and_clears_transition() {
        let ctx = context(Motion::default());
        let play = ctx.play(TransitionSlot::Home, TransitionKind::Smoke, 1.0);
        tokio::pin!(play);

        // drive until the transition is visible, then let the sleep elapse
        tokio::select! {
            _ = &mut play => panic!("finished too early"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        let running = scene(&ctx).home.transition.expect("transition shown");
        assert_eq!(running.kind, TransitionKind::Smoke);
        assert!(running.spin);

        play.await.unwrap();
        assert!(scene(&ctx).home.transition.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_rejects_unusable_scale() {
        let ctx = EffectContext { peak_power_w: 0.0, ..context(Motion::default()) };
        let result = ctx.play(TransitionSlot::Grid, TransitionKind::Spark, ctx.spark_scale(800.0)).await;

        assert!(matches!(result, Err(EffectError::Failed(_))), "{result:?}");
        assert!(scene(&ctx).grid.transition.is_none());
    }

    #[test]
    fn test_spark_scale_is_capped() {
        let ctx = context(Motion::default());
        assert_eq!(ctx.spark_scale(0.0), 1.0);
        assert_eq!(ctx.spark_scale(5_000.0), 3.5);
        assert_eq!(ctx.spark_scale(50_000.0), 6.0);
    }

    #[test]
    fn test_standard_set_has_one_effector_per_subject() {
        let ctx = context(Motion::default());
        let names: Vec<_> = standard_set(&ctx).iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), 15);
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }
}
