use std::sync::{Arc, RwLock};

use crate::effectors::EffectError;
use crate::models::scene::Scene;
use crate::models::status::SchedulerStatus;
use crate::services::locale::Locale;

/// State shared between the scheduler, the effectors and the HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// What the dashboard currently shows
    pub scene: Arc<RwLock<Scene>>,
    /// Refresh loop health
    pub status: Arc<RwLock<SchedulerStatus>>,
    pub locale: Arc<Locale>,
}

impl AppState {
    pub fn new(locale: Arc<Locale>) -> Self {
        Self {
            scene: Arc::new(RwLock::new(Scene::default())),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            locale,
        }
    }

    /// Applies `f` to the scene. The lock is never held across an await.
    pub fn update_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> Result<R, EffectError> {
        let mut scene = self.scene.write().map_err(|_| EffectError::ScenePoisoned)?;
        Ok(f(&mut scene))
    }

    pub fn scene_snapshot(&self) -> Option<Scene> {
        self.scene.read().ok().map(|scene| scene.clone())
    }

    /// Status bookkeeping is best effort; a poisoned lock only loses counters.
    pub fn update_status(&self, f: impl FnOnce(&mut SchedulerStatus)) {
        if let Ok(mut status) = self.status.write() {
            f(&mut status);
        }
    }

    pub fn status_snapshot(&self) -> Option<SchedulerStatus> {
        self.status.read().ok().map(|status| status.clone())
    }
}
