use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::telemetry::Background;

// ─── Transitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    /// Sun beams wobble.
    Beams,
    /// Drop falling into the battery.
    ChargeDrop,
    /// Bubble rising out of the battery.
    DischargeBubble,
    /// Spark travelling along a flow arrow.
    Spark,
    /// Sparks along the power line.
    GridSparks,
    /// Smoke from the chimney.
    Smoke,
    /// Grid icon blinking while the feed-in limit is reached.
    GridBlink,
}

/// A running visual effect. Present while the effect plays, cleared afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Transition {
    pub kind: TransitionKind,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Size of the moving element relative to its resting size.
    pub scale: f64,
    /// Whether the element rotates while moving (off in slow mode).
    pub spin: bool,
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkyScene {
    pub sun: bool,
    pub cloud: bool,
    pub moon: bool,
    /// Tree shadow over one PV string.
    pub tree: bool,
    pub label: String,
    pub transition: Option<Transition>,
}

impl Default for SkyScene {
    fn default() -> Self {
        Self {
            sun: true,
            cloud: false,
            moon: false,
            tree: false,
            label: String::new(),
            transition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct BatteryScene {
    pub soc: Option<f64>,
    /// HSL hue of the charge fill, red (0) to green (120).
    pub fill_hue: f64,
    /// Empty part of the gauge (0..100).
    pub remaining: f64,
    pub label: String,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct ArrowScene {
    pub visible: bool,
    pub sparkle_color: String,
    pub label: String,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArrowId {
    PvToGrid,
    PvToBattery,
    PvToHome,
    GridToHome,
    BatteryToHome,
}

impl ArrowId {
    pub const ALL: [ArrowId; 5] = [
        ArrowId::PvToGrid,
        ArrowId::PvToBattery,
        ArrowId::PvToHome,
        ArrowId::GridToHome,
        ArrowId::BatteryToHome,
    ];
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct Arrows {
    pub pv_to_grid: ArrowScene,
    pub pv_to_battery: ArrowScene,
    pub pv_to_home: ArrowScene,
    pub grid_to_home: ArrowScene,
    pub battery_to_home: ArrowScene,
}

impl Arrows {
    pub fn get_mut(&mut self, id: ArrowId) -> &mut ArrowScene {
        match id {
            ArrowId::PvToGrid => &mut self.pv_to_grid,
            ArrowId::PvToBattery => &mut self.pv_to_battery,
            ArrowId::PvToHome => &mut self.pv_to_home,
            ArrowId::GridToHome => &mut self.grid_to_home,
            ArrowId::BatteryToHome => &mut self.battery_to_home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct GridScene {
    pub label: String,
    /// Island icon replaces the grid icon.
    pub island: bool,
    pub sparks_towards: bool,
    pub sparks_away: bool,
    pub transition: Option<Transition>,
    pub blink: Option<Transition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct HomeScene {
    pub label: String,
    pub window_lit: bool,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WallboxScene {
    pub visible: bool,
    pub car: bool,
    /// Plug hanging at the box (no car connected).
    pub plug_at_box: bool,
    pub label: String,
    pub label_visible: bool,
    pub fill: String,
}

impl Default for WallboxScene {
    fn default() -> Self {
        Self {
            visible: false,
            car: false,
            plug_at_box: false,
            label: String::new(),
            label_visible: false,
            fill: "#444".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct ExternalScene {
    pub visible: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct StatusScene {
    pub ups_text: String,
    pub bolt_color: String,
    pub ems_text: String,
    pub battery_shifted: bool,
    pub clock: bool,
    pub weather: bool,
    /// Banner shown above the scene (island operation).
    pub banner: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct RatioScene {
    pub autarky_text: String,
    pub autarky_hue: f64,
    pub self_consumption_text: String,
    pub self_consumption_hue: f64,
}

/// Static texts, translated once at startup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct Captions {
    pub title: String,
    pub own_quota: String,
    pub lock: String,
    pub autarky: String,
    pub emergency_power: String,
}

/// Everything a front end needs to draw the dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct Scene {
    pub captions: Captions,
    pub sky: SkyScene,
    pub battery: BatteryScene,
    pub arrows: Arrows,
    pub grid: GridScene,
    pub home: HomeScene,
    pub wallbox: WallboxScene,
    pub external: ExternalScene,
    pub status: StatusScene,
    pub ratios: RatioScene,
    pub background: Background,
}

/// Where a subject keeps its running transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSlot {
    Sky,
    Battery,
    Arrow(ArrowId),
    Grid,
    GridBlink,
    Home,
}

impl Scene {
    pub fn transition_mut(&mut self, slot: TransitionSlot) -> &mut Option<Transition> {
        match slot {
            TransitionSlot::Sky => &mut self.sky.transition,
            TransitionSlot::Battery => &mut self.battery.transition,
            TransitionSlot::Arrow(id) => &mut self.arrows.get_mut(id).transition,
            TransitionSlot::Grid => &mut self.grid.transition,
            TransitionSlot::GridBlink => &mut self.grid.blink,
            TransitionSlot::Home => &mut self.home.transition,
        }
    }

    /// Drops every running transition, e.g. after an abandoned batch.
    pub fn clear_transitions(&mut self) {
        self.sky.transition = None;
        self.battery.transition = None;
        self.grid.transition = None;
        self.grid.blink = None;
        self.grid.sparks_towards = false;
        self.grid.sparks_away = false;
        self.home.transition = None;
        for id in ArrowId::ALL {
            self.arrows.get_mut(id).transition = None;
        }
    }
}

/// Maps a 0..100 percentage onto the red-to-green hue range.
pub fn percent_hue(percent: f64) -> f64 {
    percent * 1.2
}
