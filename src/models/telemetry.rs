use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Thresholds (W) ──────────────────────────────────────────────────────────

pub mod thresholds {
    /// Cloud in front of the sun below capacity / this.
    pub const SUN_PART: f64 = 2.0;
    /// Only the cloud below capacity / this.
    pub const CLOUDY: f64 = 10.0;
    /// Relative string imbalance above which the tree shadow is shown.
    pub const LOPSIDED: f64 = 0.075;
    pub const GRID: f64 = 20.0;
    pub const BATTERY_IN: f64 = 20.0;
    pub const BATTERY_OUT: f64 = 10.0;
    pub const HOME_DIRECT: f64 = 20.0;
    pub const HOME: f64 = 0.0;
    pub const PV: f64 = 20.0;
    /// Maximum scale factor of a power spark.
    pub const SCALE: f64 = 5.0;
}

// ─── Wire type ───────────────────────────────────────────────────────────────

/// One telemetry snapshot as published by the storage system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sample {
    /// PV generation, total (W)
    #[serde(rename = "Ppv")]
    pub pv_power: f64,
    /// PV string 1 (W)
    #[serde(rename = "Pdc1")]
    pub pv_string1: f64,
    /// PV string 2 (W)
    #[serde(rename = "Pdc2")]
    pub pv_string2: f64,
    /// Battery power (W), positive = charging
    #[serde(rename = "Pbat")]
    pub battery_power: f64,
    /// Grid power (W), positive = import
    #[serde(rename = "Pnetz")]
    pub grid_power: f64,
    /// Household consumption (W)
    #[serde(rename = "Phaus")]
    pub home_power: f64,
    /// External source (W), negative = supplying
    #[serde(rename = "Pext", default)]
    pub external_power: f64,
    #[serde(rename = "Pwbx", default)]
    pub wallbox_power: f64,
    #[serde(rename = "Wb1", default)]
    pub wallbox1: u32,
    #[serde(rename = "Wb2", default)]
    pub wallbox2: u32,
    #[serde(rename = "Wb3", default)]
    pub wallbox3: u32,
    #[serde(rename = "Wb4", default)]
    pub wallbox4: u32,
    #[serde(rename = "Wb5", default)]
    pub wallbox5: u32,
    #[serde(rename = "Wb6", default)]
    pub wallbox6: u32,
    #[serde(rename = "Wb7", default)]
    pub wallbox7: u32,
    #[serde(rename = "Wb8", default)]
    pub wallbox8: u32,
    /// Battery state of charge (0..100)
    #[serde(rename = "SOC")]
    pub soc: f64,
    /// Autarky (0..100)
    #[serde(rename = "autark")]
    pub autarky: f64,
    /// Self-consumption (0..100)
    #[serde(rename = "eigen")]
    pub self_consumption: f64,
    #[serde(rename = "EMS")]
    pub ems: u32,
    /// UPS / emergency power status
    #[serde(rename = "NOT")]
    pub ups: u32,
}

impl Sample {
    /// Bitwise OR over all wallbox connectors.
    pub fn wallbox_bits(&self) -> u32 {
        self.wallbox1
            | self.wallbox2
            | self.wallbox3
            | self.wallbox4
            | self.wallbox5
            | self.wallbox6
            | self.wallbox7
            | self.wallbox8
    }
}

// ─── Derived quantities ──────────────────────────────────────────────────────

/// Power flows of one sample, all in W and non-negative except
/// `direct_consumption`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct Flows {
    pub pv: f64,
    pub external: f64,
    pub wallbox: f64,
    pub grid_export: f64,
    pub grid_import: f64,
    pub battery_charge: f64,
    pub battery_discharge: f64,
    /// Residual identity; may be negative for inconsistent readings.
    pub direct_consumption: f64,
    pub home: f64,
}

impl Flows {
    pub fn from_sample(sample: &Sample) -> Self {
        let external = (-sample.external_power).max(0.0);
        let wallbox = sample.wallbox_power.max(0.0);
        let grid_export = (-sample.grid_power).max(0.0);
        let grid_import = sample.grid_power.max(0.0);
        let battery_charge = sample.battery_power.max(0.0);
        let battery_discharge = (-sample.battery_power).max(0.0);
        Self {
            pv: sample.pv_power,
            external,
            wallbox,
            grid_export,
            grid_import,
            battery_charge,
            battery_discharge,
            direct_consumption: sample.pv_power + external - grid_export - battery_charge - wallbox,
            home: sample.home_power,
        }
    }
}

// ─── Decoded status fields ───────────────────────────────────────────────────

/// Bit 2 marks normal operation and carries no indication of its own.
pub mod ems_bits {
    pub const CHARGE_LIMITED: u32 = 1 << 0;
    pub const DISCHARGE_LIMITED: u32 = 1 << 1;
    /// Charging held back because of the weather forecast.
    pub const WEATHER_CHARGE_LOCK: u32 = 1 << 3;
    /// Feed-in limit reached.
    pub const FEED_IN_LIMIT: u32 = 1 << 4;
    pub const CHARGE_TIME_LOCK: u32 = 1 << 5;
    pub const DISCHARGE_TIME_LOCK: u32 = 1 << 6;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmsHeadline {
    None,
    Charge,
    Discharge,
    FeedIn,
}

/// Energy-management status bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct EmsStatus(pub u32);

impl EmsStatus {
    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn feed_in_limited(self) -> bool {
        self.contains(ems_bits::FEED_IN_LIMIT)
    }

    /// The most specific restriction wins.
    pub fn headline(self) -> EmsHeadline {
        use ems_bits::*;
        if self.contains(DISCHARGE_TIME_LOCK) {
            EmsHeadline::Discharge
        } else if self.contains(CHARGE_TIME_LOCK) {
            EmsHeadline::Charge
        } else if self.contains(FEED_IN_LIMIT) {
            EmsHeadline::FeedIn
        } else if self.contains(WEATHER_CHARGE_LOCK) {
            EmsHeadline::Charge
        } else if self.contains(DISCHARGE_LIMITED) {
            EmsHeadline::Discharge
        } else if self.contains(CHARGE_LIMITED) {
            EmsHeadline::Charge
        } else {
            EmsHeadline::None
        }
    }

    pub fn battery_locked(self) -> bool {
        self.contains(ems_bits::WEATHER_CHARGE_LOCK | ems_bits::CHARGE_TIME_LOCK | ems_bits::DISCHARGE_TIME_LOCK)
    }

    pub fn clock_locked(self) -> bool {
        self.contains(ems_bits::CHARGE_TIME_LOCK | ems_bits::DISCHARGE_TIME_LOCK)
    }

    pub fn weather_locked(self) -> bool {
        self.contains(ems_bits::WEATHER_CHARGE_LOCK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpsStatus {
    #[default]
    Unknown,
    /// Running as an island, household supplied from the battery.
    Island,
    Available,
    Missing,
    ManuallyOff,
    Other(u32),
}

impl From<u32> for UpsStatus {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Island,
            2 => Self::Available,
            3 => Self::Missing,
            4 => Self::ManuallyOff,
            other => Self::Other(other),
        }
    }
}

pub mod wallbox_bits {
    pub const PRESENT: u32 = 1 << 0;
    pub const SOLAR_ONLY: u32 = 1 << 2;
    pub const CHARGING: u32 = 1 << 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state")]
pub enum WallboxStatus {
    Absent,
    /// Installed, no car connected.
    Ready,
    Connected { charging: bool, solar_only: bool },
}

impl From<u32> for WallboxStatus {
    fn from(bits: u32) -> Self {
        use wallbox_bits::*;
        if bits & PRESENT == 0 {
            Self::Absent
        } else if bits & (SOLAR_ONLY | CHARGING) != 0 {
            Self::Connected {
                charging: bits & CHARGING != 0,
                solar_only: bits & SOLAR_ONLY != 0,
            }
        } else {
            Self::Ready
        }
    }
}

/// Dominant source supplying the household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Background {
    #[default]
    None,
    Solar,
    Battery,
    Grid,
}

impl Background {
    /// Ties resolve Solar > Battery > Grid.
    pub fn dominant(direct: f64, grid_import: f64, battery_discharge: f64) -> Self {
        if direct >= grid_import && direct >= battery_discharge {
            Self::Solar
        } else if battery_discharge >= direct && battery_discharge >= grid_import {
            Self::Battery
        } else if grid_import >= direct && grid_import >= battery_discharge {
            Self::Grid
        } else {
            Self::None
        }
    }
}
