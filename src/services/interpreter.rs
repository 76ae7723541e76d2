use serde::Serialize;
use utoipa::ToSchema;

use crate::models::telemetry::{Background, EmsStatus, Flows, Sample, UpsStatus, WallboxStatus};
use crate::services::solar_envelope::SolarEnvelope;

/// What differs from the last applied state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct Changes {
    pub soc: bool,
    pub autarky: bool,
    pub self_consumption: bool,
    /// EMS or UPS changed, or the feed-in limit is active (blinks every tick).
    pub status: bool,
    pub wallbox: bool,
    pub night: bool,
    pub envelope: bool,
    pub background: bool,
    pub flows: bool,
}

impl Changes {
    #[cfg(test)]
    pub fn any(&self) -> bool {
        self.soc
            || self.autarky
            || self.self_consumption
            || self.status
            || self.wallbox
            || self.night
            || self.envelope
            || self.background
            || self.flows
    }
}

/// Fully interpreted snapshot of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub sample: Sample,
    pub flows: Flows,
    pub ems: EmsStatus,
    pub ups: UpsStatus,
    pub wallbox: WallboxStatus,
    pub background: Background,
    pub envelope: SolarEnvelope,
    pub changes: Changes,
}

impl RenderState {
    pub fn is_night(&self) -> bool {
        self.envelope.is_night
    }
}

/// Last values handed to the effectors. `None` means nothing applied yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedCache {
    pub soc: Option<f64>,
    pub autarky: Option<f64>,
    pub self_consumption: Option<f64>,
    pub ems: Option<EmsStatus>,
    pub ups: Option<UpsStatus>,
    pub wallbox: Option<WallboxStatus>,
    pub envelope: Option<SolarEnvelope>,
    pub background: Option<Background>,
    pub flows: Option<Flows>,
}

impl AppliedCache {
    pub fn commit(&mut self, state: &RenderState) {
        self.soc = Some(state.sample.soc);
        self.autarky = Some(state.sample.autarky);
        self.self_consumption = Some(state.sample.self_consumption);
        self.ems = Some(state.ems);
        self.ups = Some(state.ups);
        self.wallbox = Some(state.wallbox);
        self.envelope = Some(state.envelope);
        self.background = Some(state.background);
        self.flows = Some(state.flows);
    }
}

/// Maps a sample onto domain quantities and flags what changed since `cache`.
pub fn interpret(sample: &Sample, envelope: &SolarEnvelope, cache: &AppliedCache) -> RenderState {
    let flows = Flows::from_sample(sample);
    let ems = EmsStatus(sample.ems);
    let ups = UpsStatus::from(sample.ups);
    let wallbox = WallboxStatus::from(sample.wallbox_bits());
    let background = Background::dominant(flows.direct_consumption, flows.grid_import, flows.battery_discharge);

    let changes = Changes {
        soc: cache.soc != Some(sample.soc),
        autarky: cache.autarky != Some(sample.autarky),
        self_consumption: cache.self_consumption != Some(sample.self_consumption),
        status: cache.ems != Some(ems) || cache.ups != Some(ups) || ems.feed_in_limited(),
        wallbox: cache.wallbox != Some(wallbox),
        night: cache.envelope.map(|e| e.is_night) != Some(envelope.is_night),
        envelope: cache.envelope.as_ref() != Some(envelope),
        background: cache.background != Some(background),
        flows: cache.flows != Some(flows),
    };

    RenderState {
        sample: sample.clone(),
        flows,
        ems,
        ups,
        wallbox,
        background,
        envelope: *envelope,
        changes,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn quiet_sample() -> Sample {
        Sample {
            pv_power: 0.0,
            pv_string1: 0.0,
            pv_string2: 0.0,
            battery_power: 0.0,
            grid_power: 0.0,
            home_power: 0.0,
            external_power: 0.0,
            wallbox_power: 0.0,
            wallbox1: 0,
            wallbox2: 0,
            wallbox3: 0,
            wallbox4: 0,
            wallbox5: 0,
            wallbox6: 0,
            wallbox7: 0,
            wallbox8: 0,
            soc: 50.0,
            autarky: 80.0,
            self_consumption: 60.0,
            ems: 4,
            ups: 2,
        }
    }

    pub(crate) fn day_envelope() -> SolarEnvelope {
        SolarEnvelope {
            sunrise: Utc.with_ymd_and_hms(2025, 6, 21, 3, 12, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2025, 6, 21, 19, 32, 0).unwrap(),
            is_night: false,
            estimated_peak_capacity: 7000.0,
        }
    }

    #[test]
    fn test_export_scenario() {
        let sample = Sample {
            pv_power: 2000.0,
            pv_string1: 1000.0,
            pv_string2: 1000.0,
            grid_power: -500.0,
            home_power: 1500.0,
            ..quiet_sample()
        };
        let state = interpret(&sample, &day_envelope(), &AppliedCache::default());
        assert_eq!(state.flows.grid_export, 500.0);
        assert_eq!(state.flows.grid_import, 0.0);
        assert_eq!(state.flows.battery_charge, 0.0);
        assert_eq!(state.flows.battery_discharge, 0.0);
        assert_eq!(state.flows.direct_consumption, 1500.0);
        assert_eq!(state.background, Background::Solar);
    }

    #[test]
    fn test_signed_quantities_are_split() {
        let sample = Sample {
            pv_power: 3000.0,
            battery_power: -700.0,
            grid_power: 250.0,
            external_power: -400.0,
            wallbox_power: -3.0,
            ..quiet_sample()
        };
        let flows = interpret(&sample, &day_envelope(), &AppliedCache::default()).flows;
        assert_eq!(flows.battery_discharge, 700.0);
        assert_eq!(flows.battery_charge, 0.0);
        assert_eq!(flows.grid_import, 250.0);
        assert_eq!(flows.external, 400.0);
        assert_eq!(flows.wallbox, 0.0);
        assert_eq!(flows.direct_consumption, 3400.0);
    }

    #[test]
    fn test_direct_consumption_is_not_clamped() {
        let sample = Sample {
            pv_power: 100.0,
            battery_power: 2000.0,
            ..quiet_sample()
        };
        let flows = interpret(&sample, &day_envelope(), &AppliedCache::default()).flows;
        assert_eq!(flows.direct_consumption, -1900.0);
    }

    #[test]
    fn test_first_tick_flags_everything() {
        let state = interpret(&quiet_sample(), &day_envelope(), &AppliedCache::default());
        let c = state.changes;
        assert!(c.soc && c.autarky && c.self_consumption && c.wallbox && c.night && c.envelope && c.flows);
        assert!(c.status);
    }

    #[test]
    fn test_first_all_zero_status_is_flagged() {
        let sample = Sample { ems: 0, ups: 0, ..quiet_sample() };
        let mut cache = AppliedCache::default();
        let first = interpret(&sample, &day_envelope(), &cache);
        assert!(first.changes.status);
        assert_eq!(first.ups, UpsStatus::Unknown);

        cache.commit(&first);
        assert!(!interpret(&sample, &day_envelope(), &cache).changes.status);
    }

    #[test]
    fn test_interpretation_is_idempotent() {
        let sample = quiet_sample();
        let envelope = day_envelope();
        let mut cache = AppliedCache::default();
        let first = interpret(&sample, &envelope, &cache);
        assert_eq!(first, interpret(&sample, &envelope, &cache));

        cache.commit(&first);
        let second = interpret(&sample, &envelope, &cache);
        assert!(!second.changes.any(), "{:?}", second.changes);
        assert_eq!(second.flows, first.flows);
    }

    #[test]
    fn test_feed_in_limit_keeps_status_due() {
        let sample = Sample { ems: 16, ..quiet_sample() };
        let mut cache = AppliedCache::default();
        let first = interpret(&sample, &day_envelope(), &cache);
        cache.commit(&first);
        assert!(interpret(&sample, &day_envelope(), &cache).changes.status);
    }

    #[test]
    fn test_soc_change_detection() {
        let mut cache = AppliedCache::default();
        let first = interpret(&quiet_sample(), &day_envelope(), &cache);
        cache.commit(&first);
        let changed = Sample { soc: 51.0, ..quiet_sample() };
        let state = interpret(&changed, &day_envelope(), &cache);
        assert!(state.changes.soc);
        assert!(!state.changes.autarky);
    }
}
