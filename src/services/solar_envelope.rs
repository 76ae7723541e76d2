/// ============================================================
///  Solar envelope estimation
///
///  Two parts with different cost:
///   1. Daily  – sunrise / sunset from a low-precision solar
///               position (declination + equation of time),
///               computed once per calendar day
///   2. Instant – day/night flag and the expected PV peak
///               capacity right now: a seasonal line for the
///               noon peak and a parabola between sunrise and
///               sunset, cheap enough for every tick
/// ============================================================

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::info;
use utoipa::ToSchema;

use crate::models::telemetry::thresholds;

// ─── Constants ───────────────────────────────────────────────
/// Elapsed days before each month in a leap year.
const ELAPSED_DAYS: [u32; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];
/// Sun depression angle at sunrise/sunset (rad), refraction and disc radius.
const HORIZON: f64 = -0.0145;
/// Days between the Unix epoch and J2000.0.
const J2000_UNIX_DAYS: f64 = 10957.5;
const MS_PER_DAY: f64 = 86_400_000.0;
/// Day-since-minimum at which the seasonal line turns.
const SEASON_TURN: u32 = 182;
const HALF_YEAR: f64 = 182.5;

// ─── Outputs ─────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySolarTimes {
    /// Local calendar date these times belong to.
    pub date: NaiveDate,
    pub day_of_year: u32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl DailySolarTimes {
    /// Midpoint of sunrise and sunset.
    pub fn solar_noon(&self) -> DateTime<Utc> {
        self.sunrise + (self.sunset - self.sunrise) / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstantSolarState {
    pub is_night: bool,
    pub estimated_peak_capacity: f64,
}

/// Day/night model valid until the next instant recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SolarEnvelope {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub is_night: bool,
    /// Upper bound of the PV output right now (W).
    pub estimated_peak_capacity: f64,
}

// ─── Daily part ──────────────────────────────────────────────

/// Day of the year (1-based) with the simple `year % 4` leap rule.
pub fn day_of_year(date: NaiveDate) -> u32 {
    let month = date.month0() as usize;
    let not_leap = date.year() & 3 != 0;
    ELAPSED_DAYS[month] + date.day() - u32::from(not_leap && month > 1)
}

/// Sunrise and sunset for the local calendar day of `now`.
pub fn recompute_daily<Tz: TimeZone>(now: &DateTime<Tz>, latitude: f64, longitude: f64) -> DailySolarTimes {
    let date = now.date_naive();
    let doy = day_of_year(date);

    // a) Solar declination
    let jde = now.timestamp_millis() as f64 / MS_PER_DAY - J2000_UNIX_DAYS;
    let omega = 2.1429 - 0.0010394594 * jde;
    let mean_longitude = 4.8950630 + 0.017202791698 * jde;
    let mean_anomaly = 6.2400600 + 0.0172019699 * jde;
    let ecliptic_longitude = mean_longitude
        + 0.03341607 * mean_anomaly.sin()
        + 0.00034894 * (2.0 * mean_anomaly).sin()
        - 0.0001134
        - 0.0000203 * omega.sin();
    let obliquity = 0.4090928 - 6.2140e-9 * jde + 0.0000396 * omega.cos();
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();

    // b) Half day length and equation of time (hours)
    let half_day = half_day_hours(latitude.to_radians(), declination);
    let doy_f = doy as f64;
    let equation_of_time = -0.171 * (0.0337 * doy_f + 0.465).sin() - 0.1299 * (0.01787 * doy_f - 0.168).sin();

    // c) Absolute instants; the UTC offset of `now` only selects the date
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    let noon = midnight + hours(12.0 - equation_of_time - longitude / 15.0);
    DailySolarTimes {
        date,
        day_of_year: doy,
        sunrise: noon - hours(half_day),
        sunset: noon + hours(half_day),
    }
}

/// Hour angle of sunrise in hours. Polar night gives 0, polar day 12.
fn half_day_hours(latitude: f64, declination: f64) -> f64 {
    let cos_h = (HORIZON.sin() - latitude.sin() * declination.sin()) / (latitude.cos() * declination.cos());
    if cos_h.is_nan() || cos_h >= 1.0 {
        0.0
    } else if cos_h <= -1.0 {
        12.0
    } else {
        12.0 * cos_h.acos() / PI
    }
}

fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0).round() as i64)
}

// ─── Instant part ────────────────────────────────────────────

/// Expected full-sun noon peak for the day: linear between the winter
/// minimum (~21 Dec) and the summer maximum (~21 Jun).
pub fn seasonal_peak(day_of_year: u32, summer_peak_w: f64, winter_peak_w: f64) -> f64 {
    let days_since_min = (day_of_year + 10) % 365;
    let sign = if days_since_min > SEASON_TURN { -1.0 } else { 1.0 };
    let slope = sign * (summer_peak_w - winter_peak_w) / HALF_YEAR;
    let intercept = summer_peak_w - HALF_YEAR * slope;
    slope * days_since_min as f64 + intercept
}

/// Parabola through zero at sunrise and sunset with `peak` at solar noon.
pub fn intraday_capacity(now: DateTime<Utc>, sunrise: DateTime<Utc>, sunset: DateTime<Utc>, peak: f64) -> f64 {
    let width = (sunset - sunrise).num_milliseconds() as f64;
    if width <= 0.0 {
        return 0.0;
    }
    let x = (now - sunrise).num_milliseconds() as f64;
    (peak * 4.0 * x * (width - x) / (width * width)).max(0.0)
}

pub fn recompute_instant(
    now: DateTime<Utc>,
    daily: &DailySolarTimes,
    grid_export_w: f64,
    summer_peak_w: f64,
    winter_peak_w: f64,
) -> InstantSolarState {
    // PV still trickles after sunset, so export keeps day mode a little longer
    let outside_day = now < daily.sunrise || now > daily.sunset;
    let is_night = outside_day && grid_export_w < thresholds::PV;
    let peak = seasonal_peak(daily.day_of_year, summer_peak_w, winter_peak_w);
    InstantSolarState {
        is_night,
        estimated_peak_capacity: intraday_capacity(now, daily.sunrise, daily.sunset, peak),
    }
}

// ─── Cached estimator ────────────────────────────────────────

/// Keeps the daily part until the calendar day changes.
#[derive(Debug, Clone)]
pub struct SolarEstimator {
    latitude: f64,
    longitude: f64,
    summer_peak_w: f64,
    winter_peak_w: f64,
    daily: Option<DailySolarTimes>,
}

impl SolarEstimator {
    pub fn new(latitude: f64, longitude: f64, summer_peak_w: f64, winter_peak_w: f64) -> Self {
        Self { latitude, longitude, summer_peak_w, winter_peak_w, daily: None }
    }

    #[cfg(test)]
    pub fn daily(&self) -> Option<&DailySolarTimes> {
        self.daily.as_ref()
    }

    pub fn update<Tz: TimeZone>(&mut self, now: &DateTime<Tz>, grid_export_w: f64) -> SolarEnvelope {
        let daily = match self.daily {
            Some(daily) if daily.date == now.date_naive() => daily,
            _ => {
                let daily = recompute_daily(now, self.latitude, self.longitude);
                info!(
                    date = %daily.date,
                    sunrise = %daily.sunrise,
                    sunset = %daily.sunset,
                    noon = %daily.solar_noon(),
                    "solar times recomputed"
                );
                self.daily = Some(daily);
                daily
            }
        };
        let instant = recompute_instant(
            now.with_timezone(&Utc),
            &daily,
            grid_export_w,
            self.summer_peak_w,
            self.winter_peak_w,
        );
        SolarEnvelope {
            sunrise: daily.sunrise,
            sunset: daily.sunset,
            is_night: instant.is_night,
            estimated_peak_capacity: instant.estimated_peak_capacity,
        }
    }
}
