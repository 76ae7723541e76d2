use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Keys of every user-facing string.
pub mod keys {
    pub const TITLE: &str = "title";
    pub const OWN_QUOTA: &str = "ownq";
    pub const LOCK: &str = "lock";
    pub const AUTARKY: &str = "auty";
    pub const EMERGENCY_POWER: &str = "epwr";
    pub const KILOWATT: &str = "kW";
    pub const WATT: &str = "W";
    pub const DECIMAL_SEPARATOR: &str = "dec";
    pub const SOC: &str = "soc";
    pub const PV_SYSTEM: &str = "pvsys";
    pub const CONSUMPTION: &str = "consum";
    pub const GRID_POWER: &str = "grpwr";
    pub const GRID_IN: &str = "grin";
    pub const BATTERY_IN: &str = "btin";
    pub const DIRECT: &str = "dir";
    pub const GRID_OUT: &str = "grout";
    pub const BATTERY_OUT: &str = "btout";
    pub const UPS_ON: &str = "on";
    pub const UPS_AVAILABLE: &str = "avail";
    pub const UPS_MISSING: &str = "miss";
    pub const UPS_MANUALLY_OFF: &str = "manoff";
    pub const ISLAND: &str = "isle";
    pub const EMS_NONE: &str = "no";
    pub const EMS_CHARGE: &str = "charge";
    pub const EMS_DISCHARGE: &str = "dischrg";
    pub const EMS_FEED_IN: &str = "feedin";
}

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("cannot read locale {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid locale {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Flat key→string table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Locale {
    strings: HashMap<String, String>,
}

impl Locale {
    pub fn new(strings: HashMap<String, String>) -> Self {
        Self { strings }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LocaleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LocaleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let strings = serde_json::from_str(&content).map_err(|source| LocaleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(strings))
    }

    /// Unknown keys resolve to the key itself.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.strings.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn strings(&self) -> &HashMap<String, String> {
        &self.strings
    }

    /// Formats a power in W; above 10 kW the kilo unit with one decimal is used.
    pub fn format_power(&self, watts: f64) -> String {
        if !watts.is_finite() {
            return String::new();
        }
        if watts.abs() > 10_000.0 {
            let value = format!("{:.1}", watts / 1000.0);
            let value = match self.strings.get(keys::DECIMAL_SEPARATOR) {
                Some(sep) => value.replace('.', sep),
                None => value,
            };
            format!("{}{}", value, self.get(keys::KILOWATT))
        } else {
            format!("{}{}", watts, self.get(keys::WATT))
        }
    }

    /// `prefix` followed by the formatted power.
    pub fn power_label(&self, prefix_key: &str, watts: f64) -> String {
        format!("{}{}", self.get(prefix_key), self.format_power(watts))
    }
}

#[cfg(test)]
pub(crate) fn test_locale() -> Locale {
    let strings = [
        (keys::KILOWATT, " kW"),
        (keys::WATT, " W"),
        (keys::PV_SYSTEM, "PV: "),
        (keys::GRID_IN, "Einspeisung: "),
        (keys::GRID_POWER, "Netz: "),
        (keys::CONSUMPTION, "Verbrauch: "),
        (keys::UPS_AVAILABLE, "bereit"),
        (keys::SOC, "SOC: "),
        (keys::UPS_ON, "aktiv"),
        (keys::ISLAND, "Inselbetrieb"),
        (keys::EMS_NONE, "keine"),
        (keys::EMS_FEED_IN, "Einspeiselimit"),
    ];
    Locale::new(strings.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}
