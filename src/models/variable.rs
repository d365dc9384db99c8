use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

/// Monitored gridded variables, keyed by the name of their source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableId {
    RhTmax,
    RhTmin,
    DailyRain,
    EtMortonActual,
    EtMortonPotential,
    EtMortonWet,
    EtShortCrop,
    EtTallCrop,
    EvapMortonLake,
    EvapPan,
    EvapSyn,
    MaxTemp,
    MinTemp,
    MonthlyRain,
    Mslp,
    Radiation,
    Vp,
    VpDeficit,
}

impl VariableId {
    pub const ALL: [VariableId; 18] = [
        VariableId::RhTmax,
        VariableId::RhTmin,
        VariableId::DailyRain,
        VariableId::EtMortonActual,
        VariableId::EtMortonPotential,
        VariableId::EtMortonWet,
        VariableId::EtShortCrop,
        VariableId::EtTallCrop,
        VariableId::EvapMortonLake,
        VariableId::EvapPan,
        VariableId::EvapSyn,
        VariableId::MaxTemp,
        VariableId::MinTemp,
        VariableId::MonthlyRain,
        VariableId::Mslp,
        VariableId::Radiation,
        VariableId::Vp,
        VariableId::VpDeficit,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            VariableId::RhTmax => "rh_tmax",
            VariableId::RhTmin => "rh_tmin",
            VariableId::DailyRain => "daily_rain",
            VariableId::EtMortonActual => "et_morton_actual",
            VariableId::EtMortonPotential => "et_morton_potential",
            VariableId::EtMortonWet => "et_morton_wet",
            VariableId::EtShortCrop => "et_short_crop",
            VariableId::EtTallCrop => "et_tall_crop",
            VariableId::EvapMortonLake => "evap_morton_lake",
            VariableId::EvapPan => "evap_pan",
            VariableId::EvapSyn => "evap_syn",
            VariableId::MaxTemp => "max_temp",
            VariableId::MinTemp => "min_temp",
            VariableId::MonthlyRain => "monthly_rain",
            VariableId::Mslp => "mslp",
            VariableId::Radiation => "radiation",
            VariableId::Vp => "vp",
            VariableId::VpDeficit => "vp_deficit",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.key() == key)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for VariableId {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s).ok_or_else(|| ProcessingError::UnknownVariable(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VariableDefinition {
    #[validate(length(min = 1))]
    pub unit: String,

    #[validate(length(min = 1, max = 16))]
    pub short_code: String,

    #[validate(range(min = -1.0e12, max = 1.0e12))]
    pub scale: f64,

    #[validate(range(min = -1.0e12, max = 1.0e12))]
    pub missing_value: f64,

    #[validate(range(min = -1.0e12, max = 1.0e12))]
    pub offset: f64,

    #[validate(length(min = 1, max = 16))]
    pub output_code: String,
}

impl VariableDefinition {
    pub fn new(unit: &str, short_code: &str, scale: f64, missing_value: f64, offset: f64) -> Self {
        Self {
            unit: unit.to_string(),
            short_code: short_code.to_string(),
            scale,
            missing_value,
            offset,
            output_code: short_code.to_string(),
        }
    }

    /// Field validation plus the checks the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if ![self.scale, self.offset, self.missing_value]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ProcessingError::Config(format!(
                "Variable '{}' has a non-finite scale, offset or missing value",
                self.short_code
            )));
        }
        if self.scale == 0.0 {
            return Err(ProcessingError::Config(format!(
                "Variable '{}' has a zero scale",
                self.short_code
            )));
        }
        Ok(())
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// Read-only lookup of every variable definition used by a run.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    definitions: BTreeMap<VariableId, VariableDefinition>,
}

impl VariableRegistry {
    /// SILO gridded-surface definitions shipped with the pipeline.
    pub fn builtin() -> Self {
        use VariableId::*;

        let table = [
            (RhTmax, VariableDefinition::new("%", "rh_tmax", 0.1, -32767.0, 3276.5)),
            (RhTmin, VariableDefinition::new("%", "rh_tmin", 0.1, -32767.0, 3276.5)),
            (DailyRain, VariableDefinition::new("mm", "rain_d", 0.1, -32767.0, 3276.5)),
            (EtMortonActual, VariableDefinition::new("mm", "et_ma", 0.1, -32767.0, 0.0)),
            (EtMortonPotential, VariableDefinition::new("mm", "et_mp", 0.1, -32767.0, 0.0)),
            (EtMortonWet, VariableDefinition::new("mm", "et_mw", 0.1, -32767.0, 0.0)),
            (EtShortCrop, VariableDefinition::new("mm", "et_sc", 0.1, -32767.0, 0.0)),
            (EtTallCrop, VariableDefinition::new("mm", "et_tc", 0.1, -32767.0, 0.0)),
            (EvapMortonLake, VariableDefinition::new("mm", "evp_ml", 0.1, -32767.0, 0.0)),
            (EvapPan, VariableDefinition::new("mm", "evp_p", 0.1, -32767.0, 0.0)),
            (EvapSyn, VariableDefinition::new("mm", "evp_s", 0.1, -32767.0, 0.0)),
            (MaxTemp, VariableDefinition::new("C", "tmax", 0.1, -32767.0, 0.0)),
            (MinTemp, VariableDefinition::new("C", "tmin", 0.1, -32767.0, 0.0)),
            (MonthlyRain, VariableDefinition::new("mm", "rain_m", 0.1, -32767.0, 3276.5)),
            (Mslp, VariableDefinition::new("hPa", "mslp", 0.1, -32767.0, 0.0)),
            (Radiation, VariableDefinition::new("MJ/m2", "rad", 0.1, -32767.0, 0.0)),
            (Vp, VariableDefinition::new("hPa", "vp", 0.1, -32767.0, 0.0)),
            (VpDeficit, VariableDefinition::new("hPa", "vp_d", 0.1, -32767.0, 0.0)),
        ];

        Self {
            definitions: table.into_iter().collect(),
        }
    }

    /// Built-in table with configured entries layered on top. Every entry is
    /// validated before the registry is handed out.
    pub fn with_overrides(overrides: &BTreeMap<VariableId, VariableDefinition>) -> Result<Self> {
        let mut registry = Self::builtin();
        for (id, definition) in overrides {
            registry.definitions.insert(*id, definition.clone());
        }
        for definition in registry.definitions.values() {
            definition.check()?;
        }
        Ok(registry)
    }

    pub fn get(&self, id: VariableId) -> Result<&VariableDefinition> {
        self.definitions
            .get(&id)
            .ok_or_else(|| ProcessingError::UnknownVariable(id.key().to_string()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_keys_round_trip() {
        for id in VariableId::ALL {
            assert_eq!(VariableId::from_key(id.key()), Some(id));
        }
        assert_eq!(VariableId::from_key("snowfall"), None);
        assert!("snowfall".parse::<VariableId>().is_err());
    }

    #[test]
    fn test_builtin_registry_is_complete_and_valid() {
        let registry = VariableRegistry::builtin();
        assert_eq!(registry.len(), VariableId::ALL.len());
        for id in VariableId::ALL {
            let definition = registry.get(id).unwrap();
            assert!(definition.check().is_ok(), "{} failed validation", id);
        }

        let rain = registry.get(VariableId::MonthlyRain).unwrap();
        assert_eq!(rain.unit, "mm");
        assert_eq!(rain.output_code, "rain_m");
        assert_eq!(rain.offset, 3276.5);
    }

    #[test]
    fn test_builtin_output_codes_are_distinct() {
        let registry = VariableRegistry::builtin();
        let codes: std::collections::HashSet<&str> = VariableId::ALL
            .into_iter()
            .map(|id| registry.get(id).unwrap().output_code.as_str())
            .collect();
        assert_eq!(codes.len(), VariableId::ALL.len());
        assert_eq!(registry.get(VariableId::EvapPan).unwrap().output_code, "evp_p");
        assert_eq!(registry.get(VariableId::EvapSyn).unwrap().output_code, "evp_s");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            VariableId::Vp,
            VariableDefinition::new("", "vp", 0.1, -32767.0, 0.0),
        );
        assert!(VariableRegistry::with_overrides(&overrides).is_err());

        overrides.insert(
            VariableId::Vp,
            VariableDefinition::new("hPa", "vp", 0.0, -32767.0, 0.0),
        );
        assert!(VariableRegistry::with_overrides(&overrides).is_err());

        overrides.insert(
            VariableId::Vp,
            VariableDefinition::new("hPa", "vp", f64::NAN, -32767.0, 0.0),
        );
        assert!(VariableRegistry::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_valid_override_replaces_builtin() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            VariableId::MaxTemp,
            VariableDefinition::new("K", "tmax_k", 0.1, -32767.0, 273.15),
        );
        let registry = VariableRegistry::with_overrides(&overrides).unwrap();
        assert_eq!(registry.get(VariableId::MaxTemp).unwrap().unit, "K");
    }

    #[test]
    fn test_apply_linear_transform() {
        let definition = VariableDefinition::new("mm", "rain_m", 0.1, -32767.0, 3276.5);
        assert!((definition.apply(10.0) - 3277.5).abs() < 1e-9);
    }
}
