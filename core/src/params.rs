//! Rate coefficients for one run.
//!
//! The vocabulary is fixed. Values live in a flat array indexed by
//! `ParamKey`, so lookups in the hot loop never hash a string.
//! A `ParameterSet` is immutable once a run starts; sweeps clone it
//! with `with()` and hand each run its own copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::{SimError, SimResult},
    types::SiteCount,
};

/// Stable parameter slots.
/// NEVER reorder or remove entries, only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum ParamKey {
    RHm = 0,
    RHmM = 1,
    RHmH = 2,
    RUh = 3,
    RUhM = 4,
    RUhH = 5,
    RMh = 6,
    RMhU = 7,
    RMhH = 8,
    RHu = 9,
    RHuU = 10,
    RHuH = 11,
    BirthRate = 12,
}

pub const PARAM_COUNT: usize = 13;

impl ParamKey {
    pub const ALL: [ParamKey; PARAM_COUNT] = [
        Self::RHm,
        Self::RHmM,
        Self::RHmH,
        Self::RUh,
        Self::RUhM,
        Self::RUhH,
        Self::RMh,
        Self::RMhU,
        Self::RMhH,
        Self::RHu,
        Self::RHuU,
        Self::RHuH,
        Self::BirthRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RHm => "r_hm",
            Self::RHmM => "r_hm_m",
            Self::RHmH => "r_hm_h",
            Self::RUh => "r_uh",
            Self::RUhM => "r_uh_m",
            Self::RUhH => "r_uh_h",
            Self::RMh => "r_mh",
            Self::RMhU => "r_mh_u",
            Self::RMhH => "r_mh_h",
            Self::RHu => "r_hu",
            Self::RHuU => "r_hu_u",
            Self::RHuH => "r_hu_h",
            Self::BirthRate => "birth_rate",
        }
    }

    pub fn from_name(name: &str) -> SimResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| SimError::UnknownParameter { key: name.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: [Option<f64>; PARAM_COUNT],
}

impl ParameterSet {
    /// A set with no coefficients. Every event that needs one will
    /// fail validation until it is supplied.
    pub fn empty() -> Self {
        Self { values: [None; PARAM_COUNT] }
    }

    /// Defaults for a population of `population` sites. Collaborative
    /// coefficients are scaled by 1/population so that the pairwise
    /// terms stay comparable to the linear ones as N grows.
    pub fn default_for_population(population: SiteCount) -> Self {
        let n = population.max(1) as f64;
        let mut set = Self::empty();
        let defaults = [
            (ParamKey::RHm, 0.5),
            (ParamKey::RHmM, 20.0 / n),
            (ParamKey::RHmH, 10.0 / n),
            (ParamKey::RUh, 0.35),
            (ParamKey::RUhM, 11.0 / n),
            (ParamKey::RUhH, 5.5 / n),
            (ParamKey::RMh, 0.1),
            (ParamKey::RMhU, 10.0 / n),
            (ParamKey::RMhH, 5.0 / n),
            (ParamKey::RHu, 0.1),
            (ParamKey::RHuU, 10.0 / n),
            (ParamKey::RHuH, 5.0 / n),
            (ParamKey::BirthRate, 1.6),
        ];
        for (key, value) in defaults {
            set.values[key as usize] = Some(value);
        }
        set
    }

    /// Build from a name→value map, rejecting names outside the vocabulary.
    pub fn from_map<'a, I>(entries: I) -> SimResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut set = Self::empty();
        for (name, value) in entries {
            let key = ParamKey::from_name(name)?;
            set.set(key, value)?;
        }
        Ok(set)
    }

    pub fn set(&mut self, key: ParamKey, value: f64) -> SimResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::config(format!(
                "parameter '{}' must be finite and non-negative, got {value}",
                key.name()
            )));
        }
        self.values[key as usize] = Some(value);
        Ok(())
    }

    /// Clone-and-modify, for callers that vary one coefficient between runs.
    pub fn with(&self, key: ParamKey, value: f64) -> SimResult<Self> {
        let mut next = self.clone();
        next.set(key, value)?;
        Ok(next)
    }

    pub fn get(&self, key: ParamKey) -> Option<f64> {
        self.values[key as usize]
    }

    /// Lookup for rate laws. Tables are validated before a run starts,
    /// so a miss here means a rate law reads a key it never declared.
    pub fn require(&self, key: ParamKey, event: &'static str) -> SimResult<f64> {
        self.get(key)
            .ok_or(SimError::MissingParameter { key: key.name(), event })
    }

    pub fn contains(&self, key: ParamKey) -> bool {
        self.values[key as usize].is_some()
    }

    fn to_map(&self) -> BTreeMap<&'static str, f64> {
        ParamKey::ALL
            .iter()
            .filter_map(|k| self.get(*k).map(|v| (k.name(), v)))
            .collect()
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParameterSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, f64> = BTreeMap::deserialize(deserializer)?;
        ParameterSet::from_map(raw.iter().map(|(k, v)| (k.as_str(), *v)))
            .map_err(serde::de::Error::custom)
    }
}
