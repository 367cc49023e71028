// Engine Configuration - tunable parameters for every model
// Loaded from JSON by the calling layer; every section has physical defaults.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

/// Newton-Raphson controls for Kepler's equation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeplerConfig {
    /// Convergence tolerance on |ΔE| (radians)
    pub tolerance: f64,
    /// Hard iteration cap
    pub max_iterations: u32,
}

impl Default for KeplerConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Plummer softening length (m), added in quadrature to pair separations
    pub softening_length_m: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            softening_length_m: crate::physics_engine::DEFAULT_SOFTENING_LENGTH_M,
        }
    }
}

/// Fraction of the exposed population killed inside each damage zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityRates {
    pub crater: f64,
    pub fireball: f64,
    pub thermal: f64,
    pub air_blast: f64,
    pub ejecta: f64,
    pub seismic: f64,
    pub tsunami: f64,
}

impl Default for MortalityRates {
    fn default() -> Self {
        Self {
            crater: 1.0,
            fireball: 0.95,
            thermal: 0.85,
            air_blast: 0.35,
            ejecta: 0.10,
            seismic: 0.02,
            tsunami: 0.45,
        }
    }
}

impl MortalityRates {
    fn all(&self) -> [(&'static str, f64); 7] {
        [
            ("crater", self.crater),
            ("fireball", self.fireball),
            ("thermal", self.thermal),
            ("air_blast", self.air_blast),
            ("ejecta", self.ejecta),
            ("seismic", self.seismic),
            ("tsunami", self.tsunami),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub mortality: MortalityRates,
    /// Share of the ambient population living on exposed coastline
    pub coastal_population_factor: f64,
    /// Share of impact energy coupled into the tsunami (0.1 - 1 %)
    pub tsunami_energy_fraction: f64,
    /// Total casualties at which risk becomes Moderate
    pub moderate_risk_casualties: f64,
    /// Total casualties at which risk becomes High
    pub high_risk_casualties: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            mortality: MortalityRates::default(),
            coastal_population_factor: 0.3,
            tsunami_energy_fraction: 0.005,
            moderate_risk_casualties: 1_000.0,
            high_risk_casualties: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeflectionConfig {
    /// Miss distance below which the asteroid hits (km)
    pub earth_radius_km: f64,
    /// Ejecta momentum efficiency for nuclear standoff bursts
    pub nuclear_coupling_efficiency: f64,
}

impl Default for DeflectionConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: crate::physics_engine::EARTH_RADIUS_KM,
            nuclear_coupling_efficiency: 0.01,
        }
    }
}

/// Top-level configuration handed to the model constructors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kepler: KeplerConfig,
    pub integrator: IntegratorConfig,
    pub impact: ImpactConfig,
    pub deflection: DeflectionConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| PhysicsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PhysicsError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.kepler.tolerance > 0.0 && self.kepler.tolerance.is_finite()) {
            return Err(PhysicsError::Config(
                "kepler.tolerance must be a positive number".to_string(),
            ));
        }
        if self.kepler.max_iterations == 0 {
            return Err(PhysicsError::Config(
                "kepler.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.integrator.softening_length_m >= 0.0
            && self.integrator.softening_length_m.is_finite())
        {
            return Err(PhysicsError::Config(
                "integrator.softening_length_m must be >= 0".to_string(),
            ));
        }
        for (zone, rate) in self.impact.mortality.all() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PhysicsError::Config(format!(
                    "impact.mortality.{zone} must be in [0, 1], got {rate}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.impact.coastal_population_factor) {
            return Err(PhysicsError::Config(
                "impact.coastal_population_factor must be in [0, 1]".to_string(),
            ));
        }
        if !(self.impact.tsunami_energy_fraction > 0.0 && self.impact.tsunami_energy_fraction <= 1.0)
        {
            return Err(PhysicsError::Config(
                "impact.tsunami_energy_fraction must be in (0, 1]".to_string(),
            ));
        }
        if !(self.impact.moderate_risk_casualties < self.impact.high_risk_casualties) {
            return Err(PhysicsError::Config(
                "impact risk thresholds must be strictly increasing".to_string(),
            ));
        }
        if !(self.deflection.earth_radius_km > 0.0) {
            return Err(PhysicsError::Config(
                "deflection.earth_radius_km must be > 0".to_string(),
            ));
        }
        if !(self.deflection.nuclear_coupling_efficiency > 0.0
            && self.deflection.nuclear_coupling_efficiency <= 1.0)
        {
            return Err(PhysicsError::Config(
                "deflection.nuclear_coupling_efficiency must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
