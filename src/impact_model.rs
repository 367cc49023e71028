// Impact Consequence Model - energy, cratering, effect radii, tsunami, casualties
// Scaling laws after Collins, Melosh & Marcus (2005); SI internally, km at the output

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::ImpactConfig;
use crate::error::{ensure_non_negative, ensure_positive, PhysicsError, Result};
use crate::physics_engine::{
    sphere_mass, target_density, EARTH_GRAVITY, EARTH_RADIUS_KM, JOULES_PER_TON_TNT,
    METERS_PER_KM,
};

/// Transient crater diameter (km) above which the final crater is complex
pub const SIMPLE_COMPLEX_TRANSITION_KM: f64 = 3.2;

/// Mean ocean depth used when an ocean impact has no depth (m)
pub const MEAN_OCEAN_DEPTH_M: f64 = 3682.0;

/// Fraction of impact energy radiated as thermal energy
const LUMINOUS_EFFICIENCY: f64 = 3e-3;

/// Ejecta blanket thickness defining the ejecta zone edge (m)
const EJECTA_THICKNESS_THRESHOLD_M: f64 = 1e-3;

/// Effective seismic magnitude defining the seismic zone edge
const SEISMIC_DAMAGE_MAGNITUDE: f64 = 4.0;

/// Tsunami amplitude defining the inundation reach (m)
const TSUNAMI_REACH_AMPLITUDE_M: f64 = 1.0;

// =============================================================================
// SCENARIO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Surface {
    Land,
    Ocean { water_depth_m: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactScenario {
    pub diameter_m: f64,
    pub velocity_km_s: f64,
    pub density_kg_m3: f64,
    /// Entry angle above the horizontal, (0, 90]
    pub angle_deg: f64,
    pub target_density_kg_m3: f64,
    pub surface: Surface,
}

impl ImpactScenario {
    /// Land impact into crystalline rock.
    pub fn land(diameter_m: f64, velocity_km_s: f64, density_kg_m3: f64, angle_deg: f64) -> Self {
        Self {
            diameter_m,
            velocity_km_s,
            density_kg_m3,
            angle_deg,
            target_density_kg_m3: target_density::ROCK,
            surface: Surface::Land,
        }
    }

    /// Ocean impact; without a depth the mean ocean depth is used.
    pub fn ocean(
        diameter_m: f64,
        velocity_km_s: f64,
        density_kg_m3: f64,
        angle_deg: f64,
        water_depth_m: Option<f64>,
    ) -> Self {
        Self {
            diameter_m,
            velocity_km_s,
            density_kg_m3,
            angle_deg,
            target_density_kg_m3: target_density::SEAWATER,
            surface: Surface::Ocean {
                water_depth_m: water_depth_m.unwrap_or(MEAN_OCEAN_DEPTH_M),
            },
        }
    }

    pub fn with_target_density(self, target_density_kg_m3: f64) -> Self {
        Self {
            target_density_kg_m3,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("diameter_m", self.diameter_m)?;
        ensure_positive("velocity_km_s", self.velocity_km_s)?;
        ensure_positive("density_kg_m3", self.density_kg_m3)?;
        ensure_positive("target_density_kg_m3", self.target_density_kg_m3)?;
        ensure_positive("angle_deg", self.angle_deg)?;
        if self.angle_deg > 90.0 {
            return Err(PhysicsError::InvalidInput {
                field: "angle_deg",
                reason: format!("must be in (0, 90], got {}", self.angle_deg),
            });
        }
        if let Surface::Ocean { water_depth_m } = self.surface {
            ensure_positive("water_depth_m", water_depth_m)?;
        }
        Ok(())
    }

    pub fn is_ocean(&self) -> bool {
        matches!(self.surface, Surface::Ocean { .. })
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraterRegime {
    Simple,
    Complex,
}

/// Damage zones in canonical nesting order, plus the coastal tsunami band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Crater,
    Fireball,
    Thermal,
    AirBlast,
    Ejecta,
    Seismic,
    Tsunami,
}

impl ZoneKind {
    pub fn label(&self) -> &'static str {
        match self {
            ZoneKind::Crater => "crater",
            ZoneKind::Fireball => "fireball",
            ZoneKind::Thermal => "thermal radiation",
            ZoneKind::AirBlast => "air blast",
            ZoneKind::Ejecta => "ejecta",
            ZoneKind::Seismic => "seismic",
            ZoneKind::Tsunami => "tsunami",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageZone {
    pub kind: ZoneKind,
    /// Outer radius after nesting is enforced
    pub radius_km: f64,
    pub mortality_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CasualtyEstimate {
    pub zone: ZoneKind,
    /// Area of this zone's annulus, excluding every inner zone
    pub annular_area_km2: f64,
    pub population_exposed: f64,
    pub casualties: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TsunamiEffects {
    pub water_depth_m: f64,
    pub rim_wave_amplitude_m: f64,
    pub collapse_wave_amplitude_m: f64,
    pub wavelength_m: f64,
    pub wave_speed_m_s: f64,
    /// Depth below a twentieth of the wavelength
    pub shallow_water: bool,
    pub energy_j: f64,
    /// Distance from ground zero where the wave falls to 1 m
    pub reach_radius_km: f64,
    pub arrival_time_s: f64,
}

/// Overall risk graded on total casualties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Severity of a single physical factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Extreme,
}

impl ThreatLevel {
    fn grade(value: f64, thresholds: [f64; 4]) -> Self {
        let [low, moderate, high, extreme] = thresholds;
        if value > extreme {
            ThreatLevel::Extreme
        } else if value > high {
            ThreatLevel::High
        } else if value > moderate {
            ThreatLevel::Moderate
        } else if value > low {
            ThreatLevel::Low
        } else {
            ThreatLevel::Minimal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub energy: ThreatLevel,
    pub crater: ThreatLevel,
    pub seismic: ThreatLevel,
    pub tsunami: ThreatLevel,
}

impl RiskBreakdown {
    pub fn worst(&self) -> ThreatLevel {
        self.energy
            .max(self.crater)
            .max(self.seismic)
            .max(self.tsunami)
    }
}

/// Consequences of one impact scenario.
///
/// `transient_crater_diameter_km` rises with diameter, velocity and density.
/// `final_crater_diameter_km` does not always: at the 3.2 km simple/complex
/// switch the complex law starts about 6% below the simple one, so a faster
/// impactor that crosses the switch leaves a slightly smaller final crater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub scenario: ImpactScenario,
    pub mass_kg: f64,
    pub energy_j: f64,
    pub energy_tnt_tons: f64,
    pub energy_megatons: f64,
    pub transient_crater_diameter_km: f64,
    pub crater_regime: CraterRegime,
    pub final_crater_diameter_km: f64,
    pub crater_depth_km: f64,
    pub fireball_radius_km: f64,
    pub thermal_radius_km: f64,
    pub air_blast_radius_km: f64,
    pub ejecta_radius_km: f64,
    pub seismic_magnitude: f64,
    pub seismic_radius_km: f64,
    pub tsunami: Option<TsunamiEffects>,
    pub damage_zones: Vec<DamageZone>,
    pub casualties: Vec<CasualtyEstimate>,
    pub total_casualties: f64,
    pub population_known: bool,
    pub risk_level: RiskLevel,
    pub risk_breakdown: RiskBreakdown,
    pub advice: Vec<String>,
}

impl ImpactAssessment {
    pub fn zone(&self, kind: ZoneKind) -> Option<&DamageZone> {
        self.damage_zones.iter().find(|z| z.kind == kind)
    }

    /// Outermost zone radius including the tsunami reach.
    pub fn max_effect_radius_km(&self) -> f64 {
        let seismic = self
            .damage_zones
            .last()
            .map(|z| z.radius_km)
            .unwrap_or(0.0);
        let tsunami = self.tsunami.map(|t| t.reach_radius_km).unwrap_or(0.0);
        seismic.max(tsunami)
    }
}

// =============================================================================
// BATCH TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub scenario: ImpactScenario,
    pub population_density: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub name: String,
    pub assessment: Option<ImpactAssessment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_scenarios: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate_pct: f64,
    pub worst_scenario: Option<String>,
    pub max_total_casualties: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
    pub summary: BatchSummary,
}

// =============================================================================
// SCALING LAWS
// =============================================================================

/// Transient crater diameter (m), Collins et al. (2005) eq. 21.
pub fn transient_crater_diameter_m(scenario: &ImpactScenario) -> f64 {
    let velocity_m_s = scenario.velocity_km_s * METERS_PER_KM;
    1.161
        * (scenario.density_kg_m3 / scenario.target_density_kg_m3).powf(1.0 / 3.0)
        * scenario.diameter_m.powf(0.78)
        * velocity_m_s.powf(0.44)
        * EARTH_GRAVITY.powf(-0.22)
        * scenario.angle_deg.to_radians().sin().powf(1.0 / 3.0)
}

/// Final crater diameter and depth (km) from the transient diameter.
pub fn final_crater(transient_diameter_km: f64) -> (CraterRegime, f64, f64) {
    if transient_diameter_km < SIMPLE_COMPLEX_TRANSITION_KM {
        let diameter = 1.25 * transient_diameter_km;
        (CraterRegime::Simple, diameter, 0.2 * diameter)
    } else {
        let diameter = 1.17 * transient_diameter_km.powf(1.13)
            / SIMPLE_COMPLEX_TRANSITION_KM.powf(0.13);
        (CraterRegime::Complex, diameter, 0.4 * diameter.powf(0.3))
    }
}

/// Fireball radius (m).
pub fn fireball_radius_m(energy_j: f64) -> f64 {
    0.002 * energy_j.powf(1.0 / 3.0)
}

/// Range (m) where radiant exposure drops to the burn threshold.
pub fn thermal_radius_m(energy_j: f64) -> f64 {
    let megatons = energy_j / (JOULES_PER_TON_TNT * 1e6);
    let threshold = 2.5e5 * megatons.powf(1.0 / 6.0);
    (LUMINOUS_EFFICIENCY * energy_j / (2.0 * PI * threshold)).sqrt()
}

/// Range (km) of the ~3 psi overpressure contour.
pub fn air_blast_radius_km(energy_j: f64) -> f64 {
    let kilotons = energy_j / (JOULES_PER_TON_TNT * 1e3);
    0.54 * kilotons.powf(1.0 / 3.0)
}

/// Range (m) where the ejecta blanket thins to 1 mm.
pub fn ejecta_radius_m(transient_diameter_m: f64) -> f64 {
    (transient_diameter_m.powi(4) / (112.0 * EJECTA_THICKNESS_THRESHOLD_M)).powf(1.0 / 3.0)
}

pub fn seismic_magnitude(energy_j: f64) -> f64 {
    0.67 * energy_j.log10() - 5.87
}

/// Effective magnitude at a distance, three-segment attenuation.
pub fn effective_seismic_magnitude(magnitude: f64, distance_km: f64) -> f64 {
    if distance_km < 60.0 {
        magnitude - 0.0238 * distance_km
    } else if distance_km < 700.0 {
        magnitude - 0.0048 * distance_km - 1.1644
    } else {
        let delta_rad = distance_km / EARTH_RADIUS_KM;
        magnitude - 1.66 * delta_rad.log10() - 6.399
    }
}

/// Distance (km) where the effective magnitude falls to 4.0.
pub fn seismic_damage_radius_km(magnitude: f64) -> f64 {
    let excess = magnitude - SEISMIC_DAMAGE_MAGNITUDE;
    if excess <= 0.0 {
        return 0.0;
    }
    let near = excess / 0.0238;
    if near < 60.0 {
        return near;
    }
    let regional = (excess - 1.1644) / 0.0048;
    if regional < 700.0 {
        return regional.max(60.0);
    }
    // The far segment starts below the regional one at 700 km
    let far = EARTH_RADIUS_KM * 10f64.powf((excess - 6.399) / 1.66);
    far.max(700.0)
}

fn tsunami_effects(
    transient_diameter_m: f64,
    water_depth_m: f64,
    energy_j: f64,
    energy_fraction: f64,
) -> TsunamiEffects {
    let rim = (transient_diameter_m / 14.1).min(water_depth_m);
    let transient_depth = transient_diameter_m / (2.0 * 2f64.sqrt());
    let collapse = (0.06 * transient_depth).min(water_depth_m);

    let wavelength = 2.0 * transient_diameter_m;
    let shallow_water = water_depth_m < wavelength / 20.0;
    let wave_speed = if shallow_water {
        (EARTH_GRAVITY * water_depth_m).sqrt()
    } else {
        (EARTH_GRAVITY * wavelength / (2.0 * PI)).sqrt()
    };

    // Amplitude decays as 1/r from the transient crater rim
    let rim_radius = transient_diameter_m / 2.0;
    let source = rim.max(collapse);
    let reach = if source > TSUNAMI_REACH_AMPLITUDE_M {
        rim_radius * source / TSUNAMI_REACH_AMPLITUDE_M
    } else {
        rim_radius
    };

    TsunamiEffects {
        water_depth_m,
        rim_wave_amplitude_m: rim,
        collapse_wave_amplitude_m: collapse,
        wavelength_m: wavelength,
        wave_speed_m_s: wave_speed,
        shallow_water,
        energy_j: energy_fraction * energy_j,
        reach_radius_km: reach / METERS_PER_KM,
        arrival_time_s: (reach - rim_radius) / wave_speed,
    }
}

// =============================================================================
// IMPACT MODEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpactModel {
    pub config: ImpactConfig,
}

impl ImpactModel {
    pub fn from_config(config: &ImpactConfig) -> Self {
        Self { config: *config }
    }

    fn mortality(&self, kind: ZoneKind) -> f64 {
        let m = &self.config.mortality;
        match kind {
            ZoneKind::Crater => m.crater,
            ZoneKind::Fireball => m.fireball,
            ZoneKind::Thermal => m.thermal,
            ZoneKind::AirBlast => m.air_blast,
            ZoneKind::Ejecta => m.ejecta,
            ZoneKind::Seismic => m.seismic,
            ZoneKind::Tsunami => m.tsunami,
        }
    }

    /// Full consequence assessment. `population_density` is persons/km²;
    /// `None` means unknown and yields zero casualties.
    pub fn compute_impact(
        &self,
        scenario: &ImpactScenario,
        population_density: Option<f64>,
    ) -> Result<ImpactAssessment> {
        scenario.validate()?;
        let density = population_density
            .map(|d| ensure_non_negative("population_density", d))
            .transpose()?;

        // Energy
        let mass_kg = sphere_mass(scenario.diameter_m, scenario.density_kg_m3);
        let velocity_m_s = scenario.velocity_km_s * METERS_PER_KM;
        let energy_j = 0.5 * mass_kg * velocity_m_s * velocity_m_s;
        let energy_tnt_tons = energy_j / JOULES_PER_TON_TNT;
        let energy_megatons = energy_tnt_tons / 1e6;

        // Cratering
        let transient_m = transient_crater_diameter_m(scenario);
        let transient_km = transient_m / METERS_PER_KM;
        let (crater_regime, final_crater_diameter_km, crater_depth_km) = final_crater(transient_km);

        // Effect radii
        let fireball_radius_km = fireball_radius_m(energy_j) / METERS_PER_KM;
        let thermal_radius_km = thermal_radius_m(energy_j) / METERS_PER_KM;
        let air_blast_radius_km = air_blast_radius_km(energy_j);
        let ejecta_radius_km = ejecta_radius_m(transient_m) / METERS_PER_KM;
        let seismic_magnitude = seismic_magnitude(energy_j);
        let seismic_radius_km = seismic_damage_radius_km(seismic_magnitude);

        let tsunami = match scenario.surface {
            Surface::Land => None,
            Surface::Ocean { water_depth_m } => Some(tsunami_effects(
                transient_m,
                water_depth_m,
                energy_j,
                self.config.tsunami_energy_fraction,
            )),
        };

        let damage_zones = self.nest_zones([
            (ZoneKind::Crater, final_crater_diameter_km / 2.0),
            (ZoneKind::Fireball, fireball_radius_km),
            (ZoneKind::Thermal, thermal_radius_km),
            (ZoneKind::AirBlast, air_blast_radius_km),
            (ZoneKind::Ejecta, ejecta_radius_km),
            (ZoneKind::Seismic, seismic_radius_km),
        ]);

        let casualties = self.casualties(&damage_zones, tsunami.as_ref(), density);
        let total_casualties = casualties.iter().map(|c| c.casualties).sum();

        let risk_level = self.risk_level(total_casualties);
        let risk_breakdown = RiskBreakdown {
            energy: ThreatLevel::grade(energy_tnt_tons, [10.0, 100.0, 1_000.0, 10_000.0]),
            crater: ThreatLevel::grade(final_crater_diameter_km, [0.3, 1.0, 3.0, 10.0]),
            seismic: ThreatLevel::grade(seismic_magnitude, [5.0, 6.0, 7.0, 8.0]),
            tsunami: tsunami_threat(tsunami.as_ref()),
        };
        let advice = impact_advice(energy_tnt_tons, final_crater_diameter_km, &risk_breakdown);

        let assessment = ImpactAssessment {
            scenario: *scenario,
            mass_kg,
            energy_j,
            energy_tnt_tons,
            energy_megatons,
            transient_crater_diameter_km: transient_km,
            crater_regime,
            final_crater_diameter_km,
            crater_depth_km,
            fireball_radius_km,
            thermal_radius_km,
            air_blast_radius_km,
            ejecta_radius_km,
            seismic_magnitude,
            seismic_radius_km,
            tsunami,
            damage_zones,
            casualties,
            total_casualties,
            population_known: density.is_some(),
            risk_level,
            risk_breakdown,
            advice,
        };

        if !assessment.energy_j.is_finite() || !assessment.max_effect_radius_km().is_finite() {
            return Err(PhysicsError::NonFinite {
                quantity: "impact assessment",
            });
        }
        Ok(assessment)
    }

    /// Clamp radii to the running maximum so every zone contains the previous one.
    fn nest_zones(&self, raw: [(ZoneKind, f64); 6]) -> Vec<DamageZone> {
        let mut outer = 0.0f64;
        raw.into_iter()
            .map(|(kind, radius_km)| {
                if radius_km < outer {
                    log::warn!(
                        "{} radius {:.3} km lies inside an inner zone ({:.3} km); annulus is empty",
                        kind.label(),
                        radius_km,
                        outer
                    );
                }
                outer = outer.max(radius_km);
                DamageZone {
                    kind,
                    radius_km: outer,
                    mortality_rate: self.mortality(kind),
                }
            })
            .collect()
    }

    fn casualties(
        &self,
        zones: &[DamageZone],
        tsunami: Option<&TsunamiEffects>,
        density: Option<f64>,
    ) -> Vec<CasualtyEstimate> {
        let density = density.unwrap_or(0.0);
        let mut inner = 0.0f64;
        let mut estimates: Vec<CasualtyEstimate> = zones
            .iter()
            .map(|zone| {
                let area = PI * (zone.radius_km * zone.radius_km - inner * inner);
                inner = zone.radius_km;
                let exposed = area * density;
                CasualtyEstimate {
                    zone: zone.kind,
                    annular_area_km2: area,
                    population_exposed: exposed,
                    casualties: exposed * zone.mortality_rate,
                }
            })
            .collect();

        // Coastal band beyond the seismic disc
        if let Some(tsunami) = tsunami {
            let reach = tsunami.reach_radius_km.max(inner);
            let area = PI * (reach * reach - inner * inner);
            let exposed = area * density * self.config.coastal_population_factor;
            estimates.push(CasualtyEstimate {
                zone: ZoneKind::Tsunami,
                annular_area_km2: area,
                population_exposed: exposed,
                casualties: exposed * self.mortality(ZoneKind::Tsunami),
            });
        }
        estimates
    }

    fn risk_level(&self, total_casualties: f64) -> RiskLevel {
        if total_casualties < self.config.moderate_risk_casualties {
            RiskLevel::Low
        } else if total_casualties < self.config.high_risk_casualties {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    /// Evaluate independent scenarios in parallel; failures are reported per entry.
    pub fn batch_compute_impacts(&self, entries: &[BatchEntry]) -> BatchReport {
        log::debug!("evaluating {} impact scenarios", entries.len());

        let results: Vec<BatchResult> = entries
            .par_iter()
            .map(
                |entry| match self.compute_impact(&entry.scenario, entry.population_density) {
                    Ok(assessment) => BatchResult {
                        name: entry.name.clone(),
                        assessment: Some(assessment),
                        error: None,
                    },
                    Err(e) => BatchResult {
                        name: entry.name.clone(),
                        assessment: None,
                        error: Some(e.to_string()),
                    },
                },
            )
            .collect();

        let successful = results.iter().filter(|r| r.assessment.is_some()).count();
        let worst = results
            .iter()
            .filter_map(|r| r.assessment.as_ref().map(|a| (r, a.total_casualties)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let summary = BatchSummary {
            total_scenarios: entries.len(),
            successful,
            failed: entries.len() - successful,
            success_rate_pct: if entries.is_empty() {
                0.0
            } else {
                successful as f64 / entries.len() as f64 * 100.0
            },
            worst_scenario: worst.map(|(r, _)| r.name.clone()),
            max_total_casualties: worst.map(|(_, c)| c).unwrap_or(0.0),
        };

        BatchReport { results, summary }
    }
}

fn tsunami_threat(tsunami: Option<&TsunamiEffects>) -> ThreatLevel {
    match tsunami {
        None => ThreatLevel::Minimal,
        Some(t) if t.rim_wave_amplitude_m > 10.0 => ThreatLevel::High,
        Some(t) if t.rim_wave_amplitude_m > 1.0 => ThreatLevel::Moderate,
        Some(_) => ThreatLevel::Low,
    }
}

fn impact_advice(
    energy_tnt_tons: f64,
    crater_diameter_km: f64,
    breakdown: &RiskBreakdown,
) -> Vec<String> {
    let mut advice = Vec::new();

    if energy_tnt_tons < 1e-3 {
        advice.push("Very small event - local damage only, if any.");
    } else if energy_tnt_tons < 100.0 {
        advice.push("Regional damage possible - monitor local authorities.");
    } else if energy_tnt_tons < 10_000.0 {
        advice.push("High-energy impact with potential for large-scale effects.");
        advice.push("Emergency planning and evacuation may be necessary.");
    } else {
        advice.push("Extreme impact event - global consequences possible.");
        advice.push("Immediate emergency response and international coordination required.");
    }

    match breakdown.tsunami {
        ThreatLevel::High | ThreatLevel::Extreme => {
            advice.push("High tsunami risk - coastal evacuation recommended.")
        }
        ThreatLevel::Moderate => {
            advice.push("Moderate tsunami risk - coastal areas should be prepared.")
        }
        _ => {}
    }

    if breakdown.seismic >= ThreatLevel::High {
        advice.push("Strong ground shaking expected - reinforce critical infrastructure.");
    }

    if crater_diameter_km > 5.0 {
        advice.push("Large crater formation - significant geological changes expected.");
    }

    advice.into_iter().map(String::from).collect()
}

// =============================================================================
// TESTS
// =============================================================================
