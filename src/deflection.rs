// Deflection Model - kinetic impactor, gravity tractor, nuclear standoff
// Three views of the same push: 1-D miss distance, B-plane offset, osculating orbit

use serde::{Deserialize, Serialize};

use crate::config::DeflectionConfig;
use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, PhysicsError, Result};
use crate::impact_model::{DamageZone, ImpactAssessment};
use crate::orbital_mechanics::{
    elements_to_state, OrbitPropagator, OrbitalElements, RecoveredElements,
};
use crate::physics_engine::{
    sphere_mass, Vector3, AU, G, JOULES_PER_TON_TNT, MASS_SUN, METERS_PER_KM, SECONDS_PER_DAY,
};

// =============================================================================
// MISSION & TARGET
// =============================================================================

/// Deflection strategy with only the parameters it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DeflectionMethod {
    KineticImpactor {
        /// Momentum-enhancement factor from ejecta recoil (>= 1)
        beta: f64,
        impactor_mass_kg: f64,
        impactor_velocity_m_s: f64,
        /// Geometry factor for off-centre hits
        location_multiplier: f64,
    },
    GravityTractor {
        tractor_mass_kg: f64,
        /// Centre-to-centre distance, held constant for the whole mission
        hover_distance_m: f64,
    },
    NuclearStandoff {
        yield_kt: f64,
    },
}

impl DeflectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            DeflectionMethod::KineticImpactor { .. } => "kinetic_impactor",
            DeflectionMethod::GravityTractor { .. } => "gravity_tractor",
            DeflectionMethod::NuclearStandoff { .. } => "nuclear_standoff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeflectionMission {
    pub method: DeflectionMethod,
    pub warning_time_s: f64,
}

impl DeflectionMission {
    pub fn new(method: DeflectionMethod, warning_time_s: f64) -> Self {
        Self {
            method,
            warning_time_s,
        }
    }

    pub fn with_warning_days(method: DeflectionMethod, warning_days: f64) -> Self {
        Self::new(method, warning_days * SECONDS_PER_DAY)
    }
}

/// Physical properties of the target asteroid on its Earth-bound path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidProperties {
    pub diameter_m: f64,
    pub density_kg_m3: f64,
    /// Speed relative to Earth
    pub velocity_km_s: f64,
    /// Undeflected closest-approach distance from Earth's centre
    pub original_miss_distance_km: f64,
}

impl AsteroidProperties {
    pub fn mass_kg(&self) -> f64 {
        sphere_mass(self.diameter_m, self.density_kg_m3)
    }

    pub fn radius_m(&self) -> f64 {
        self.diameter_m / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("diameter_m", self.diameter_m)?;
        ensure_positive("density_kg_m3", self.density_kg_m3)?;
        ensure_positive("velocity_km_s", self.velocity_km_s)?;
        ensure_non_negative("original_miss_distance_km", self.original_miss_distance_km)?;
        Ok(())
    }
}

// =============================================================================
// RESULTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissDistanceResult {
    pub original_distance_km: f64,
    pub new_distance_km: f64,
    /// New distance exceeds Earth's radius
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DeflectionDetails {
    KineticImpactor {
        momentum_transfer_kg_m_s: f64,
        deflection_angle_rad: f64,
        travel_distance_km: f64,
    },
    GravityTractor {
        force_n: f64,
        acceleration_m_s2: f64,
    },
    NuclearStandoff {
        yield_j: f64,
        momentum_transfer_kg_m_s: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeflectionOutcome {
    pub method: DeflectionMethod,
    pub asteroid_mass_kg: f64,
    pub delta_v_m_s: f64,
    pub deflection_distance_km: f64,
    pub miss: MissDistanceResult,
    pub details: DeflectionDetails,
    /// min(1, new distance / Earth radius)
    pub success_probability: f64,
}

/// Velocity change in the radial / transverse / normal frame of the asteroid.
/// Impact consequences left after a deflection that may only partly succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigatedImpact {
    pub delta_v_m_s: f64,
    pub warning_time_s: f64,
    pub deflection_distance_km: f64,
    pub deflection_successful: bool,
    /// min(1, deflection distance / Earth radius)
    pub impact_probability_reduction: f64,
    /// 1 - reduction; energy scales with it, lengths with its fourth root
    pub residual_factor: f64,
    pub energy_tnt_tons: f64,
    pub final_crater_diameter_km: f64,
    pub damage_zones: Vec<DamageZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RtnVector {
    pub radial: f64,
    pub transverse: f64,
    pub normal: f64,
}

impl RtnVector {
    pub fn new(radial: f64, transverse: f64, normal: f64) -> Self {
        Self {
            radial,
            transverse,
            normal,
        }
    }

    pub fn as_vector(&self) -> Vector3 {
        Vector3::new(self.radial, self.transverse, self.normal)
    }

    pub fn magnitude(&self) -> f64 {
        self.as_vector().magnitude()
    }
}

/// Encounter geometry for the B-plane view, expressed in the RTN frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncounterGeometry {
    /// Direction of the incoming relative velocity (normalized on use)
    pub approach_direction: Vector3,
    /// Undeflected B-plane offset (km)
    pub initial_xi_km: f64,
    pub initial_zeta_km: f64,
    /// Heliocentric radius of the circular reference orbit
    pub reference_radius_au: f64,
}

impl EncounterGeometry {
    pub fn new(approach_direction: Vector3, reference_radius_au: f64) -> Self {
        Self {
            approach_direction,
            initial_xi_km: 0.0,
            initial_zeta_km: 0.0,
            reference_radius_au,
        }
    }

    pub fn with_offset(self, xi_km: f64, zeta_km: f64) -> Self {
        Self {
            initial_xi_km: xi_km,
            initial_zeta_km: zeta_km,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BPlaneResult {
    /// Relative displacement after the warning time (RTN, km)
    pub displacement_km: Vector3,
    pub xi_km: f64,
    pub zeta_km: f64,
    pub offset_km: f64,
    pub hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalDeflectionResult {
    pub original: OrbitalElements,
    pub deflected: RecoveredElements,
    /// Distance between the two propagated positions at the end of the warning time
    pub separation_km: f64,
    pub miss: MissDistanceResult,
}

// =============================================================================
// DEFLECTION MODEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeflectionModel {
    pub config: DeflectionConfig,
    pub propagator: OrbitPropagator,
}

impl DeflectionModel {
    pub fn from_config(config: &DeflectionConfig, propagator: OrbitPropagator) -> Self {
        Self {
            config: *config,
            propagator,
        }
    }

    fn required_shift_m(asteroid: &AsteroidProperties, target_miss_distance_km: f64) -> f64 {
        (target_miss_distance_km - asteroid.original_miss_distance_km).max(0.0) * METERS_PER_KM
    }

    fn miss_result(&self, original_km: f64, shift_km: f64) -> MissDistanceResult {
        let new_distance_km = original_km + shift_km;
        MissDistanceResult {
            original_distance_km: original_km,
            new_distance_km,
            success: new_distance_km > self.config.earth_radius_km,
        }
    }

    pub fn compute_deflection(
        &self,
        mission: &DeflectionMission,
        asteroid: &AsteroidProperties,
    ) -> Result<DeflectionOutcome> {
        asteroid.validate()?;
        let warning_time_s = ensure_positive("warning_time_s", mission.warning_time_s)?;
        let asteroid_mass_kg = asteroid.mass_kg();
        let asteroid_velocity_m_s = asteroid.velocity_km_s * METERS_PER_KM;

        let (delta_v_m_s, deflection_distance_km, details) = match mission.method {
            DeflectionMethod::KineticImpactor {
                beta,
                impactor_mass_kg,
                impactor_velocity_m_s,
                location_multiplier,
            } => {
                ensure_positive("beta", beta)?;
                ensure_positive("impactor_mass_kg", impactor_mass_kg)?;
                ensure_positive("impactor_velocity_m_s", impactor_velocity_m_s)?;
                ensure_non_negative("location_multiplier", location_multiplier)?;

                let momentum = beta * impactor_mass_kg * impactor_velocity_m_s;
                let delta_v = momentum / asteroid_mass_kg * location_multiplier;
                let angle = (delta_v / asteroid_velocity_m_s).atan();
                let travel_m = asteroid_velocity_m_s * warning_time_s;
                let shift_km = travel_m * angle.tan() / METERS_PER_KM;
                (
                    delta_v,
                    shift_km,
                    DeflectionDetails::KineticImpactor {
                        momentum_transfer_kg_m_s: momentum,
                        deflection_angle_rad: angle,
                        travel_distance_km: travel_m / METERS_PER_KM,
                    },
                )
            }
            DeflectionMethod::GravityTractor {
                tractor_mass_kg,
                hover_distance_m,
            } => {
                ensure_positive("tractor_mass_kg", tractor_mass_kg)?;
                check_hover_distance(asteroid, hover_distance_m)?;

                let force = G * tractor_mass_kg * asteroid_mass_kg
                    / (hover_distance_m * hover_distance_m);
                let accel = force / asteroid_mass_kg;
                let shift_m = 0.5 * accel * warning_time_s * warning_time_s;
                (
                    accel * warning_time_s,
                    shift_m / METERS_PER_KM,
                    DeflectionDetails::GravityTractor {
                        force_n: force,
                        acceleration_m_s2: accel,
                    },
                )
            }
            DeflectionMethod::NuclearStandoff { yield_kt } => {
                ensure_positive("yield_kt", yield_kt)?;
                let yield_j = yield_kt * JOULES_PER_TON_TNT * 1e3;
                let momentum = (2.0
                    * yield_j
                    * self.config.nuclear_coupling_efficiency
                    * asteroid_mass_kg)
                    .sqrt();
                let delta_v = momentum / asteroid_mass_kg;
                (
                    delta_v,
                    delta_v * warning_time_s / METERS_PER_KM,
                    DeflectionDetails::NuclearStandoff {
                        yield_j,
                        momentum_transfer_kg_m_s: momentum,
                    },
                )
            }
        };

        ensure_finite("delta_v", delta_v_m_s)?;
        ensure_finite("deflection_distance", deflection_distance_km)?;

        let miss = self.miss_result(asteroid.original_miss_distance_km, deflection_distance_km);
        let success_probability = (miss.new_distance_km / self.config.earth_radius_km).clamp(0.0, 1.0);

        log::debug!(
            "{}: dv = {:.3e} m/s, shift = {:.1} km, miss = {:.1} km (success: {})",
            mission.method.name(),
            delta_v_m_s,
            deflection_distance_km,
            miss.new_distance_km,
            miss.success
        );

        Ok(DeflectionOutcome {
            method: mission.method,
            asteroid_mass_kg,
            delta_v_m_s,
            deflection_distance_km,
            miss,
            details,
            success_probability,
        })
    }

    /// 1-D view of an impulsive push: lateral shift `v·T·tan(atan(Δv/v))`.
    pub fn linear_miss_distance(
        &self,
        delta_v_m_s: f64,
        asteroid: &AsteroidProperties,
        warning_time_s: f64,
    ) -> Result<MissDistanceResult> {
        asteroid.validate()?;
        ensure_non_negative("delta_v_m_s", delta_v_m_s)?;
        ensure_positive("warning_time_s", warning_time_s)?;
        let v = asteroid.velocity_km_s * METERS_PER_KM;
        let shift_km = v * warning_time_s * (delta_v_m_s / v).atan().tan() / METERS_PER_KM;
        Ok(self.miss_result(asteroid.original_miss_distance_km, shift_km))
    }

    /// Propagate an RTN impulse with Hill-Clohessy-Wiltshire relative motion
    /// about a circular heliocentric orbit and project it onto the B-plane.
    pub fn b_plane_projection(
        &self,
        delta_v: RtnVector,
        geometry: &EncounterGeometry,
        warning_time_s: f64,
    ) -> Result<BPlaneResult> {
        ensure_positive("warning_time_s", warning_time_s)?;
        ensure_positive("reference_radius_au", geometry.reference_radius_au)?;
        if !delta_v.as_vector().is_finite() {
            return Err(PhysicsError::NonFinite { quantity: "delta_v" });
        }
        let approach = geometry.approach_direction;
        if !approach.is_finite() || approach.magnitude() == 0.0 {
            return Err(PhysicsError::InvalidInput {
                field: "approach_direction",
                reason: "must be a finite non-zero vector".to_string(),
            });
        }
        let u = approach.normalize();

        let a = geometry.reference_radius_au * AU;
        let n = (G * MASS_SUN / (a * a * a)).sqrt();
        let nt = n * warning_time_s;
        let (sin_nt, cos_nt) = nt.sin_cos();

        // HCW solution from rest with initial velocity (dvR, dvT, dvN)
        let x = delta_v.radial / n * sin_nt + 2.0 * delta_v.transverse / n * (1.0 - cos_nt);
        let y = 2.0 * delta_v.radial / n * (cos_nt - 1.0)
            + delta_v.transverse / n * (4.0 * sin_nt - 3.0 * nt);
        let z = delta_v.normal / n * sin_nt;
        let displacement_km = Vector3::new(x, y, z).scale(1.0 / METERS_PER_KM);

        // ζ follows the along-track direction, ξ completes the right-handed pair
        let transverse = Vector3::new(0.0, 1.0, 0.0);
        let mut zeta_axis = transverse.sub(&u.scale(transverse.dot(&u)));
        if zeta_axis.magnitude() < 1e-9 {
            let normal = Vector3::new(0.0, 0.0, 1.0);
            zeta_axis = normal.sub(&u.scale(normal.dot(&u)));
        }
        let zeta_axis = zeta_axis.normalize();
        let xi_axis = u.cross(&zeta_axis);

        let xi_km = geometry.initial_xi_km + displacement_km.dot(&xi_axis);
        let zeta_km = geometry.initial_zeta_km + displacement_km.dot(&zeta_axis);
        let offset_km = xi_km.hypot(zeta_km);

        Ok(BPlaneResult {
            displacement_km,
            xi_km,
            zeta_km,
            offset_km,
            hit: offset_km < self.config.earth_radius_km,
        })
    }

    /// Apply an RTN impulse to the osculating orbit, re-derive the elements and
    /// measure how far apart the two orbits carry the asteroid by the encounter.
    pub fn orbital_recomputation(
        &self,
        elements: &OrbitalElements,
        delta_v: RtnVector,
        warning_time_s: f64,
        original_miss_distance_km: f64,
    ) -> Result<OrbitalDeflectionResult> {
        ensure_positive("warning_time_s", warning_time_s)?;
        ensure_non_negative("original_miss_distance_km", original_miss_distance_km)?;

        let state = elements_to_state(elements, MASS_SUN)?;
        let radial = state.position.normalize();
        let normal = state.position.cross(&state.velocity).normalize();
        let transverse = normal.cross(&radial);
        let inertial_dv = radial
            .scale(delta_v.radial)
            .add(&transverse.scale(delta_v.transverse))
            .add(&normal.scale(delta_v.normal));

        let deflected = self
            .propagator
            .apply_delta_v(elements, MASS_SUN, inertial_dv)?;

        let original_end = self
            .propagator
            .state_at(elements, MASS_SUN, warning_time_s)?;
        let deflected_end =
            self.propagator
                .state_at(&deflected.elements, MASS_SUN, warning_time_s)?;
        let separation_km =
            deflected_end.position.sub(&original_end.position).magnitude() / METERS_PER_KM;

        Ok(OrbitalDeflectionResult {
            original: *elements,
            deflected,
            separation_km,
            miss: self.miss_result(original_miss_distance_km, separation_km),
        })
    }

    /// Evaluate several missions against one asteroid, best miss distance first.
    pub fn compare_methods(
        &self,
        missions: &[DeflectionMission],
        asteroid: &AsteroidProperties,
    ) -> Result<Vec<DeflectionOutcome>> {
        let mut outcomes = missions
            .iter()
            .map(|mission| self.compute_deflection(mission, asteroid))
            .collect::<Result<Vec<_>>>()?;
        outcomes.sort_by(|a, b| b.miss.new_distance_km.total_cmp(&a.miss.new_distance_km));
        Ok(outcomes)
    }

    /// Impactor mass needed for a kinetic impact to reach `target_miss_distance_km`.
    pub fn required_impactor_mass(
        &self,
        asteroid: &AsteroidProperties,
        beta: f64,
        impactor_velocity_m_s: f64,
        location_multiplier: f64,
        warning_time_s: f64,
        target_miss_distance_km: f64,
    ) -> Result<f64> {
        asteroid.validate()?;
        ensure_positive("beta", beta)?;
        ensure_positive("impactor_velocity_m_s", impactor_velocity_m_s)?;
        ensure_positive("location_multiplier", location_multiplier)?;
        ensure_positive("warning_time_s", warning_time_s)?;
        ensure_finite("target_miss_distance_km", target_miss_distance_km)?;

        let shift_m = Self::required_shift_m(asteroid, target_miss_distance_km);
        // v·T·tan(atan(Δv/v)) reduces to Δv·T
        let delta_v = shift_m / warning_time_s;
        Ok(delta_v * asteroid.mass_kg() / (beta * impactor_velocity_m_s * location_multiplier))
    }

    /// Tractor mass that holds `hover_distance_m` long enough to reach
    /// `target_miss_distance_km`: ½·(G·m/d²)·T² = shift.
    pub fn required_tractor_mass(
        &self,
        asteroid: &AsteroidProperties,
        hover_distance_m: f64,
        warning_time_s: f64,
        target_miss_distance_km: f64,
    ) -> Result<f64> {
        asteroid.validate()?;
        check_hover_distance(asteroid, hover_distance_m)?;
        ensure_positive("warning_time_s", warning_time_s)?;
        ensure_finite("target_miss_distance_km", target_miss_distance_km)?;

        let shift_m = Self::required_shift_m(asteroid, target_miss_distance_km);
        let accel = 2.0 * shift_m / (warning_time_s * warning_time_s);
        Ok(accel * hover_distance_m * hover_distance_m / G)
    }

    /// Standoff yield (kt) whose coupled momentum reaches `target_miss_distance_km`.
    pub fn required_yield_kt(
        &self,
        asteroid: &AsteroidProperties,
        warning_time_s: f64,
        target_miss_distance_km: f64,
    ) -> Result<f64> {
        asteroid.validate()?;
        ensure_positive("warning_time_s", warning_time_s)?;
        ensure_finite("target_miss_distance_km", target_miss_distance_km)?;

        let delta_v = Self::required_shift_m(asteroid, target_miss_distance_km) / warning_time_s;
        // p = √(2·Y·η·M) = Δv·M
        let yield_j =
            delta_v * delta_v * asteroid.mass_kg() / (2.0 * self.config.nuclear_coupling_efficiency);
        Ok(yield_j / (JOULES_PER_TON_TNT * 1e3))
    }

    /// Residual consequences of an impactor on a collision course after a push.
    /// Δv builds up evenly over the warning time, so the shift is ½·Δv·T.
    pub fn mitigate_impact(
        &self,
        assessment: &ImpactAssessment,
        delta_v_m_s: f64,
        warning_time_s: f64,
    ) -> Result<MitigatedImpact> {
        ensure_non_negative("delta_v_m_s", delta_v_m_s)?;
        ensure_positive("warning_time_s", warning_time_s)?;

        let deflection_distance_km = 0.5 * delta_v_m_s * warning_time_s / METERS_PER_KM;
        let reduction = (deflection_distance_km / self.config.earth_radius_km).min(1.0);
        let residual = 1.0 - reduction;
        let length_scale = residual.powf(0.25);

        Ok(MitigatedImpact {
            delta_v_m_s,
            warning_time_s,
            deflection_distance_km,
            deflection_successful: deflection_distance_km > self.config.earth_radius_km,
            impact_probability_reduction: reduction,
            residual_factor: residual,
            energy_tnt_tons: assessment.energy_tnt_tons * residual,
            final_crater_diameter_km: assessment.final_crater_diameter_km * length_scale,
            damage_zones: assessment
                .damage_zones
                .iter()
                .map(|zone| DamageZone {
                    radius_km: zone.radius_km * length_scale,
                    ..*zone
                })
                .collect(),
        })
    }
}

fn check_hover_distance(asteroid: &AsteroidProperties, hover_distance_m: f64) -> Result<()> {
    ensure_positive("hover_distance_m", hover_distance_m)?;
    if hover_distance_m <= asteroid.radius_m() {
        return Err(PhysicsError::InvalidInput {
            field: "hover_distance_m",
            reason: format!(
                "{hover_distance_m} m is inside the asteroid (radius {} m)",
                asteroid.radius_m()
            ),
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
