// Orbital Mechanics - Kepler solver, element/state conversion, orbit sampling
// Elements come in AU/degrees from collaborators and are converted to SI here

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::config::KeplerConfig;
use crate::error::{ensure_finite, ensure_positive, ensure_range, PhysicsError, Result};
use crate::physics_engine::{
    StateVector, Trajectory, TrajectoryPoint, Vector3, AU, G, MASS_SUN, SECONDS_PER_DAY,
};

/// Julian Date of the J2000 epoch (2000-01-01 12:00 TT)
pub const J2000_JULIAN_DATE: f64 = 2451545.0;

/// Julian Date of the Unix epoch
const UNIX_EPOCH_JULIAN_DATE: f64 = 2440587.5;

/// Below this |n|/|h| ratio (sin i) the ascending node is treated as undefined
pub const EQUATORIAL_TOLERANCE: f64 = 1e-10;

/// Below this eccentricity the periapsis direction is treated as undefined
pub const CIRCULAR_TOLERANCE: f64 = 1e-10;

// =============================================================================
// KEPLER SOLVER
// =============================================================================

/// Outcome of one Kepler solve. `converged == false` means the iteration cap
/// was hit and `eccentric_anomaly` is the last iterate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolution {
    /// Eccentric anomaly E (radians), in the same branch as the normalized M
    pub eccentric_anomaly: f64,
    pub iterations: u32,
    pub converged: bool,
    /// |E - e·sin(E) - M| at the returned E
    pub residual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolver {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self::from_config(&KeplerConfig::default())
    }
}

impl KeplerSolver {
    pub fn from_config(config: &KeplerConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }

    /// Solve Kepler's equation M = E - e*sin(E) using Newton-Raphson
    pub fn solve(&self, eccentricity: f64, mean_anomaly: f64) -> Result<KeplerSolution> {
        let e = ensure_range("eccentricity", eccentricity, 0.0, 1.0)?;
        let m = normalize_signed_angle(ensure_finite("mean_anomaly", mean_anomaly)?);

        // Linear guess diverges for near-parabolic orbits, start from apoapsis there
        let mut e_anom = if e < 0.8 { m } else { PI.copysign(m) };
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let f = e_anom - e * e_anom.sin() - m;
            let f_prime = 1.0 - e * e_anom.cos();
            let delta = f / f_prime;
            e_anom -= delta;

            if delta.abs() < self.tolerance {
                converged = true;
                break;
            }
        }

        let residual = (e_anom - e * e_anom.sin() - m).abs();
        if !converged {
            log::warn!(
                "Kepler solver hit {} iterations without converging (e = {}, M = {}, residual = {:e})",
                self.max_iterations,
                e,
                m,
                residual
            );
        }

        Ok(KeplerSolution {
            eccentric_anomaly: e_anom,
            iterations,
            converged,
            residual,
        })
    }
}

/// Map an angle into (-π, π].
pub fn normalize_signed_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Map an angle in degrees into [0, 360).
pub fn normalize_degrees(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// True anomaly from eccentric anomaly, half-angle form.
/// ν = 2 * atan2(sqrt(1+e) * sin(E/2), sqrt(1-e) * cos(E/2))
pub fn eccentric_to_true_anomaly(eccentricity: f64, eccentric_anomaly: f64) -> f64 {
    let half_e = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + eccentricity).sqrt() * half_e.sin())
        .atan2((1.0 - eccentricity).sqrt() * half_e.cos())
}

/// Eccentric anomaly from true anomaly, half-angle form.
pub fn true_to_eccentric_anomaly(eccentricity: f64, true_anomaly: f64) -> f64 {
    let half_nu = true_anomaly / 2.0;
    2.0 * ((1.0 - eccentricity).sqrt() * half_nu.sin())
        .atan2((1.0 + eccentricity).sqrt() * half_nu.cos())
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (AU)
    pub semi_major_axis_au: f64,
    /// Eccentricity (0-1 for elliptical)
    pub eccentricity: f64,
    /// Inclination (degrees)
    pub inclination_deg: f64,
    /// Longitude of ascending node Ω (degrees)
    pub raan_deg: f64,
    /// Argument of periapsis ω (degrees)
    pub arg_periapsis_deg: f64,
    /// Mean anomaly at epoch (degrees)
    pub mean_anomaly_deg: f64,
}

impl OrbitalElements {
    pub fn new(
        semi_major_axis_au: f64,
        eccentricity: f64,
        inclination_deg: f64,
        raan_deg: f64,
        arg_periapsis_deg: f64,
        mean_anomaly_deg: f64,
    ) -> Result<Self> {
        let elements = Self {
            semi_major_axis_au,
            eccentricity,
            inclination_deg,
            raan_deg,
            arg_periapsis_deg,
            mean_anomaly_deg,
        };
        elements.validate()?;
        Ok(elements)
    }

    /// Closed-orbit checks: a > 0, 0 <= e < 1, finite angles.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("semi_major_axis_au", self.semi_major_axis_au)?;
        ensure_range("eccentricity", self.eccentricity, 0.0, 1.0)?;
        ensure_finite("inclination_deg", self.inclination_deg)?;
        ensure_finite("raan_deg", self.raan_deg)?;
        ensure_finite("arg_periapsis_deg", self.arg_periapsis_deg)?;
        ensure_finite("mean_anomaly_deg", self.mean_anomaly_deg)?;
        Ok(())
    }

    pub fn semi_major_axis_m(&self) -> f64 {
        self.semi_major_axis_au * AU
    }

    /// Mean motion n = sqrt(μ/a³) in rad/s
    pub fn mean_motion(&self, central_mass_kg: f64) -> f64 {
        let a = self.semi_major_axis_m();
        (G * central_mass_kg / (a * a * a)).sqrt()
    }

    /// Orbital period in seconds
    pub fn period_s(&self, central_mass_kg: f64) -> f64 {
        TAU / self.mean_motion(central_mass_kg)
    }

    pub fn perihelion_au(&self) -> f64 {
        self.semi_major_axis_au * (1.0 - self.eccentricity)
    }

    pub fn aphelion_au(&self) -> f64 {
        self.semi_major_axis_au * (1.0 + self.eccentricity)
    }

    pub fn with_mean_anomaly_deg(&self, mean_anomaly_deg: f64) -> Self {
        Self {
            mean_anomaly_deg,
            ..*self
        }
    }
}

/// Flags raised when an angle is ill-defined by the geometry of the orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryDegeneracy {
    /// Node vector vanishes: Ω is fixed to 0 and ω is measured from +x
    pub equatorial: bool,
    /// Periapsis undefined: ω is fixed to 0 and ν is measured from the node
    /// (or from +x when also equatorial)
    pub circular: bool,
}

impl GeometryDegeneracy {
    pub fn any(&self) -> bool {
        self.equatorial || self.circular
    }
}

/// Elements recovered from a state vector, with the true anomaly and any
/// geometry degeneracy that forced a convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveredElements {
    pub elements: OrbitalElements,
    pub true_anomaly_deg: f64,
    pub degeneracy: GeometryDegeneracy,
}

// =============================================================================
// ELEMENTS <-> STATE CONVERSION
// =============================================================================

/// Convert orbital elements to a Cartesian state about a central mass.
pub fn elements_to_state(elements: &OrbitalElements, central_mass_kg: f64) -> Result<StateVector> {
    elements_to_state_with(&KeplerSolver::default(), elements, central_mass_kg)
}

pub fn elements_to_state_with(
    solver: &KeplerSolver,
    elements: &OrbitalElements,
    central_mass_kg: f64,
) -> Result<StateVector> {
    elements.validate()?;
    let mu = G * ensure_positive("central_mass_kg", central_mass_kg)?;

    let a = elements.semi_major_axis_m();
    let e = elements.eccentricity;
    let i = elements.inclination_deg.to_radians();
    let omega_big = elements.raan_deg.to_radians(); // Ω
    let omega_small = elements.arg_periapsis_deg.to_radians(); // ω
    let m = elements.mean_anomaly_deg.to_radians();

    let eccentric_anomaly = solver.solve(e, m)?.eccentric_anomaly;
    let true_anomaly = eccentric_to_true_anomaly(e, eccentric_anomaly);

    // Distance from focus
    let r = a * (1.0 - e * eccentric_anomaly.cos());

    // Position in orbital plane (perifocal frame)
    let cos_nu = true_anomaly.cos();
    let sin_nu = true_anomaly.sin();
    let x_orb = r * cos_nu;
    let y_orb = r * sin_nu;

    // Velocity in orbital plane
    let sqrt_mu_p = (mu / (a * (1.0 - e * e))).sqrt();
    let vx_orb = -sqrt_mu_p * sin_nu;
    let vy_orb = sqrt_mu_p * (e + cos_nu);

    // Rz(Ω)·Rx(i)·Rz(ω), perifocal to reference (ecliptic) frame
    let cos_omega = omega_big.cos();
    let sin_omega = omega_big.sin();
    let cos_w = omega_small.cos();
    let sin_w = omega_small.sin();
    let cos_i = i.cos();
    let sin_i = i.sin();

    let r11 = cos_omega * cos_w - sin_omega * sin_w * cos_i;
    let r12 = -cos_omega * sin_w - sin_omega * cos_w * cos_i;
    let r21 = sin_omega * cos_w + cos_omega * sin_w * cos_i;
    let r22 = -sin_omega * sin_w + cos_omega * cos_w * cos_i;
    let r31 = sin_w * sin_i;
    let r32 = cos_w * sin_i;

    let position = Vector3::new(
        r11 * x_orb + r12 * y_orb,
        r21 * x_orb + r22 * y_orb,
        r31 * x_orb + r32 * y_orb,
    );

    let velocity = Vector3::new(
        r11 * vx_orb + r12 * vy_orb,
        r21 * vx_orb + r22 * vy_orb,
        r31 * vx_orb + r32 * vy_orb,
    );

    let state = StateVector { position, velocity };
    if !state.is_finite() {
        return Err(PhysicsError::NonFinite {
            quantity: "state vector",
        });
    }
    Ok(state)
}

/// Recover classical elements from a Cartesian state about a central mass.
pub fn state_to_elements(state: &StateVector, central_mass_kg: f64) -> Result<RecoveredElements> {
    let mu = G * ensure_positive("central_mass_kg", central_mass_kg)?;
    if !state.is_finite() {
        return Err(PhysicsError::NonFinite {
            quantity: "state vector",
        });
    }

    let pos = state.position;
    let vel = state.velocity;
    let r = ensure_positive("position magnitude", pos.magnitude())?;
    let v = vel.magnitude();

    // Specific angular momentum
    let h = pos.cross(&vel);
    let h_mag = ensure_positive("angular momentum", h.magnitude())?;

    // Node vector k × h
    let n = Vector3::new(-h.y, h.x, 0.0);
    let n_mag = n.magnitude();

    // Eccentricity vector
    let r_dot_v = pos.dot(&vel);
    let e_vec = pos
        .scale(v * v - mu / r)
        .sub(&vel.scale(r_dot_v))
        .scale(1.0 / mu);
    let ecc = e_vec.magnitude();

    let energy = 0.5 * v * v - mu / r;
    if ecc >= 1.0 || energy >= 0.0 {
        return Err(PhysicsError::UnboundOrbit { eccentricity: ecc });
    }
    let a = -mu / (2.0 * energy);

    let inclination = (h.z / h_mag).clamp(-1.0, 1.0).acos();

    let degeneracy = GeometryDegeneracy {
        equatorial: n_mag / h_mag < EQUATORIAL_TOLERANCE,
        circular: ecc < CIRCULAR_TOLERANCE,
    };
    if degeneracy.any() {
        log::warn!(
            "degenerate orbit geometry (equatorial: {}, circular: {}); using fixed-angle convention",
            degeneracy.equatorial,
            degeneracy.circular
        );
    }

    // Retrograde equatorial orbits run clockwise seen from +z
    let handedness = if h.z >= 0.0 { 1.0 } else { -1.0 };
    let h_hat = h.scale(1.0 / h_mag);

    // Each angle is atan2(sin, cos) with the sine taken along ĥ, so its sign
    // follows n.y for Ω, e_z for ω, r·v for ν and r_z for the argument of
    // latitude, while staying well conditioned near 0 and π.
    let raan = if degeneracy.equatorial {
        0.0
    } else {
        n.y.atan2(n.x)
    };

    let arg_periapsis = match (degeneracy.equatorial, degeneracy.circular) {
        (_, true) => 0.0,
        (true, false) => handedness * e_vec.y.atan2(e_vec.x),
        (false, false) => h_hat.dot(&n.cross(&e_vec)).atan2(n.dot(&e_vec)),
    };

    let true_anomaly = match (degeneracy.equatorial, degeneracy.circular) {
        // True longitude
        (true, true) => handedness * pos.y.atan2(pos.x),
        // Argument of latitude
        (false, true) => h_hat.dot(&n.cross(&pos)).atan2(n.dot(&pos)),
        (_, false) => h_hat.dot(&e_vec.cross(&pos)).atan2(e_vec.dot(&pos)),
    };

    let eccentric_anomaly = true_to_eccentric_anomaly(ecc, true_anomaly);
    let mean_anomaly = eccentric_anomaly - ecc * eccentric_anomaly.sin();

    let elements = OrbitalElements {
        semi_major_axis_au: a / AU,
        eccentricity: ecc,
        inclination_deg: inclination.to_degrees(),
        raan_deg: normalize_degrees(raan.to_degrees()),
        arg_periapsis_deg: normalize_degrees(arg_periapsis.to_degrees()),
        mean_anomaly_deg: normalize_degrees(mean_anomaly.to_degrees()),
    };

    Ok(RecoveredElements {
        elements,
        true_anomaly_deg: normalize_degrees(true_anomaly.to_degrees()),
        degeneracy,
    })
}

// =============================================================================
// ORBIT PROPAGATOR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitPropagator {
    pub solver: KeplerSolver,
}

impl OrbitPropagator {
    pub fn new(solver: KeplerSolver) -> Self {
        Self { solver }
    }

    /// Sample one closed osculating orbit. Sample k sits at M = 2πk/num_points
    /// and time k·P/num_points; the path closes back on sample 0.
    pub fn sample_orbit(
        &self,
        elements: &OrbitalElements,
        central_mass_kg: f64,
        num_points: usize,
    ) -> Result<Trajectory> {
        elements.validate()?;
        if num_points == 0 {
            return Err(PhysicsError::InvalidInput {
                field: "num_points",
                reason: "must be at least 1".to_string(),
            });
        }
        let period = elements.period_s(ensure_positive("central_mass_kg", central_mass_kg)?);

        let points = (0..num_points)
            .map(|k| {
                let fraction = k as f64 / num_points as f64;
                let sample = elements.with_mean_anomaly_deg(360.0 * fraction);
                let state = elements_to_state_with(&self.solver, &sample, central_mass_kg)?;
                Ok(TrajectoryPoint {
                    time_s: period * fraction,
                    position: state.position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Trajectory {
            body: "osculating orbit".to_string(),
            points,
        })
    }

    /// Two-body state `dt_s` seconds after the element epoch.
    pub fn state_at(
        &self,
        elements: &OrbitalElements,
        central_mass_kg: f64,
        dt_s: f64,
    ) -> Result<StateVector> {
        elements.validate()?;
        ensure_finite("dt_s", dt_s)?;
        let n = elements.mean_motion(ensure_positive("central_mass_kg", central_mass_kg)?);
        let mean_anomaly_deg = elements.mean_anomaly_deg + (n * dt_s).to_degrees();
        let advanced = elements.with_mean_anomaly_deg(normalize_degrees(mean_anomaly_deg));
        elements_to_state_with(&self.solver, &advanced, central_mass_kg)
    }

    /// Forward two-body path from the epoch over `duration_s`, `num_points`
    /// samples including both ends.
    pub fn propagate_path(
        &self,
        elements: &OrbitalElements,
        central_mass_kg: f64,
        duration_s: f64,
        num_points: usize,
    ) -> Result<Trajectory> {
        ensure_positive("duration_s", duration_s)?;
        if num_points < 2 {
            return Err(PhysicsError::InvalidInput {
                field: "num_points",
                reason: "a forward path needs at least 2 samples".to_string(),
            });
        }
        let step = duration_s / (num_points - 1) as f64;

        let points = (0..num_points)
            .map(|k| {
                let t = step * k as f64;
                let state = self.state_at(elements, central_mass_kg, t)?;
                Ok(TrajectoryPoint {
                    time_s: t,
                    position: state.position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Trajectory {
            body: "two-body path".to_string(),
            points,
        })
    }

    /// Osculating elements after an impulsive velocity change at the epoch.
    pub fn apply_delta_v(
        &self,
        elements: &OrbitalElements,
        central_mass_kg: f64,
        delta_v: Vector3,
    ) -> Result<RecoveredElements> {
        if !delta_v.is_finite() {
            return Err(PhysicsError::NonFinite {
                quantity: "delta_v",
            });
        }
        let state = elements_to_state_with(&self.solver, elements, central_mass_kg)?;
        let kicked = StateVector::new(state.position, state.velocity.add(&delta_v));
        state_to_elements(&kicked, central_mass_kg)
    }
}

impl Trajectory {
    pub fn labelled(mut self, name: impl Into<String>) -> Self {
        self.body = name.into();
        self
    }
}

// =============================================================================
// REFERENCE BODIES & TIME
// =============================================================================

/// Earth's heliocentric mean elements at J2000 (ecliptic frame).
pub fn earth_elements() -> OrbitalElements {
    OrbitalElements {
        semi_major_axis_au: 1.00000261,
        eccentricity: 0.01671123,
        inclination_deg: 0.0,
        raan_deg: 0.0,
        arg_periapsis_deg: 102.93768193,
        mean_anomaly_deg: 357.52688973,
    }
}

/// Earth's elements with the mean anomaly advanced to a Julian Date.
pub fn earth_elements_at(julian_date: f64) -> OrbitalElements {
    let earth = earth_elements();
    let n = earth.mean_motion(MASS_SUN);
    let dt = (julian_date - J2000_JULIAN_DATE) * SECONDS_PER_DAY;
    earth.with_mean_anomaly_deg(normalize_degrees(
        earth.mean_anomaly_deg + (n * dt).to_degrees(),
    ))
}

/// Julian Date of a UTC instant.
pub fn julian_date(instant: DateTime<Utc>) -> f64 {
    let seconds = instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9;
    UNIX_EPOCH_JULIAN_DATE + seconds / SECONDS_PER_DAY
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn angle_diff_deg(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn apophis_like() -> OrbitalElements {
        OrbitalElements::new(0.9224, 0.1914, 3.339, 204.43, 126.60, 61.42).unwrap()
    }

    #[test]
    fn test_kepler_equation_circular() {
        // For circular orbit e=0, E = M
        let solution = KeplerSolver::default().solve(0.0, 1.0).unwrap();
        assert!(solution.converged);
        assert!((solution.eccentric_anomaly - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_kepler_equation_eccentric() {
        let solution = KeplerSolver::default().solve(0.5, 0.5).unwrap();
        let e = solution.eccentric_anomaly;
        let check = e - 0.5 * e.sin();
        assert!((check - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_kepler_normalizes_mean_anomaly() {
        let solver = KeplerSolver::default();
        let a = solver.solve(0.3, 1.0).unwrap();
        let b = solver.solve(0.3, 1.0 + 4.0 * PI).unwrap();
        assert_relative_eq!(a.eccentric_anomaly, b.eccentric_anomaly, epsilon = 1e-12);

        // M = 3π/2 maps to -π/2
        let c = solver.solve(0.0, 1.5 * PI).unwrap();
        assert_relative_eq!(c.eccentric_anomaly, -0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_signed_angle(PI), PI);
        assert_relative_eq!(normalize_signed_angle(-PI), PI);
    }

    #[test]
    fn test_kepler_high_eccentricity_uses_apoapsis_guess() {
        let solver = KeplerSolver::default();
        for m in [-3.0, -0.5, 0.001, 0.5, 3.0] {
            let solution = solver.solve(0.95, m).unwrap();
            assert!(solution.converged, "M = {m}");
            assert!(solution.residual < 1e-12);
        }
    }

    #[test]
    fn test_kepler_reports_non_convergence() {
        let solver = KeplerSolver {
            tolerance: 1e-14,
            max_iterations: 1,
        };
        let solution = solver.solve(0.85, 0.3).unwrap();
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert!(solution.eccentric_anomaly.is_finite());
        assert!(solution.residual > 0.0);
    }

    #[test]
    fn test_kepler_rejects_invalid_eccentricity() {
        let solver = KeplerSolver::default();
        assert!(solver.solve(1.0, 0.5).is_err());
        assert!(solver.solve(-0.1, 0.5).is_err());
        assert!(solver.solve(0.5, f64::INFINITY).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_kepler_round_trip(e in 0.0f64..0.9, m in -20.0f64..20.0) {
            let solution = KeplerSolver::default().solve(e, m).unwrap();
            prop_assert!(solution.converged);
            let m_norm = normalize_signed_angle(m);
            let big_e = solution.eccentric_anomaly;
            prop_assert!((big_e - e * big_e.sin() - m_norm).abs() < 1e-12);
        }

        #[test]
        fn prop_elements_state_round_trip(
            a in 0.5f64..5.0,
            e in 0.001f64..0.9,
            inc in 0.1f64..179.0,
            raan in 0.0f64..360.0,
            argp in 0.0f64..360.0,
            m in 0.0f64..360.0,
        ) {
            let elements = OrbitalElements::new(a, e, inc, raan, argp, m).unwrap();
            let state = elements_to_state(&elements, MASS_SUN).unwrap();
            let recovered = state_to_elements(&state, MASS_SUN).unwrap();
            let r = recovered.elements;

            prop_assert!(!recovered.degeneracy.any());
            prop_assert!((r.semi_major_axis_au - a).abs() / a < 1e-9);
            prop_assert!((r.eccentricity - e).abs() < 1e-9);
            prop_assert!((r.inclination_deg - inc).abs() < 1e-7);
            prop_assert!(angle_diff_deg(r.raan_deg, raan) < 1e-6);
            prop_assert!(angle_diff_deg(r.arg_periapsis_deg, argp) < 1e-5);
            prop_assert!(angle_diff_deg(r.mean_anomaly_deg, m) < 1e-5);
        }
    }

    #[test]
    fn test_round_trip_near_degenerate_but_resolvable() {
        // e and i just above the documented bounds (1e-6)
        let elements =
            OrbitalElements::new(1.3, 2e-6, (2e-6f64).to_degrees(), 40.0, 75.0, 120.0).unwrap();
        let state = elements_to_state(&elements, MASS_SUN).unwrap();
        let recovered = state_to_elements(&state, MASS_SUN).unwrap();
        assert!(!recovered.degeneracy.any());
        assert_relative_eq!(recovered.elements.semi_major_axis_au, 1.3, max_relative = 1e-9);
        assert!((recovered.elements.eccentricity - 2e-6).abs() < 1e-9);
        assert!(angle_diff_deg(recovered.elements.raan_deg, 40.0) < 1e-3);
    }

    #[test]
    fn test_earth_state_magnitudes() {
        let state = elements_to_state(&earth_elements(), MASS_SUN).unwrap();
        let distance_au = state.position.magnitude() / AU;
        let speed_km_s = state.velocity.magnitude() / 1000.0;
        assert!((distance_au - 1.0).abs() < 0.02, "got {distance_au} AU");
        assert!((speed_km_s - 29.78).abs() < 1.0, "got {speed_km_s} km/s");
    }

    #[test]
    fn test_rotation_order_places_node_on_x_axis() {
        // Ω = 0, ω = 0, M = 0: periapsis on +x, velocity tilted by i about x
        let elements = OrbitalElements::new(1.0, 0.1, 30.0, 0.0, 0.0, 0.0).unwrap();
        let state = elements_to_state(&elements, MASS_SUN).unwrap();
        assert_relative_eq!(state.position.x, 0.9 * AU, max_relative = 1e-12);
        assert!(state.position.y.abs() < 1e-3);
        let v = state.velocity;
        assert_relative_eq!(v.z / v.y, 30f64.to_radians().tan(), max_relative = 1e-9);

        // Ω = 90°: node line rotates onto +y
        let rotated = OrbitalElements::new(1.0, 0.1, 30.0, 90.0, 0.0, 0.0).unwrap();
        let state = elements_to_state(&rotated, MASS_SUN).unwrap();
        assert!(state.position.x.abs() < 1e-3);
        assert_relative_eq!(state.position.y, 0.9 * AU, max_relative = 1e-12);
    }

    #[test]
    fn test_retrograde_inbound_quadrants() {
        // i > 90°, ω in the southern half, outbound and inbound anomalies
        for m in [45.0, 300.0] {
            let elements = OrbitalElements::new(2.0, 0.4, 150.0, 250.0, 290.0, m).unwrap();
            let state = elements_to_state(&elements, MASS_SUN).unwrap();
            let r = state_to_elements(&state, MASS_SUN).unwrap().elements;
            assert!(angle_diff_deg(r.arg_periapsis_deg, 290.0) < 1e-6);
            assert!(angle_diff_deg(r.mean_anomaly_deg, m) < 1e-6);
        }
    }

    #[test]
    fn test_degenerate_equatorial_circular_is_flagged() {
        let v = (G * MASS_SUN / AU).sqrt();
        let angle = 1.0f64;
        let state = StateVector::new(
            Vector3::new(AU * angle.cos(), AU * angle.sin(), 0.0),
            Vector3::new(-v * angle.sin(), v * angle.cos(), 0.0),
        );
        let recovered = state_to_elements(&state, MASS_SUN).unwrap();
        assert!(recovered.degeneracy.equatorial);
        assert!(recovered.degeneracy.circular);
        assert_eq!(recovered.elements.raan_deg, 0.0);
        assert_eq!(recovered.elements.arg_periapsis_deg, 0.0);
        assert_relative_eq!(recovered.true_anomaly_deg, angle.to_degrees(), epsilon = 1e-6);

        // The convention still reproduces the state
        let back = elements_to_state(&recovered.elements, MASS_SUN).unwrap();
        assert!(back.position.sub(&state.position).magnitude() < 1.0);
    }

    #[test]
    fn test_degenerate_retrograde_equatorial_reproduces_state() {
        let elements = OrbitalElements::new(1.5, 0.2, 180.0, 0.0, 40.0, 70.0).unwrap();
        let state = elements_to_state(&elements, MASS_SUN).unwrap();
        let recovered = state_to_elements(&state, MASS_SUN).unwrap();
        assert!(recovered.degeneracy.equatorial);
        assert!(!recovered.degeneracy.circular);
        let back = elements_to_state(&recovered.elements, MASS_SUN).unwrap();
        assert!(back.position.sub(&state.position).magnitude() < 10.0);
        assert!(back.velocity.sub(&state.velocity).magnitude() < 1e-6);
    }

    #[test]
    fn test_state_to_elements_rejects_unbound_state() {
        let v_esc = (2.0 * G * MASS_SUN / AU).sqrt();
        let state = StateVector::new(
            Vector3::new(AU, 0.0, 0.0),
            Vector3::new(0.0, 1.1 * v_esc, 0.0),
        );
        assert!(matches!(
            state_to_elements(&state, MASS_SUN),
            Err(PhysicsError::UnboundOrbit { .. })
        ));
    }

    #[test]
    fn test_sample_orbit_is_closed_and_deterministic() {
        let propagator = OrbitPropagator::default();
        let elements = apophis_like();
        let a = propagator.sample_orbit(&elements, MASS_SUN, 360).unwrap();
        let b = propagator.sample_orbit(&elements, MASS_SUN, 360).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 360);

        // Adjacent samples, including last -> first, are all short chords
        let circumference = 2.0 * PI * elements.aphelion_au() * AU;
        let max_chord = circumference / 360.0 * 2.0;
        for k in 0..360 {
            let p = a.points[k].position;
            let q = a.points[(k + 1) % 360].position;
            assert!(p.sub(&q).magnitude() < max_chord);
        }

        // Sample 0 is periapsis
        assert_relative_eq!(
            a.points[0].position.magnitude() / AU,
            elements.perihelion_au(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_sample_orbit_validation() {
        let propagator = OrbitPropagator::default();
        assert!(propagator.sample_orbit(&apophis_like(), MASS_SUN, 0).is_err());
        let open = OrbitalElements {
            eccentricity: 1.0,
            ..apophis_like()
        };
        assert!(propagator.sample_orbit(&open, MASS_SUN, 10).is_err());
    }

    #[test]
    fn test_state_at_full_period_returns_to_start() {
        let propagator = OrbitPropagator::default();
        let elements = apophis_like();
        let start = propagator.state_at(&elements, MASS_SUN, 0.0).unwrap();
        let period = elements.period_s(MASS_SUN);
        let end = propagator.state_at(&elements, MASS_SUN, period).unwrap();
        assert!(end.position.sub(&start.position).magnitude() < 1000.0);
    }

    #[test]
    fn test_propagate_path_endpoints() {
        let propagator = OrbitPropagator::default();
        let elements = apophis_like();
        let path = propagator
            .propagate_path(&elements, MASS_SUN, 30.0 * SECONDS_PER_DAY, 31)
            .unwrap()
            .labelled("Apophis");
        assert_eq!(path.len(), 31);
        assert_eq!(path.body, "Apophis");
        assert_relative_eq!(path.points[30].time_s, 30.0 * SECONDS_PER_DAY);
        assert!(propagator
            .propagate_path(&elements, MASS_SUN, 10.0, 1)
            .is_err());
    }

    #[test]
    fn test_apply_delta_v_prograde_raises_orbit() {
        let propagator = OrbitPropagator::default();
        let elements = apophis_like();
        let state = elements_to_state(&elements, MASS_SUN).unwrap();
        let prograde = state.velocity.normalize().scale(10.0);
        let after = propagator
            .apply_delta_v(&elements, MASS_SUN, prograde)
            .unwrap();
        assert!(after.elements.semi_major_axis_au > elements.semi_major_axis_au);

        let zero = propagator
            .apply_delta_v(&elements, MASS_SUN, Vector3::zero())
            .unwrap();
        assert_relative_eq!(
            zero.elements.semi_major_axis_au,
            elements.semi_major_axis_au,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_julian_date_and_earth_ephemeris() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_relative_eq!(julian_date(j2000), J2000_JULIAN_DATE, epsilon = 1e-9);

        let at_epoch = earth_elements_at(J2000_JULIAN_DATE);
        assert_relative_eq!(at_epoch.mean_anomaly_deg, earth_elements().mean_anomaly_deg);

        // Half a sidereal year later Earth sits on the other side of the Sun
        let half_year = earth_elements().period_s(MASS_SUN) / 2.0 / SECONDS_PER_DAY;
        let p0 = elements_to_state(&at_epoch, MASS_SUN).unwrap().position;
        let p1 = elements_to_state(&earth_elements_at(J2000_JULIAN_DATE + half_year), MASS_SUN)
            .unwrap()
            .position;
        assert!(p0.normalize().dot(&p1.normalize()) < -0.99);
    }
}
