// Physics Engine - shared constants, vector math and N-body integration
// Implements softened pairwise gravity with a Velocity Verlet integrator

use serde::{Deserialize, Serialize};

use crate::config::IntegratorConfig;
use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, PhysicsError, Result};

// =============================================================================
// PHYSICAL CONSTANTS (SI Units)
// =============================================================================

/// Gravitational constant (m³/(kg·s²))
pub const G: f64 = 6.67430e-11;

/// Astronomical Unit in meters
pub const AU: f64 = 1.495978707e11;

/// Sun mass (kg)
pub const MASS_SUN: f64 = 1.989e30;

/// Earth mass (kg)
pub const MASS_EARTH: f64 = 5.972e24;

/// Moon mass (kg)
pub const MASS_MOON: f64 = 7.342e22;

/// Earth's mean radius (km), the hit/miss threshold for deflection
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius (m)
pub const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

/// Standard surface gravity (m/s²)
pub const EARTH_GRAVITY: f64 = 9.81;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Meters per kilometer
pub const METERS_PER_KM: f64 = 1000.0;

/// One ton of TNT (J)
pub const JOULES_PER_TON_TNT: f64 = 4.184e9;

/// Default Plummer softening length (m). Close approaches inside this scale
/// see a flattened potential instead of a singular one.
pub const DEFAULT_SOFTENING_LENGTH_M: f64 = 1000.0;

/// Asteroid density by spectral type (kg/m³)
/// References: Carry (2012), DeMeo & Carry (2013)
pub mod asteroid_density {
    pub const C_TYPE: f64 = 1700.0; // Carbonaceous
    pub const S_TYPE: f64 = 2700.0; // Silicaceous
    pub const M_TYPE: f64 = 4000.0; // Metallic
    pub const DEFAULT: f64 = 2000.0; // Rubble pile average
}

/// Target densities (kg/m³)
pub mod target_density {
    pub const ROCK: f64 = 2700.0;
    pub const SEAWATER: f64 = 1025.0;
}

/// Mass of a homogeneous sphere of the given diameter (m) and density (kg/m³).
pub fn sphere_mass(diameter_m: f64, density_kg_m3: f64) -> f64 {
    let radius = diameter_m / 2.0;
    density_kg_m3 * (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3)
}

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 1e-15 {
            Self {
                x: self.x / mag,
                y: self.y / mag,
                z: self.z / mag,
            }
        } else {
            Self::zero()
        }
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn add(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// =============================================================================
// STATE VECTOR (Position + Velocity)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Vector3, // meters (SI)
    pub velocity: Vector3, // m/s (SI)
}

impl StateVector {
    pub fn new(position: Vector3, velocity: Vector3) -> Self {
        Self { position, velocity }
    }

    pub fn zero() -> Self {
        Self {
            position: Vector3::zero(),
            velocity: Vector3::zero(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

// =============================================================================
// BODIES & TRAJECTORIES
// =============================================================================

/// A point mass. `mass == 0.0` marks a test particle: it feels gravity from
/// every massive body but exerts none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    pub mass: f64, // kg
    pub state: StateVector,
}

impl Body {
    pub fn new(name: impl Into<String>, mass: f64, state: StateVector) -> Self {
        Self {
            name: name.into(),
            mass,
            state,
        }
    }

    pub fn test_particle(name: impl Into<String>, state: StateVector) -> Self {
        Self::new(name, 0.0, state)
    }

    pub fn is_test_particle(&self) -> bool {
        self.mass == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Seconds since the start of the trajectory
    pub time_s: f64,
    /// meters (SI)
    pub position: Vector3,
}

/// Ordered, time-indexed positions of one body. Recomputing from the same
/// seed state always yields the same sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub body: String,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Vector3> {
        self.points.iter().map(|p| &p.position)
    }

    /// Positions scaled to AU for path rendering.
    pub fn positions_au(&self) -> Vec<[f64; 3]> {
        self.points
            .iter()
            .map(|p| [p.position.x / AU, p.position.y / AU, p.position.z / AU])
            .collect()
    }
}

// =============================================================================
// VELOCITY VERLET INTEGRATOR (Symplectic)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NBodyIntegrator {
    /// Plummer softening length in meters
    pub softening_length: f64,
}

impl Default for NBodyIntegrator {
    fn default() -> Self {
        Self {
            softening_length: DEFAULT_SOFTENING_LENGTH_M,
        }
    }
}

impl NBodyIntegrator {
    pub fn new(softening_length: f64) -> Result<Self> {
        ensure_non_negative("softening_length", softening_length)?;
        Ok(Self { softening_length })
    }

    pub fn from_config(config: &IntegratorConfig) -> Result<Self> {
        Self::new(config.softening_length_m)
    }

    /// Advance every body by one step and return the new system.
    /// Uses Velocity Verlet: x(t+dt) = x(t) + v(t)*dt + 0.5*a(t)*dt²
    ///                       v(t+dt) = v(t) + 0.5*(a(t) + a(t+dt))*dt
    pub fn step(&self, bodies: &[Body], dt: f64) -> Result<Vec<Body>> {
        ensure_positive("dt", dt)?;
        validate_bodies(bodies)?;

        let accelerations = self.accelerations(bodies);
        let next = self.verlet_step(bodies, &accelerations, dt).0;
        check_finite(&next)?;
        Ok(next)
    }

    /// Run `total_steps` steps and collect one trajectory per body.
    /// Each trajectory holds `total_steps + 1` samples, starting at t = 0.
    pub fn integrate(&self, bodies: &[Body], dt: f64, total_steps: usize) -> Result<Vec<Trajectory>> {
        ensure_positive("dt", dt)?;
        validate_bodies(bodies)?;

        log::debug!(
            "integrating {} bodies for {} steps of {} s",
            bodies.len(),
            total_steps,
            dt
        );

        let mut trajectories: Vec<Trajectory> = bodies
            .iter()
            .map(|b| {
                let mut points = Vec::with_capacity(total_steps + 1);
                points.push(TrajectoryPoint {
                    time_s: 0.0,
                    position: b.state.position,
                });
                Trajectory {
                    body: b.name.clone(),
                    points,
                }
            })
            .collect();

        let mut current = bodies.to_vec();
        // a(t+dt) from one step is a(t) of the next
        let mut accelerations = self.accelerations(&current);

        for step in 1..=total_steps {
            let (next, next_accelerations) = self.verlet_step(&current, &accelerations, dt);
            check_finite(&next)?;

            let t = step as f64 * dt;
            for (trajectory, body) in trajectories.iter_mut().zip(&next) {
                trajectory.points.push(TrajectoryPoint {
                    time_s: t,
                    position: body.state.position,
                });
            }

            current = next;
            accelerations = next_accelerations;
        }

        Ok(trajectories)
    }

    /// Final system state after `total_steps` steps.
    pub fn advance(&self, bodies: &[Body], dt: f64, total_steps: usize) -> Result<Vec<Body>> {
        ensure_positive("dt", dt)?;
        validate_bodies(bodies)?;

        let mut current = bodies.to_vec();
        let mut accelerations = self.accelerations(&current);
        for _ in 0..total_steps {
            let (next, next_accelerations) = self.verlet_step(&current, &accelerations, dt);
            current = next;
            accelerations = next_accelerations;
        }
        check_finite(&current)?;
        Ok(current)
    }

    fn verlet_step(
        &self,
        bodies: &[Body],
        accelerations: &[Vector3],
        dt: f64,
    ) -> (Vec<Body>, Vec<Vector3>) {
        let dt_sq_half = dt * dt * 0.5;

        // Update positions: x(t+dt) = x(t) + v(t)*dt + 0.5*a(t)*dt²
        let mut next: Vec<Body> = bodies
            .iter()
            .zip(accelerations)
            .map(|(body, a)| {
                let v = &body.state.velocity;
                let position = body
                    .state
                    .position
                    .add(&v.scale(dt))
                    .add(&a.scale(dt_sq_half));
                Body {
                    name: body.name.clone(),
                    mass: body.mass,
                    state: StateVector::new(position, body.state.velocity),
                }
            })
            .collect();

        // Calculate new accelerations at new positions
        let new_accelerations = self.accelerations(&next);

        // Update velocities: v(t+dt) = v(t) + 0.5*(a(t) + a(t+dt))*dt
        for ((body, a_old), a_new) in next.iter_mut().zip(accelerations).zip(&new_accelerations) {
            let avg_accel = a_old.add(a_new).scale(0.5);
            body.state.velocity = body.state.velocity.add(&avg_accel.scale(dt));
        }

        (next, new_accelerations)
    }

    /// Softened pairwise gravitational acceleration on every body.
    /// a_i = Σ_j G m_j (r_j - r_i) / (|r_j - r_i|² + ε²)^(3/2)
    pub fn accelerations(&self, bodies: &[Body]) -> Vec<Vector3> {
        let eps_sq = self.softening_length * self.softening_length;

        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let mut total_accel = Vector3::zero();
                for (j, other) in bodies.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let r_vec = other.state.position.sub(&body.state.position);
                    let dist_sq = r_vec.magnitude_squared() + eps_sq;
                    if dist_sq > 0.0 {
                        let inv_r3 = 1.0 / (dist_sq * dist_sq.sqrt());
                        total_accel = total_accel.add(&r_vec.scale(G * other.mass * inv_r3));
                    }
                }
                total_accel
            })
            .collect()
    }

    /// Total mechanical energy with the softened potential used by the force law.
    pub fn total_energy(&self, bodies: &[Body]) -> f64 {
        let eps_sq = self.softening_length * self.softening_length;
        let mut kinetic = 0.0;
        let mut potential = 0.0;

        for body in bodies {
            // Kinetic energy: 0.5 * m * v²
            kinetic += 0.5 * body.mass * body.state.velocity.magnitude_squared();
        }

        // Potential energy: -G * m1 * m2 / sqrt(r² + ε²) for each pair
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let r_vec = bodies[i].state.position.sub(&bodies[j].state.position);
                let r_soft = (r_vec.magnitude_squared() + eps_sq).sqrt();
                if r_soft > 0.0 {
                    potential -= G * bodies[i].mass * bodies[j].mass / r_soft;
                }
            }
        }

        kinetic + potential
    }
}

/// Total angular momentum Σ m (r × v) about the origin.
pub fn total_angular_momentum(bodies: &[Body]) -> Vector3 {
    bodies.iter().fold(Vector3::zero(), |acc, body| {
        acc.add(
            &body
                .state
                .position
                .cross(&body.state.velocity)
                .scale(body.mass),
        )
    })
}

fn validate_bodies(bodies: &[Body]) -> Result<()> {
    for body in bodies {
        ensure_non_negative("body.mass", body.mass)?;
        if !body.state.is_finite() {
            return Err(PhysicsError::NonFinite {
                quantity: "body.state",
            });
        }
    }
    Ok(())
}

fn check_finite(bodies: &[Body]) -> Result<()> {
    for body in bodies {
        ensure_finite("integrated position", body.state.position.magnitude_squared())?;
        ensure_finite("integrated velocity", body.state.velocity.magnitude_squared())?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Sun + Earth on a circular orbit, barycentric velocities.
    fn sun_earth() -> Vec<Body> {
        let r = AU;
        let v = (G * (MASS_SUN + MASS_EARTH) / r).sqrt();
        let total = MASS_SUN + MASS_EARTH;
        let sun = Body::new(
            "Sun",
            MASS_SUN,
            StateVector::new(
                Vector3::new(-r * MASS_EARTH / total, 0.0, 0.0),
                Vector3::new(0.0, -v * MASS_EARTH / total, 0.0),
            ),
        );
        let earth = Body::new(
            "Earth",
            MASS_EARTH,
            StateVector::new(
                Vector3::new(r * MASS_SUN / total, 0.0, 0.0),
                Vector3::new(0.0, v * MASS_SUN / total, 0.0),
            ),
        );
        vec![sun, earth]
    }

    #[test]
    fn test_vector3_operations() {
        let v1 = Vector3::new(1.0, 2.0, 3.0);
        let v2 = Vector3::new(4.0, 5.0, 6.0);

        let sum = v1.add(&v2);
        assert_eq!(sum, Vector3::new(5.0, 7.0, 9.0));

        assert!((v1.dot(&v2) - 32.0).abs() < 1e-10);

        let cross = v1.cross(&v2);
        assert_eq!(cross, Vector3::new(-3.0, 6.0, -3.0));

        assert_eq!(Vector3::zero().normalize(), Vector3::zero());
        assert_relative_eq!(v1.normalize().magnitude(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_mass() {
        // 370 m at 2100 kg/m³
        let mass = sphere_mass(370.0, 2100.0);
        assert_relative_eq!(mass, 5.5697e10, max_relative = 1e-3);
    }

    #[test]
    fn test_step_is_pure_and_deterministic() {
        let bodies = sun_earth();
        let integrator = NBodyIntegrator::default();
        let a = integrator.step(&bodies, 3600.0).unwrap();
        let b = integrator.step(&bodies, 3600.0).unwrap();
        assert_eq!(a, b);
        // Input untouched
        assert_eq!(bodies, sun_earth());
        assert_ne!(a[1].state.position, bodies[1].state.position);
    }

    #[test]
    fn test_energy_and_angular_momentum_conservation() {
        let bodies = sun_earth();
        let integrator = NBodyIntegrator::default();

        let initial_energy = integrator.total_energy(&bodies);
        let initial_l = total_angular_momentum(&bodies);

        // One year of hourly steps
        let final_bodies = integrator.advance(&bodies, 3600.0, 8766).unwrap();

        let final_energy = integrator.total_energy(&final_bodies);
        let final_l = total_angular_momentum(&final_bodies);

        let drift = ((final_energy - initial_energy) / initial_energy).abs();
        assert!(drift < 1e-6, "Energy drift too high: {}", drift);

        let l_drift = final_l.sub(&initial_l).magnitude() / initial_l.magnitude();
        assert!(l_drift < 1e-9, "Angular momentum drift too high: {}", l_drift);
    }

    #[test]
    fn test_test_particle_does_not_perturb_massive_bodies() {
        let massive = sun_earth();
        let mut with_particle = massive.clone();
        with_particle.insert(
            1,
            Body::test_particle(
                "Asteroid",
                StateVector::new(
                    Vector3::new(1.2 * AU, 0.0, 0.05 * AU),
                    Vector3::new(0.0, 27_000.0, 500.0),
                ),
            ),
        );

        let integrator = NBodyIntegrator::default();
        let without = integrator.integrate(&massive, 3600.0, 2000).unwrap();
        let with = integrator.integrate(&with_particle, 3600.0, 2000).unwrap();

        assert_eq!(without[0], with[0]);
        assert_eq!(without[1], with[2]);
        // The particle itself still moved under gravity
        assert_ne!(with[1].points[0].position, with[1].points[2000].position);
    }

    #[test]
    fn test_test_particle_feels_gravity() {
        let sun = Body::new("Sun", MASS_SUN, StateVector::zero());
        let particle = Body::test_particle(
            "Particle",
            StateVector::new(Vector3::new(AU, 0.0, 0.0), Vector3::zero()),
        );
        assert!(particle.is_test_particle() && !sun.is_test_particle());
        let acc = NBodyIntegrator::default().accelerations(&[sun, particle]);
        assert_eq!(acc[0], Vector3::zero());
        assert_relative_eq!(acc[1].x, -G * MASS_SUN / (AU * AU), max_relative = 1e-9);
    }

    #[test]
    fn test_softening_bounds_close_encounters() {
        let a = Body::new("A", 1e20, StateVector::zero());
        let b = Body::new("B", 1e20, StateVector::zero());
        let acc = NBodyIntegrator::default().accelerations(&[a, b]);
        assert!(acc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_integrate_sample_count() {
        let trajectories = NBodyIntegrator::default()
            .integrate(&sun_earth(), 60.0, 10)
            .unwrap();
        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories[1].len(), 11);
        assert_eq!(trajectories[1].points[10].time_s, 600.0);
        assert_eq!(trajectories[1].body, "Earth");
        let au = trajectories[1].positions_au();
        assert_eq!(au.len(), 11);
        assert_relative_eq!(au[0][0], 1.0, max_relative = 1e-5);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let integrator = NBodyIntegrator::default();
        assert!(integrator.step(&sun_earth(), 0.0).is_err());
        assert!(integrator.step(&sun_earth(), f64::NAN).is_err());

        let mut bodies = sun_earth();
        bodies[0].mass = -1.0;
        assert!(integrator.step(&bodies, 60.0).is_err());

        assert!(NBodyIntegrator::new(-1.0).is_err());
    }
}
