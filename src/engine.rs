// Engine - one handle over every model, built from a single EngineConfig
// Holds no mutable state; every method is a pure function of its arguments

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::config::EngineConfig;
use crate::deflection::{DeflectionModel, RtnVector};
use crate::error::{ensure_positive, Result};
use crate::impact_model::ImpactModel;
use crate::orbital_mechanics::{
    earth_elements_at, elements_to_state_with, KeplerSolver, OrbitPropagator, OrbitalElements,
    RecoveredElements, J2000_JULIAN_DATE,
};
use crate::physics_engine::{
    Body, NBodyIntegrator, StateVector, Trajectory, Vector3, MASS_EARTH, MASS_MOON, MASS_SUN,
    METERS_PER_KM, SECONDS_PER_DAY,
};

/// Mean Earth-Moon distance (m)
const MOON_DISTANCE_M: f64 = 3.844e8;

/// Mean lunar orbital speed about Earth (m/s)
const MOON_ORBITAL_SPEED_M_S: f64 = 1022.0;

/// Sidereal month (days)
const MOON_PERIOD_DAYS: f64 = 27.3;

/// Closest approach between two sampled trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloseApproachEstimate {
    pub min_distance_km: f64,
    pub time_days: f64,
    pub sample_index: usize,
}

/// Before/after paths for a deflection overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeflectionOverlay {
    pub original: Trajectory,
    pub deflected: Trajectory,
    pub deflected_elements: RecoveredElements,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engine {
    pub config: EngineConfig,
    pub propagator: OrbitPropagator,
    pub integrator: NBodyIntegrator,
    pub impact: ImpactModel,
    pub deflection: DeflectionModel,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let propagator = OrbitPropagator::new(KeplerSolver::from_config(&config.kepler));
        Ok(Self {
            config,
            propagator,
            integrator: NBodyIntegrator::from_config(&config.integrator)?,
            impact: ImpactModel::from_config(&config.impact),
            deflection: DeflectionModel::from_config(&config.deflection, propagator),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(EngineConfig::from_json_str(json)?)
    }

    /// Sun, Earth and Moon at a Julian Date, heliocentric.
    pub fn solar_system_bodies(&self, julian_date: f64) -> Result<Vec<Body>> {
        let earth = earth_elements_at(julian_date);
        let earth_state = elements_to_state_with(&self.propagator.solver, &earth, MASS_SUN)?;

        // Circular lunar orbit in the ecliptic
        let phase = TAU * (julian_date - J2000_JULIAN_DATE) / MOON_PERIOD_DAYS;
        let (sin_p, cos_p) = phase.sin_cos();
        let moon_state = StateVector::new(
            earth_state.position.add(&Vector3::new(
                MOON_DISTANCE_M * cos_p,
                MOON_DISTANCE_M * sin_p,
                0.0,
            )),
            earth_state.velocity.add(&Vector3::new(
                -MOON_ORBITAL_SPEED_M_S * sin_p,
                MOON_ORBITAL_SPEED_M_S * cos_p,
                0.0,
            )),
        );

        Ok(vec![
            Body::new("Sun", MASS_SUN, StateVector::zero()),
            Body::new("Earth", MASS_EARTH, earth_state),
            Body::new("Moon", MASS_MOON, moon_state),
        ])
    }

    /// Integrate an asteroid (as a test particle) alongside Sun, Earth and Moon.
    /// Trajectories come back in the order Sun, Earth, Moon, asteroid.
    pub fn simulate_encounter(
        &self,
        name: &str,
        asteroid: &OrbitalElements,
        julian_date: f64,
        dt_s: f64,
        total_steps: usize,
    ) -> Result<Vec<Trajectory>> {
        let mut bodies = self.solar_system_bodies(julian_date)?;
        let state = elements_to_state_with(&self.propagator.solver, asteroid, MASS_SUN)?;
        bodies.push(Body::test_particle(name, state));
        self.integrator.integrate(&bodies, dt_s, total_steps)
    }

    /// Original and post-impulse two-body paths over `duration_s`.
    pub fn deflection_overlay(
        &self,
        elements: &OrbitalElements,
        delta_v: RtnVector,
        duration_s: f64,
        num_points: usize,
    ) -> Result<DeflectionOverlay> {
        ensure_positive("duration_s", duration_s)?;
        let recomputed = self
            .deflection
            .orbital_recomputation(elements, delta_v, duration_s, 0.0)?;
        let original = self
            .propagator
            .propagate_path(elements, MASS_SUN, duration_s, num_points)?
            .labelled("original");
        let deflected = self
            .propagator
            .propagate_path(&recomputed.deflected.elements, MASS_SUN, duration_s, num_points)?
            .labelled("deflected");
        Ok(DeflectionOverlay {
            original,
            deflected,
            deflected_elements: recomputed.deflected,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let propagator = OrbitPropagator::default();
        Self {
            config,
            propagator,
            integrator: NBodyIntegrator::default(),
            impact: ImpactModel::default(),
            deflection: DeflectionModel::from_config(&config.deflection, propagator),
        }
    }
}

/// Minimum sampled separation between two trajectories of equal length.
pub fn closest_approach(a: &Trajectory, b: &Trajectory) -> Option<CloseApproachEstimate> {
    a.points
        .iter()
        .zip(&b.points)
        .enumerate()
        .map(|(i, (p, q))| (i, p.time_s, p.position.sub(&q.position).magnitude()))
        .min_by(|x, y| x.2.total_cmp(&y.2))
        .map(|(sample_index, time_s, distance)| CloseApproachEstimate {
            min_distance_km: distance / METERS_PER_KM,
            time_days: time_s / SECONDS_PER_DAY,
            sample_index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics_engine::AU;

    #[test]
    fn test_engine_from_partial_json() {
        let engine =
            Engine::from_json_str(r#"{ "integrator": { "softening_length_m": 500.0 } }"#).unwrap();
        assert_eq!(engine.integrator.softening_length, 500.0);
        assert_eq!(engine.propagator.solver.max_iterations, 200);
        assert!(Engine::from_json_str(r#"{ "kepler": { "max_iterations": 0 } }"#).is_err());
    }

    #[test]
    fn test_default_matches_default_config() {
        assert_eq!(Engine::default(), Engine::new(EngineConfig::default()).unwrap());
    }

    #[test]
    fn test_solar_system_bodies() {
        let bodies = Engine::default()
            .solar_system_bodies(J2000_JULIAN_DATE)
            .unwrap();
        assert_eq!(bodies.len(), 3);
        let earth_moon = bodies[2].state.position.sub(&bodies[1].state.position);
        assert!((earth_moon.magnitude() - MOON_DISTANCE_M).abs() < 1.0);
        assert!((bodies[1].state.position.magnitude() / AU - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_simulate_encounter_keeps_asteroid_massless() {
        let engine = Engine::default();
        let asteroid = OrbitalElements::new(1.1, 0.2, 5.0, 30.0, 60.0, 0.0).unwrap();
        let tracks = engine
            .simulate_encounter("test", &asteroid, J2000_JULIAN_DATE, 3600.0, 48)
            .unwrap();
        assert_eq!(tracks.len(), 4);
        assert_eq!(tracks[3].body, "test");
        assert_eq!(tracks[3].len(), 49);

        let approach = closest_approach(&tracks[3], &tracks[1]).unwrap();
        assert!(approach.min_distance_km > 0.0);
        assert!(approach.sample_index <= 48);
    }

    #[test]
    fn test_deflection_overlay_diverges() {
        let engine = Engine::default();
        let elements = OrbitalElements::new(1.0, 0.1, 2.0, 10.0, 20.0, 30.0).unwrap();
        let overlay = engine
            .deflection_overlay(
                &elements,
                RtnVector::new(0.0, 1.0, 0.0),
                365.0 * SECONDS_PER_DAY,
                50,
            )
            .unwrap();
        assert_eq!(overlay.original.body, "original");
        assert_eq!(overlay.deflected.len(), 50);
        // Same start, growing separation
        let start = closest_approach(&overlay.original, &overlay.deflected).unwrap();
        assert_eq!(start.sample_index, 0);
        let end = overlay.original.points[49]
            .position
            .sub(&overlay.deflected.points[49].position)
            .magnitude();
        assert!(end > 1.0e6);
    }
}
