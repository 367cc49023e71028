// Monte Carlo Impact Probability
// Samples the state uncertainty, propagates each clone about the Sun and scores Earth encounters

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, PhysicsError, Result};
use crate::orbital_mechanics::{earth_elements_at, OrbitPropagator};
use crate::physics_engine::{
    Body, NBodyIntegrator, StateVector, Vector3, EARTH_RADIUS_M, MASS_SUN, METERS_PER_KM,
    SECONDS_PER_DAY,
};

/// Background impact frequency used by the Palermo scale (per year)
const BACKGROUND_IMPACT_RATE: f64 = 1e-8;

/// Palermo value reported when no sample hits
const PALERMO_FLOOR: f64 = -10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParams {
    /// 3-sigma position uncertainty (m)
    pub position_uncertainty_m: f64,
    /// 3-sigma velocity uncertainty (m/s)
    pub velocity_uncertainty_m_s: f64,
    pub num_runs: u32,
    pub simulation_days: f64,
    pub time_step_s: f64,
    pub collision_radius_m: f64,
    pub seed: u64,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        Self {
            position_uncertainty_m: 1.0e6,
            velocity_uncertainty_m_s: 1.0,
            num_runs: 1000,
            simulation_days: 365.25,
            time_step_s: 3600.0,
            collision_radius_m: EARTH_RADIUS_M,
            seed: 0,
        }
    }
}

impl MonteCarloParams {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("position_uncertainty_m", self.position_uncertainty_m)?;
        ensure_non_negative("velocity_uncertainty_m_s", self.velocity_uncertainty_m_s)?;
        ensure_positive("simulation_days", self.simulation_days)?;
        ensure_positive("time_step_s", self.time_step_s)?;
        ensure_positive("collision_radius_m", self.collision_radius_m)?;
        if self.num_runs == 0 {
            return Err(PhysicsError::InvalidInput {
                field: "num_runs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of a Monte Carlo impact probability simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Number of simulation runs
    pub num_runs: u32,
    /// Number of impacts detected
    pub num_impacts: u32,
    /// Impact probability (0.0 - 1.0)
    pub impact_probability: f64,
    /// Mean closest approach distance (km)
    pub mean_moid_km: f64,
    /// Standard deviation of closest approach (km)
    pub std_moid_km: f64,
    /// Minimum closest approach seen (km)
    pub min_moid_km: f64,
    /// Palermo Scale value
    pub palermo_scale: f64,
}

/// Palermo scale for a probability over a window: log10(P / (f_B·Δt)).
pub fn palermo_scale(impact_probability: f64, window_years: f64) -> f64 {
    if impact_probability > 0.0 {
        (impact_probability / (BACKGROUND_IMPACT_RATE * window_years)).log10()
    } else {
        PALERMO_FLOOR
    }
}

/// Box-Muller transform for a zero-mean Gaussian sample
fn gaussian(rng: &mut StdRng, sigma: f64) -> f64 {
    // gen() is in [0, 1); flip it so ln never sees 0
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn perturb(rng: &mut StdRng, v: &Vector3, sigma: f64) -> Vector3 {
    Vector3::new(
        v.x + gaussian(rng, sigma),
        v.y + gaussian(rng, sigma),
        v.z + gaussian(rng, sigma),
    )
}

/// Estimate the chance that a heliocentric state hits Earth within the window.
/// `epoch_julian_date` places Earth on its mean orbit at t = 0.
pub fn monte_carlo_impact_probability(
    nominal: &StateVector,
    epoch_julian_date: f64,
    params: &MonteCarloParams,
    integrator: &NBodyIntegrator,
    propagator: &OrbitPropagator,
) -> Result<MonteCarloResult> {
    params.validate()?;
    if !nominal.is_finite() {
        return Err(PhysicsError::NonFinite {
            quantity: "nominal state",
        });
    }

    let dt = params.time_step_s;
    let steps = (params.simulation_days * SECONDS_PER_DAY / dt).ceil() as usize;

    // Earth ephemeris is shared by every run
    let earth = earth_elements_at(epoch_julian_date);
    let earth_track = (0..=steps)
        .map(|k| Ok(propagator.state_at(&earth, MASS_SUN, k as f64 * dt)?.position))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Monte Carlo: {} runs x {} steps (seed {})",
        params.num_runs,
        steps,
        params.seed
    );

    let mut rng = StdRng::seed_from_u64(params.seed);
    let sigma_pos = params.position_uncertainty_m / 3.0;
    let sigma_vel = params.velocity_uncertainty_m_s / 3.0;

    let mut impacts = 0u32;
    let mut moid_sum = 0.0f64;
    let mut moid_sq_sum = 0.0f64;
    let mut min_moid = f64::MAX;

    for _run in 0..params.num_runs {
        let sample = StateVector::new(
            perturb(&mut rng, &nominal.position, sigma_pos),
            perturb(&mut rng, &nominal.velocity, sigma_vel),
        );

        let mut bodies = vec![
            Body::new("Sun", MASS_SUN, StateVector::zero()),
            Body::test_particle("clone", sample),
        ];

        let mut closest = sample.position.sub(&earth_track[0]).magnitude();
        let mut hit = closest < params.collision_radius_m;

        for earth_position in earth_track.iter().skip(1) {
            if hit {
                break;
            }
            bodies = integrator.step(&bodies, dt)?;
            let distance = bodies[1].state.position.sub(earth_position).magnitude();
            closest = closest.min(distance);
            hit = distance < params.collision_radius_m;
        }

        if hit {
            impacts += 1;
        }

        let moid_km = closest / METERS_PER_KM;
        moid_sum += moid_km;
        moid_sq_sum += moid_km * moid_km;
        min_moid = min_moid.min(moid_km);
    }

    let runs = f64::from(params.num_runs);
    let impact_probability = f64::from(impacts) / runs;
    let mean_moid = moid_sum / runs;
    let variance = (moid_sq_sum / runs) - (mean_moid * mean_moid);

    Ok(MonteCarloResult {
        num_runs: params.num_runs,
        num_impacts: impacts,
        impact_probability,
        mean_moid_km: mean_moid,
        std_moid_km: variance.max(0.0).sqrt(),
        min_moid_km: min_moid,
        palermo_scale: palermo_scale(impact_probability, params.simulation_days / 365.25),
    })
}
