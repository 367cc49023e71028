// NeoDefense - Asteroid Impact & Planetary Defense Physics Core
// Library entry point: orbital mechanics, impact consequences and deflection

pub mod config;
pub mod deflection;
pub mod engine;
pub mod error;
pub mod impact_model;
pub mod monte_carlo;
pub mod neo_catalog;
pub mod orbital_mechanics;
pub mod physics_engine;
pub mod population_cache;

pub use config::EngineConfig;
pub use deflection::{
    AsteroidProperties, DeflectionMethod, DeflectionMission, DeflectionModel, DeflectionOutcome,
    MitigatedImpact, RtnVector,
};
pub use engine::Engine;
pub use error::{PhysicsError, Result};
pub use impact_model::{ImpactAssessment, ImpactModel, ImpactScenario, Surface};
pub use monte_carlo::{monte_carlo_impact_probability, MonteCarloParams, MonteCarloResult};
pub use orbital_mechanics::{
    elements_to_state, state_to_elements, KeplerSolver, OrbitPropagator, OrbitalElements,
};
pub use physics_engine::{Body, NBodyIntegrator, StateVector, Trajectory, Vector3};
pub use population_cache::PopulationCache;
