// NEO Catalog - NASA NeoWs records to orbital elements and scenarios
// Parses JSON already fetched by the caller; no network access here

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::deflection::AsteroidProperties;
use crate::error::{PhysicsError, Result};
use crate::impact_model::{ImpactScenario, Surface};
use crate::orbital_mechanics::{julian_date, OrbitalElements};
use crate::physics_engine::{asteroid_density, sphere_mass, target_density, SECONDS_PER_DAY};

/// Geometric albedo assumed when converting H to a diameter
pub const DEFAULT_ALBEDO: f64 = 0.14;

/// Typical NEO impact velocity when a record has no approach data (km/s)
pub const DEFAULT_IMPACT_VELOCITY_KM_S: f64 = 17.0;

// =============================================================================
// API RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub element_count: Option<i32>,
    pub near_earth_objects: Option<HashMap<String, Vec<NeoObject>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub page: Option<PageInfo>,
    pub near_earth_objects: Vec<NeoObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub size: i32,
    pub total_elements: i32,
    pub total_pages: i32,
    pub number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeoObject {
    pub id: String,
    pub name: String,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: Option<EstimatedDiameter>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_data: Option<Vec<CloseApproachData>>,
    pub orbital_data: Option<OrbitalData>,
    pub is_sentry_object: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedDiameter {
    pub meters: Option<DiameterRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_min: f64,
    pub estimated_diameter_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseApproachData {
    pub close_approach_date: Option<String>,
    pub close_approach_date_full: Option<String>,
    pub epoch_date_close_approach: Option<i64>,
    pub relative_velocity: Option<RelativeVelocity>,
    pub miss_distance: Option<MissDistance>,
    pub orbiting_body: Option<String>,
}

// NeoWs ships numbers as strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissDistance {
    pub kilometers: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitalData {
    pub epoch_osculation: Option<String>,
    pub eccentricity: Option<String>,
    pub semi_major_axis: Option<String>,
    pub inclination: Option<String>,
    pub ascending_node_longitude: Option<String>,
    pub perihelion_argument: Option<String>,
    pub mean_anomaly: Option<String>,
    pub minimum_orbit_intersection: Option<String>,
    pub orbit_class: Option<OrbitClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitClass {
    pub orbit_class_type: Option<String>,
}

// =============================================================================
// PROCESSED ASTEROID DATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAsteroid {
    pub id: String,
    pub name: String,
    pub elements: OrbitalElements,
    /// Julian Date of the osculating elements, if the record states one
    pub epoch_jd: Option<f64>,
    pub estimated_diameter_m: f64,
    pub estimated_density_kg_m3: f64,
    pub estimated_mass_kg: f64,
    pub is_potentially_hazardous: bool,
    pub is_sentry_object: bool,
    pub absolute_magnitude: Option<f64>,
    pub orbit_class: String,
    pub moid_au: Option<f64>,
    pub close_approaches: Vec<CloseApproach>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseApproach {
    pub time: Option<DateTime<Utc>>,
    pub miss_distance_km: Option<f64>,
    pub velocity_km_s: Option<f64>,
    pub orbiting_body: Option<String>,
}

impl CloseApproach {
    /// Days from `reference` to this approach; negative if already past.
    pub fn days_after(&self, reference: DateTime<Utc>) -> Option<f64> {
        self.time
            .map(|t| (t - reference).num_seconds() as f64 / SECONDS_PER_DAY)
    }
}

/// Estimate asteroid density based on spectral/orbit class
/// References: Carry (2012), DeMeo & Carry (2013)
pub fn estimate_density(class: &str) -> f64 {
    match class.to_uppercase().as_str() {
        // NEA orbital classes carry no composition hint
        "AMO" | "APO" | "ATE" | "IEO" => asteroid_density::DEFAULT,

        s if s.contains('C') => asteroid_density::C_TYPE,
        s if s.contains('B') => 1500.0, // primitive
        s if s.contains('D') => 1200.0, // organic-rich
        s if s.contains('P') => 1300.0, // primitive
        s if s.contains('S') => asteroid_density::S_TYPE,
        s if s.contains('Q') => 2500.0, // ordinary chondrite
        s if s.contains('V') => 3200.0, // basaltic
        s if s.contains('M') => asteroid_density::M_TYPE,
        s if s.contains('X') => 3500.0, // metal-rich, unconfirmed

        _ => asteroid_density::DEFAULT,
    }
}

/// Diameter (m) from absolute magnitude H and geometric albedo.
pub fn diameter_from_magnitude(absolute_magnitude: f64, albedo: f64) -> f64 {
    1329.0 / albedo.sqrt() * 10f64.powf(-absolute_magnitude / 5.0) * 1000.0
}

/// Parses "2029-Apr-13 21:46" or, failing that, "2029-04-13" at 00:00 UTC.
pub fn parse_approach_time(full: Option<&str>, date: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(full) = full {
        if let Ok(t) = NaiveDateTime::parse_from_str(full, "%Y-%b-%d %H:%M") {
            return Some(t.and_utc());
        }
    }
    date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn parse_field(value: &Option<String>, field: &str, id: &str) -> Result<f64> {
    let parsed = value
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite());
    parsed.ok_or_else(|| PhysicsError::Catalog(format!("{id}: missing or malformed {field}")))
}

/// Absent stays `None`; present but unparsable is an error.
fn parse_optional_field(value: Option<&String>, field: &str, id: &str) -> Result<Option<f64>> {
    value
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PhysicsError::Catalog(format!("{id}: malformed {field} {s:?}")))
        })
        .transpose()
}

impl NeoObject {
    /// Convert a NeoWs record into elements and physical estimates.
    pub fn to_catalog_entry(&self) -> Result<CatalogAsteroid> {
        let orbital = self
            .orbital_data
            .as_ref()
            .ok_or_else(|| PhysicsError::Catalog(format!("{}: no orbital data", self.id)))?;

        let elements = OrbitalElements::new(
            parse_field(&orbital.semi_major_axis, "semi_major_axis", &self.id)?,
            parse_field(&orbital.eccentricity, "eccentricity", &self.id)?,
            parse_field(&orbital.inclination, "inclination", &self.id)?,
            parse_field(&orbital.ascending_node_longitude, "ascending_node_longitude", &self.id)?,
            parse_field(&orbital.perihelion_argument, "perihelion_argument", &self.id)?,
            parse_field(&orbital.mean_anomaly, "mean_anomaly", &self.id)?,
        )
        .map_err(|e| PhysicsError::Catalog(format!("{}: {e}", self.id)))?;

        let epoch_jd =
            parse_optional_field(orbital.epoch_osculation.as_ref(), "epoch_osculation", &self.id)?;

        // Mean of the published range, else derived from H
        let diameter = self
            .estimated_diameter
            .as_ref()
            .and_then(|d| d.meters.as_ref())
            .map(|m| (m.estimated_diameter_min + m.estimated_diameter_max) / 2.0)
            .or_else(|| {
                self.absolute_magnitude_h
                    .map(|h| diameter_from_magnitude(h, DEFAULT_ALBEDO))
            })
            .ok_or_else(|| {
                PhysicsError::Catalog(format!("{}: neither diameter nor magnitude", self.id))
            })?;

        let orbit_class = orbital
            .orbit_class
            .as_ref()
            .and_then(|c| c.orbit_class_type.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let density = estimate_density(&orbit_class);

        let close_approaches = self
            .close_approach_data
            .iter()
            .flatten()
            .map(|ca| {
                Ok(CloseApproach {
                    time: parse_approach_time(
                        ca.close_approach_date_full.as_deref(),
                        ca.close_approach_date.as_deref(),
                    ),
                    miss_distance_km: parse_optional_field(
                        ca.miss_distance.as_ref().and_then(|m| m.kilometers.as_ref()),
                        "miss_distance",
                        &self.id,
                    )?,
                    velocity_km_s: parse_optional_field(
                        ca.relative_velocity
                            .as_ref()
                            .and_then(|v| v.kilometers_per_second.as_ref()),
                        "relative_velocity",
                        &self.id,
                    )?,
                    orbiting_body: ca.orbiting_body.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogAsteroid {
            id: self.id.clone(),
            name: self.name.clone(),
            elements,
            epoch_jd,
            estimated_diameter_m: diameter,
            estimated_density_kg_m3: density,
            estimated_mass_kg: sphere_mass(diameter, density),
            is_potentially_hazardous: self.is_potentially_hazardous_asteroid.unwrap_or(false),
            is_sentry_object: self.is_sentry_object.unwrap_or(false),
            absolute_magnitude: self.absolute_magnitude_h,
            orbit_class,
            moid_au: orbital
                .minimum_orbit_intersection
                .as_deref()
                .and_then(|s| s.parse().ok()),
            close_approaches,
        })
    }
}

impl CatalogAsteroid {
    /// First Earth approach at or after `reference`.
    pub fn next_earth_approach(&self, reference: DateTime<Utc>) -> Option<&CloseApproach> {
        self.close_approaches
            .iter()
            .filter(|ca| ca.orbiting_body.as_deref() == Some("Earth"))
            .filter(|ca| ca.days_after(reference).is_some_and(|d| d >= 0.0))
            .min_by(|a, b| a.time.cmp(&b.time))
    }

    /// Warning time (s) until the next Earth approach.
    pub fn warning_time_s(&self, reference: DateTime<Utc>) -> Option<f64> {
        self.next_earth_approach(reference)
            .and_then(|ca| ca.days_after(reference))
            .map(|days| days * SECONDS_PER_DAY)
    }

    /// Days between the element epoch and `reference`; `None` without an epoch.
    pub fn epoch_age_days(&self, reference: DateTime<Utc>) -> Option<f64> {
        self.epoch_jd.map(|epoch| julian_date(reference) - epoch)
    }

    /// Hypothetical impact of this object at its next approach speed.
    pub fn impact_scenario(
        &self,
        reference: DateTime<Utc>,
        angle_deg: f64,
        surface: Surface,
    ) -> ImpactScenario {
        let velocity = self
            .next_earth_approach(reference)
            .and_then(|ca| ca.velocity_km_s)
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_IMPACT_VELOCITY_KM_S);
        let target = match surface {
            Surface::Land => target_density::ROCK,
            Surface::Ocean { .. } => target_density::SEAWATER,
        };
        ImpactScenario {
            diameter_m: self.estimated_diameter_m,
            velocity_km_s: velocity,
            density_kg_m3: self.estimated_density_kg_m3,
            angle_deg,
            target_density_kg_m3: target,
            surface,
        }
    }

    /// Deflection target built from the next approach.
    pub fn asteroid_properties(&self, reference: DateTime<Utc>) -> Result<AsteroidProperties> {
        let approach = self.next_earth_approach(reference).ok_or_else(|| {
            PhysicsError::Catalog(format!("{}: no upcoming Earth approach", self.id))
        })?;
        let velocity_km_s = approach.velocity_km_s.ok_or_else(|| {
            PhysicsError::Catalog(format!("{}: next approach has no relative velocity", self.id))
        })?;
        let original_miss_distance_km = approach.miss_distance_km.ok_or_else(|| {
            PhysicsError::Catalog(format!("{}: next approach has no miss distance", self.id))
        })?;
        let properties = AsteroidProperties {
            diameter_m: self.estimated_diameter_m,
            density_kg_m3: self.estimated_density_kg_m3,
            velocity_km_s,
            original_miss_distance_km,
        };
        properties.validate()?;
        Ok(properties)
    }
}

fn collect_entries(objects: impl IntoIterator<Item = NeoObject>) -> Vec<CatalogAsteroid> {
    objects
        .into_iter()
        .filter_map(|neo| match neo.to_catalog_entry() {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping catalog record: {e}");
                None
            }
        })
        .collect()
}

/// Parse a `/neo/browse` page; returns the usable records and total page count.
pub fn parse_browse(json: &str) -> Result<(Vec<CatalogAsteroid>, i32)> {
    let data: BrowseResponse =
        serde_json::from_str(json).map_err(|e| PhysicsError::Catalog(e.to_string()))?;
    let total_pages = data.page.as_ref().map(|p| p.total_pages).unwrap_or(1);
    Ok((collect_entries(data.near_earth_objects), total_pages))
}

/// Parse a `/feed` response (records grouped by date).
pub fn parse_feed(json: &str) -> Result<Vec<CatalogAsteroid>> {
    let data: FeedResponse =
        serde_json::from_str(json).map_err(|e| PhysicsError::Catalog(e.to_string()))?;
    let mut by_date: Vec<(String, Vec<NeoObject>)> =
        data.near_earth_objects.unwrap_or_default().into_iter().collect();
    // HashMap order is random
    by_date.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(collect_entries(by_date.into_iter().flat_map(|(_, neos)| neos)))
}

/// Parse a single `/neo/{id}` lookup.
pub fn parse_neo(json: &str) -> Result<CatalogAsteroid> {
    let neo: NeoObject =
        serde_json::from_str(json).map_err(|e| PhysicsError::Catalog(e.to_string()))?;
    neo.to_catalog_entry()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    const APOPHIS: &str = r#"{
        "id": "2099942",
        "name": "99942 Apophis (2004 MN4)",
        "absolute_magnitude_h": 19.09,
        "estimated_diameter": {
            "meters": { "estimated_diameter_min": 340.0, "estimated_diameter_max": 400.0 }
        },
        "is_potentially_hazardous_asteroid": true,
        "is_sentry_object": false,
        "close_approach_data": [
            {
                "close_approach_date": "2029-04-13",
                "close_approach_date_full": "2029-Apr-13 21:46",
                "relative_velocity": { "kilometers_per_second": "7.4221" },
                "miss_distance": { "kilometers": "38011.9" },
                "orbiting_body": "Earth"
            },
            {
                "close_approach_date": "2013-01-09",
                "relative_velocity": { "kilometers_per_second": "3.38" },
                "miss_distance": { "kilometers": "14461000" },
                "orbiting_body": "Earth"
            }
        ],
        "orbital_data": {
            "epoch_osculation": "2461000.5",
            "eccentricity": ".1914",
            "semi_major_axis": "0.9224",
            "inclination": "3.339",
            "ascending_node_longitude": "204.43",
            "perihelion_argument": "126.60",
            "mean_anomaly": "61.42",
            "minimum_orbit_intersection": ".000254",
            "orbit_class": { "orbit_class_type": "ATE" }
        }
    }"#;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_single_record() {
        let apophis = parse_neo(APOPHIS).unwrap();
        assert_eq!(apophis.name, "99942 Apophis (2004 MN4)");
        assert_relative_eq!(apophis.elements.eccentricity, 0.1914);
        assert_relative_eq!(apophis.estimated_diameter_m, 370.0);
        assert_eq!(apophis.estimated_density_kg_m3, asteroid_density::DEFAULT);
        assert_eq!(apophis.moid_au, Some(0.000254));
        assert_eq!(apophis.epoch_jd, Some(2461000.5));
        assert!(apophis.is_potentially_hazardous);
        assert_eq!(apophis.close_approaches.len(), 2);
        // Elements were osculated 324 days after the reference date
        assert_relative_eq!(
            apophis.epoch_age_days(reference()).unwrap(),
            -324.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_next_approach_and_warning_time() {
        let apophis = parse_neo(APOPHIS).unwrap();
        let next = apophis.next_earth_approach(reference()).unwrap();
        assert_eq!(
            next.time,
            Some(Utc.with_ymd_and_hms(2029, 4, 13, 21, 46, 0).unwrap())
        );
        let days = apophis.warning_time_s(reference()).unwrap() / SECONDS_PER_DAY;
        assert!(days > 1563.0 && days < 1564.0, "got {days}");

        let props = apophis.asteroid_properties(reference()).unwrap();
        assert_relative_eq!(props.velocity_km_s, 7.4221);
        assert_relative_eq!(props.original_miss_distance_km, 38011.9);

        let late = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(apophis.next_earth_approach(late).is_none());
        assert!(apophis.asteroid_properties(late).is_err());
    }

    #[test]
    fn test_impact_scenario_uses_approach_velocity() {
        let apophis = parse_neo(APOPHIS).unwrap();
        let land = apophis.impact_scenario(reference(), 45.0, Surface::Land);
        assert_relative_eq!(land.velocity_km_s, 7.4221);
        assert_eq!(land.target_density_kg_m3, target_density::ROCK);

        let late = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let ocean = apophis.impact_scenario(
            late,
            45.0,
            Surface::Ocean {
                water_depth_m: 4000.0,
            },
        );
        assert_eq!(ocean.velocity_km_s, DEFAULT_IMPACT_VELOCITY_KM_S);
        assert_eq!(ocean.target_density_kg_m3, target_density::SEAWATER);
    }

    #[test]
    fn test_diameter_from_magnitude() {
        // H = 22 at albedo 0.14 is roughly 140 m
        let d = diameter_from_magnitude(22.0, DEFAULT_ALBEDO);
        assert!(d > 130.0 && d < 150.0, "got {d}");

        let json = APOPHIS.replace(
            r#""meters": { "estimated_diameter_min": 340.0, "estimated_diameter_max": 400.0 }"#,
            r#""meters": null"#,
        );
        let apophis = parse_neo(&json).unwrap();
        assert_relative_eq!(
            apophis.estimated_diameter_m,
            diameter_from_magnitude(19.09, DEFAULT_ALBEDO)
        );
    }

    #[test]
    fn test_rejects_incomplete_records() {
        let json = APOPHIS.replace(r#""eccentricity": ".1914","#, "");
        assert!(matches!(parse_neo(&json), Err(PhysicsError::Catalog(msg)) if msg.contains("eccentricity")));

        let hyperbolic = APOPHIS.replace(r#"".1914""#, r#""1.2""#);
        assert!(parse_neo(&hyperbolic).is_err());
        assert!(parse_neo("not json").is_err());
    }

    #[test]
    fn test_missing_epoch_is_not_invented() {
        let json = APOPHIS.replace(r#""epoch_osculation": "2461000.5","#, "");
        let apophis = parse_neo(&json).unwrap();
        assert_eq!(apophis.epoch_jd, None);
        assert_eq!(apophis.epoch_age_days(reference()), None);

        let garbled = APOPHIS.replace(r#""2461000.5""#, r#""soon""#);
        assert!(matches!(parse_neo(&garbled), Err(PhysicsError::Catalog(msg)) if msg.contains("epoch_osculation")));
    }

    #[test]
    fn test_missing_miss_distance_blocks_deflection_target() {
        let json = APOPHIS.replace(r#""miss_distance": { "kilometers": "38011.9" },"#, "");
        let apophis = parse_neo(&json).unwrap();
        let next = apophis.next_earth_approach(reference()).unwrap();
        assert_eq!(next.miss_distance_km, None);
        assert_eq!(next.velocity_km_s, Some(7.4221));
        assert!(matches!(
            apophis.asteroid_properties(reference()),
            Err(PhysicsError::Catalog(msg)) if msg.contains("miss distance")
        ));
    }

    #[test]
    fn test_missing_velocity_blocks_deflection_target() {
        let json = APOPHIS.replace(
            r#""relative_velocity": { "kilometers_per_second": "7.4221" },"#,
            "",
        );
        let apophis = parse_neo(&json).unwrap();
        assert_eq!(apophis.next_earth_approach(reference()).unwrap().velocity_km_s, None);
        assert!(matches!(
            apophis.asteroid_properties(reference()),
            Err(PhysicsError::Catalog(msg)) if msg.contains("relative velocity")
        ));
        // Impact scenarios fall back to the typical entry speed instead
        let land = apophis.impact_scenario(reference(), 45.0, Surface::Land);
        assert_eq!(land.velocity_km_s, DEFAULT_IMPACT_VELOCITY_KM_S);
    }

    #[test]
    fn test_approach_without_body_is_not_assumed_earth() {
        let json = APOPHIS.replacen(r#""orbiting_body": "Earth""#, r#""orbiting_body": null"#, 1);
        let apophis = parse_neo(&json).unwrap();
        assert_eq!(apophis.close_approaches[0].orbiting_body, None);
        assert!(apophis.next_earth_approach(reference()).is_none());
    }

    #[test]
    fn test_malformed_approach_numbers_are_rejected() {
        let json = APOPHIS.replace(r#""38011.9""#, r#""far""#);
        assert!(matches!(parse_neo(&json), Err(PhysicsError::Catalog(msg)) if msg.contains("miss_distance")));
    }

    #[test]
    fn test_browse_skips_bad_records() {
        let broken = APOPHIS.replace(r#""semi_major_axis": "0.9224","#, "");
        let page = format!(
            r#"{{ "page": {{ "size": 2, "total_elements": 2, "total_pages": 7, "number": 0 }},
                 "near_earth_objects": [{APOPHIS}, {broken}] }}"#
        );
        let (entries, pages) = parse_browse(&page).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(pages, 7);
    }

    #[test]
    fn test_feed_is_ordered_by_date() {
        let second = APOPHIS.replace("2099942", "3000001");
        let feed = format!(
            r#"{{ "element_count": 2, "near_earth_objects": {{
                "2025-01-02": [{second}], "2025-01-01": [{APOPHIS}] }} }}"#
        );
        let entries = parse_feed(&feed).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["2099942", "3000001"]);
    }

    #[test]
    fn test_density_by_class() {
        assert_eq!(estimate_density("APO"), asteroid_density::DEFAULT);
        assert_eq!(estimate_density("C"), asteroid_density::C_TYPE);
        assert_eq!(estimate_density("Sq"), asteroid_density::S_TYPE);
        assert_eq!(estimate_density("unknown"), asteroid_density::DEFAULT);
    }
}
