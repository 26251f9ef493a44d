use serde::Serialize;

/// Axis-aligned lon/lat box with closed bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// JFK airport, (-73.821618, 40.622204) to (-73.74587, 40.666826).
pub const JFK_AIRPORT: BoundingBox = BoundingBox {
    min_lon: -73.821618,
    max_lon: -73.74587,
    min_lat: 40.622204,
    max_lat: 40.666826,
};

impl BoundingBox {
    /// A missing coordinate is never inside the box.
    pub fn contains(&self, lon: Option<f64>, lat: Option<f64>) -> bool {
        match (lon, lat) {
            (Some(lon), Some(lat)) => {
                (self.min_lon..=self.max_lon).contains(&lon)
                    && (self.min_lat..=self.max_lat).contains(&lat)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jfk_inside_and_outside() {
        assert!(JFK_AIRPORT.contains(Some(-73.78), Some(40.64)));
        // midtown Manhattan
        assert!(!JFK_AIRPORT.contains(Some(-74.00), Some(40.75)));
        // right longitude, wrong latitude
        assert!(!JFK_AIRPORT.contains(Some(-73.78), Some(40.70)));
    }

    #[test]
    fn test_jfk_edges_are_inclusive() {
        assert!(JFK_AIRPORT.contains(Some(-73.821618), Some(40.622204)));
        assert!(JFK_AIRPORT.contains(Some(-73.74587), Some(40.666826)));
        assert!(!JFK_AIRPORT.contains(Some(-73.7458), Some(40.64)));
    }

    #[test]
    fn test_missing_coordinates_are_outside() {
        assert!(!JFK_AIRPORT.contains(None, Some(40.64)));
        assert!(!JFK_AIRPORT.contains(Some(-73.78), None));
        assert!(!JFK_AIRPORT.contains(Some(f64::NAN), Some(40.64)));
    }
}
