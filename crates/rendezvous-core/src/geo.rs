use rendezvous_models::LatLng;

/// Arithmetic-mean meeting point of the submitted coordinates.
///
/// Deliberately the naive centroid rather than a geometric-median or
/// travel-time solver; the averaging happens on raw degrees, which is fine
/// at the city scale this serves (antimeridian-straddling groups will get a
/// poor suggestion).
pub fn centroid(points: &[LatLng]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let lng = points.iter().map(|p| p.lng).sum::<f64>() / n;
    Some(LatLng { lat, lng })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_centroid() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn single_point_is_its_own_centroid() {
        let p = LatLng { lat: 48.8566, lng: 2.3522 };
        assert_eq!(centroid(&[p]), Some(p));
    }

    #[test]
    fn mean_of_symmetric_points_is_the_middle() {
        let points = [
            LatLng { lat: 10.0, lng: 20.0 },
            LatLng { lat: -10.0, lng: -20.0 },
        ];
        let c = centroid(&points).unwrap();
        assert_eq!(c.lat, 0.0);
        assert_eq!(c.lng, 0.0);
    }

    #[test]
    fn mean_of_three_cities() {
        let points = [
            LatLng { lat: 52.52, lng: 13.405 },   // Berlin
            LatLng { lat: 48.8566, lng: 2.3522 }, // Paris
            LatLng { lat: 51.5074, lng: -0.1278 }, // London
        ];
        let c = centroid(&points).unwrap();
        assert!((c.lat - 50.9613).abs() < 1e-3);
        assert!((c.lng - 5.2098).abs() < 1e-3);
    }
}
