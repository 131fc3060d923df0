use serde::{Deserialize, Serialize};

use crate::analytics::geo::GeoPoint;
use crate::analytics::segments::SegmentRules;
use crate::domain::customer::{Customer, CustomerId};

pub const DEFAULT_ZOOM: u8 = 13;
/// Zoom ceiling when fitting the view to the markers.
pub const FIT_MAX_ZOOM: u8 = 15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub customer_id: CustomerId,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub gps_address: String,
    pub position: GeoPoint,
    pub average_bags: u32,
    pub high_volume: bool,
    pub local: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl MapBounds {
    pub fn around(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, point| {
            Some(match bounds {
                None => Self {
                    south: point.latitude,
                    west: point.longitude,
                    north: point.latitude,
                    east: point.longitude,
                },
                Some(bounds) => Self {
                    south: bounds.south.min(point.latitude),
                    west: bounds.west.min(point.longitude),
                    north: bounds.north.max(point.latitude),
                    east: bounds.east.max(point.longitude),
                },
            })
        })
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub max_fit_zoom: u8,
    pub bounds: Option<MapBounds>,
    pub markers: Vec<MapMarker>,
}

impl MapView {
    /// Falls back to the depot at the default zoom when there is nothing to fit.
    pub fn from_customers(customers: &[Customer], rules: &SegmentRules) -> Self {
        let markers: Vec<MapMarker> = customers
            .iter()
            .map(|customer| MapMarker {
                customer_id: customer.id,
                business_name: customer.business_name.clone(),
                contact_name: customer.contact_name.clone(),
                phone: customer.phone.clone(),
                gps_address: customer.gps_address.clone(),
                position: customer.position(),
                average_bags: customer.average_bags,
                high_volume: rules.is_high_volume(customer),
                local: rules.is_local(customer),
            })
            .collect();

        let bounds = MapBounds::around(markers.iter().map(|marker| marker.position));
        let center = bounds.map(|bounds| bounds.center()).unwrap_or(rules.reference);

        Self { center, zoom: DEFAULT_ZOOM, max_fit_zoom: FIT_MAX_ZOOM, bounds, markers }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{MapBounds, MapView, DEFAULT_ZOOM};
    use crate::analytics::geo::GeoPoint;
    use crate::analytics::segments::SegmentRules;
    use crate::domain::customer::{Customer, CustomerId};

    fn customer(latitude: f64, longitude: f64, bags: u32) -> Customer {
        Customer {
            id: CustomerId::new(),
            business_name: "Kaneshie Market Stall".to_string(),
            contact_name: "Adjoa".to_string(),
            phone: "0277000000".to_string(),
            gps_address: "GA-222-3333".to_string(),
            latitude,
            longitude,
            average_bags: bags,
            last_visit: Utc::now(),
        }
    }

    #[test]
    fn empty_map_centres_on_reference_point() {
        let rules = SegmentRules::default();
        let view = MapView::from_customers(&[], &rules);

        assert_eq!(view.center, rules.reference);
        assert_eq!(view.zoom, DEFAULT_ZOOM);
        assert!(view.bounds.is_none());
        assert!(view.markers.is_empty());
    }

    #[test]
    fn bounds_cover_every_marker() {
        let customers = vec![customer(5.55, -0.25, 10), customer(5.65, -0.15, 70)];
        let view = MapView::from_customers(&customers, &SegmentRules::default());

        assert_eq!(
            view.bounds,
            Some(MapBounds { south: 5.55, west: -0.25, north: 5.65, east: -0.15 })
        );
        assert!((view.center.latitude - 5.6).abs() < 1e-9);
        assert!((view.center.longitude + 0.2).abs() < 1e-9);
        assert_eq!(view.markers.len(), 2);
        assert!(!view.markers[0].high_volume);
        assert!(view.markers[1].high_volume);
    }

    #[test]
    fn markers_flag_local_customers() {
        let rules = SegmentRules::default();
        let near = customer(rules.reference.latitude, rules.reference.longitude, 5);
        let far = customer(6.6885, -1.6244, 5);

        let view = MapView::from_customers(&[near, far], &rules);

        assert!(view.markers[0].local);
        assert!(!view.markers[1].local);
        assert_eq!(view.markers[1].position, GeoPoint::new(6.6885, -1.6244));
    }
}
