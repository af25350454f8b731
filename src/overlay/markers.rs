use std::collections::HashMap;

use tracing::{debug, warn};

use crate::district::District;
use crate::geo::LngLat;
use crate::overlay::provider::{MapProvider, MarkerId};

/// A marker currently on the map and the district it stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountedMarker {
    pub id: MarkerId,
    /// Index into the district list the set was built from
    pub district: usize,
    pub at: LngLat,
}

/// Outcome of one rebuild pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub mounted: usize,
    pub skipped: usize,
}

/// Exclusive owner of every marker handle the overlay has created.
///
/// Rebuilds are full teardown + recreate; there is no diffing.
#[derive(Debug, Default)]
pub struct MarkerSet {
    mounted: Vec<MountedMarker>,
    by_id: HashMap<MarkerId, usize>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every existing marker, then mount one per district with a
    /// usable coordinate. Bad districts are skipped, never fatal.
    pub fn rebuild<P: MapProvider>(&mut self, provider: &mut P, districts: &[District]) -> RebuildReport {
        self.clear(provider);

        let mut report = RebuildReport::default();
        self.mounted.reserve(districts.len());

        for (index, district) in districts.iter().enumerate() {
            let Some(at) = district.coordinate() else {
                warn!(
                    id = %district.id,
                    name = %district.name,
                    latitude = ?district.latitude,
                    longitude = ?district.longitude,
                    "skipping district without usable coordinates"
                );
                report.skipped += 1;
                continue;
            };

            match provider.add_marker(at) {
                Ok(id) => {
                    self.by_id.insert(id, self.mounted.len());
                    self.mounted.push(MountedMarker { id, district: index, at });
                    report.mounted += 1;
                }
                Err(err) => {
                    warn!(id = %district.id, error = %err, "provider rejected marker");
                    report.skipped += 1;
                }
            }
        }

        debug!(mounted = report.mounted, skipped = report.skipped, "markers rebuilt");
        report
    }

    /// Remove every marker from the provider
    pub fn clear<P: MapProvider>(&mut self, provider: &mut P) {
        for marker in self.mounted.drain(..) {
            provider.remove_marker(marker.id);
        }
        self.by_id.clear();
    }

    /// Lookup by handle; ids from earlier rebuilds resolve to `None`
    pub fn get(&self, id: MarkerId) -> Option<&MountedMarker> {
        self.by_id.get(&id).and_then(|&idx| self.mounted.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountedMarker> {
        self.mounted.iter()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::testing::RecordingProvider;

    fn districts() -> Vec<District> {
        vec![
            District::new("1", "Cocody").with_position(5.36, -4.0),
            District::new("2", "Nowhere"),
            District::new("3", "Broken").with_position("abc", -4.0),
            District::new("4", "Yopougon").with_position("5.33", "-4.07"),
            District::new("5", "Infinite").with_position(f64::INFINITY, -4.0),
        ]
    }

    #[test]
    fn test_rebuild_skips_invalid_coordinates() {
        let (mut provider, record) = RecordingProvider::new();
        let mut set = MarkerSet::new();
        let report = set.rebuild(&mut provider, &districts());

        assert_eq!(report, RebuildReport { mounted: 2, skipped: 3 });
        assert_eq!(record.borrow().live_markers(), 2);
        let indices: Vec<usize> = set.iter().map(|m| m.district).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_rebuild_twice_does_not_leak() {
        let (mut provider, record) = RecordingProvider::new();
        let mut set = MarkerSet::new();
        let list = districts();

        set.rebuild(&mut provider, &list);
        let first: Vec<MarkerId> = set.iter().map(|m| m.id).collect();
        set.rebuild(&mut provider, &list);

        assert_eq!(set.len(), 2);
        assert_eq!(record.borrow().live_markers(), 2);
        for id in first {
            assert!(set.get(id).is_none(), "stale id {id:?} still resolves");
        }
    }

    #[test]
    fn test_provider_rejection_is_isolated() {
        let (mut provider, record) = RecordingProvider::new();
        record.borrow_mut().reject_lat = Some(5.33);
        let mut set = MarkerSet::new();
        let report = set.rebuild(&mut provider, &districts());
        assert_eq!(report, RebuildReport { mounted: 1, skipped: 4 });
    }

    #[test]
    fn test_clear_removes_everything() {
        let (mut provider, record) = RecordingProvider::new();
        let mut set = MarkerSet::new();
        set.rebuild(&mut provider, &districts());
        set.clear(&mut provider);
        assert!(set.is_empty());
        assert_eq!(record.borrow().live_markers(), 0);
    }
}
