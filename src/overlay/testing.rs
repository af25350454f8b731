//! In-memory provider that records every call, for overlay tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::ProviderError;
use crate::geo::LngLat;
use crate::overlay::provider::{FlyTo, MapProvider, MarkerId, PopupId};
use crate::popup::PopupContent;

#[derive(Debug, Default)]
pub struct Record {
    next_id: u64,
    pub markers: HashSet<MarkerId>,
    pub popups_created: usize,
    pub contents: HashMap<PopupId, PopupContent>,
    pub visible: HashMap<PopupId, LngLat>,
    /// Most popups ever visible at once
    pub peak_visible: usize,
    /// `show_popup` calls on a popup that was still visible
    pub overlapping_shows: usize,
    pub flights: Vec<FlyTo>,
    pub destroyed: usize,
    pub reject_lat: Option<f64>,
}

impl Record {
    pub fn live_markers(&self) -> usize {
        self.markers.len()
    }

    pub fn visible_popups(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_title(&self) -> Option<String> {
        self.visible
            .keys()
            .next()
            .and_then(|id| self.contents.get(id))
            .map(|c| c.title.clone())
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct RecordingProvider {
    record: Rc<RefCell<Record>>,
}

impl RecordingProvider {
    pub fn new() -> (Self, Rc<RefCell<Record>>) {
        let record = Rc::new(RefCell::new(Record::default()));
        (
            Self {
                record: Rc::clone(&record),
            },
            record,
        )
    }
}

impl MapProvider for RecordingProvider {
    fn add_marker(&mut self, at: LngLat) -> Result<MarkerId, ProviderError> {
        let mut record = self.record.borrow_mut();
        if record.reject_lat == Some(at.lat) {
            return Err(ProviderError::MarkerRejected { lng: at.lng, lat: at.lat });
        }
        let id = MarkerId(record.next());
        record.markers.insert(id);
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.record.borrow_mut().markers.remove(&id);
    }

    fn create_popup(&mut self) -> PopupId {
        let mut record = self.record.borrow_mut();
        record.popups_created += 1;
        PopupId(record.next())
    }

    fn set_popup_content(&mut self, id: PopupId, content: PopupContent) {
        self.record.borrow_mut().contents.insert(id, content);
    }

    fn show_popup(&mut self, id: PopupId, at: LngLat) {
        let mut record = self.record.borrow_mut();
        if record.visible.insert(id, at).is_some() {
            record.overlapping_shows += 1;
        }
        record.peak_visible = record.peak_visible.max(record.visible.len());
    }

    fn remove_popup(&mut self, id: PopupId) {
        self.record.borrow_mut().visible.remove(&id);
    }

    fn fly_to(&mut self, cmd: FlyTo) {
        self.record.borrow_mut().flights.push(cmd);
    }

    fn destroy(&mut self) {
        let mut record = self.record.borrow_mut();
        record.markers.clear();
        record.visible.clear();
        record.destroyed += 1;
    }
}
