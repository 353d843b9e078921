use std::collections::{BTreeSet, HashMap};

use super::Object;
use crate::error::ValidationError;
use crate::protocol::{DISPLAY_ID, ObjectId, SERVER_ID_START};

enum Slot {
    Live(Object),
    /// Destroyed by the client, waiting for the compositor's `delete_id`.
    Retired(&'static str),
}

/// The connection's arena of protocol objects, keyed by id.
///
/// Client ids are handed out from `[1, SERVER_ID_START)`. A destroyed id is retired at
/// once, so its events are dropped, and only becomes reusable after `delete_id`.
pub(crate) struct ObjectMap {
    slots: HashMap<ObjectId, Slot>,
    next_id: ObjectId,
    free: BTreeSet<ObjectId>,
}

impl ObjectMap {
    pub(crate) fn new(display: Object) -> Self {
        let mut slots = HashMap::new();
        slots.insert(DISPLAY_ID, Slot::Live(display));
        Self {
            slots,
            next_id: DISPLAY_ID + 1,
            free: BTreeSet::new(),
        }
    }

    /// Allocates an id for `object`, preferring the lowest released id.
    pub(crate) fn insert(&mut self, object: Object) -> Result<ObjectId, ValidationError> {
        let id = match self.free.pop_first() {
            Some(id) => id,
            None if self.next_id < SERVER_ID_START => {
                self.next_id += 1;
                self.next_id - 1
            }
            None => return Err(ValidationError::IdsExhausted),
        };

        log::debug!("allocated {}@{id}", object.interface());
        self.slots.insert(id, Slot::Live(object));
        Ok(id)
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<Object> {
        match self.slots.get(&id) {
            Some(Slot::Live(object)) => Some(object.clone()),
            _ => None,
        }
    }

    /// Stops routing events to `id`. The id itself stays reserved.
    pub(crate) fn retire(&mut self, id: ObjectId) -> bool {
        if id == DISPLAY_ID {
            return false;
        }
        match self.slots.get(&id) {
            Some(Slot::Live(object)) => {
                let interface = object.interface();
                log::debug!("retired {interface}@{id}");
                self.slots.insert(id, Slot::Retired(interface));
                true
            }
            _ => false,
        }
    }

    /// Handles `wl_display.delete_id`: the compositor no longer knows `id`.
    pub(crate) fn release(&mut self, id: ObjectId) -> bool {
        if id == DISPLAY_ID {
            return false;
        }
        match self.slots.remove(&id) {
            Some(slot) => {
                let interface = match &slot {
                    Slot::Live(object) => object.interface(),
                    Slot::Retired(interface) => *interface,
                };
                log::debug!("released {interface}@{id}");
                if id < SERVER_ID_START {
                    self.free.insert(id);
                }
                true
            }
            None => {
                log::debug!("delete_id for unallocated id {id}");
                false
            }
        }
    }

    /// Interface of a live or retired id.
    pub(crate) fn interface(&self, id: ObjectId) -> Option<&'static str> {
        match self.slots.get(&id)? {
            Slot::Live(object) => Some(object.interface()),
            Slot::Retired(interface) => Some(*interface),
        }
    }

    /// Live objects, sorted by id.
    pub(crate) fn live(&self) -> Vec<(ObjectId, &'static str)> {
        let mut live: Vec<_> = self
            .slots
            .iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Live(object) => Some((*id, object.interface())),
                Slot::Retired(_) => None,
            })
            .collect();
        live.sort_unstable();
        live
    }

    /// Drops every object except the display, as on disconnect.
    pub(crate) fn clear(&mut self) {
        self.slots.retain(|id, _| *id == DISPLAY_ID);
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectData;
    use crate::protocol::display::DisplayData;
    use crate::protocol::region::RegionData;

    fn map() -> ObjectMap {
        ObjectMap::new(DisplayData::new().into_object())
    }

    fn region() -> Object {
        RegionData::new(1).into_object()
    }

    #[test]
    fn ids_are_unique_while_live() {
        let mut map = map();
        let ids: Vec<_> = (0..5).map(|_| map.insert(region()).unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn retired_ids_are_not_reused_before_delete_id() {
        let mut map = map();
        let a = map.insert(region()).unwrap();
        assert!(map.retire(a));
        assert!(map.get(a).is_none());
        assert_eq!(map.interface(a), Some("wl_region"));
        assert_ne!(map.insert(region()).unwrap(), a);

        assert!(map.release(a));
        assert_eq!(map.insert(region()).unwrap(), a);
    }

    #[test]
    fn lowest_released_id_is_reused_first() {
        let mut map = map();
        let ids: Vec<_> = (0..4).map(|_| map.insert(region()).unwrap()).collect();
        for id in [ids[3], ids[1]] {
            map.retire(id);
            map.release(id);
        }
        assert_eq!(map.insert(region()).unwrap(), ids[1]);
        assert_eq!(map.insert(region()).unwrap(), ids[3]);
        assert_eq!(map.insert(region()).unwrap(), 6);
    }

    #[test]
    fn display_is_permanent() {
        let mut map = map();
        assert!(!map.retire(DISPLAY_ID));
        assert!(!map.release(DISPLAY_ID));
        map.clear();
        assert_eq!(map.live(), vec![(DISPLAY_ID, "wl_display")]);
    }

    #[test]
    fn stops_before_the_server_range() {
        let mut map = map();
        map.next_id = SERVER_ID_START - 1;
        assert_eq!(map.insert(region()).unwrap(), SERVER_ID_START - 1);
        assert_eq!(
            map.insert(region()).unwrap_err(),
            ValidationError::IdsExhausted
        );
    }
}
