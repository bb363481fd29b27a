//! Process-wide room-id -> `Room` map.
//!
//! Populated once at startup from the static configuration-driven room list that stands in for
//! the out-of-scope gRPC room-creation API; rooms are removed when [`RoomRegistry::remove`] runs,
//! which in this crate happens on an explicit admin/shutdown action rather than on last-client
//! departure (a room with no clients remains addressable and ready to admit a new creator).

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::hooks::ServiceHook;
use crate::room::{Room, RoomConfig};
use crate::Error;

pub struct RoomRegistry<H: ServiceHook> {
    rooms: Mutex<AHashMap<u32, Arc<Room<H>>>>,
}

impl<H: ServiceHook> RoomRegistry<H> {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(AHashMap::default()),
        }
    }

    /// Creates and registers a room under `id`, built with `hook`. Fails with `Error::Duplicate`
    /// if `id` is already in use.
    pub fn create(&self, id: u32, config: RoomConfig, hook: H) -> Result<Arc<Room<H>>, Error> {
        let mut rooms = self.rooms.lock();
        if rooms.contains_key(&id) {
            return Err(Error::Duplicate);
        }
        let room = Room::new(id, config, hook);
        rooms.insert(id, room.clone());
        Ok(room)
    }

    pub fn get(&self, id: u32) -> Option<Arc<Room<H>>> {
        self.rooms.lock().get(&id).cloned()
    }

    /// Removes `id` from the registry, returning it if it was present. Idempotent. Does not itself
    /// call [`Room::close`]; callers that want the room's transports closed too should call it
    /// before or after removing, as appropriate.
    pub fn remove(&self, id: u32) -> Option<Arc<Room<H>>> {
        self.rooms.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
