//! Mapping from 32-bit object id to (owner, lifetime, resource path).

use ahash::AHashMap;
use bytes::Bytes;
use num_enum::TryFromPrimitive;
use parking_lot::Mutex;

use crate::Error;

/// Lifetime of a game object, carried as byte 4 of an `instantiate` RPC payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Lifetime {
    OwnerScoped = 1,
    RoomScoped = 2,
}

#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: u32,
    pub owner: u16,
    pub lifetime: Lifetime,
    pub resource_path: Bytes,
}

/// Mutex-guarded `object_id -> GameObject` table, mirroring [`crate::registry::ClientRegistry`]'s
/// operation set.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: Mutex<AHashMap<u32, GameObject>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<GameObject> {
        self.objects.lock().get(&id).cloned()
    }

    /// Adds `object`, failing with `Error::Duplicate` if its id is already registered.
    pub fn add(&self, object: GameObject) -> Result<(), Error> {
        let mut objects = self.objects.lock();
        if objects.contains_key(&object.id) {
            return Err(Error::Duplicate);
        }
        objects.insert(object.id, object);
        Ok(())
    }

    /// Removes `id`, returning it if it was present. Idempotent.
    pub fn remove(&self, id: u32) -> Option<GameObject> {
        self.objects.lock().remove(&id)
    }

    pub fn exists(&self, id: u32) -> bool {
        self.objects.lock().contains_key(&id)
    }

    pub fn snapshot(&self) -> Vec<GameObject> {
        self.objects.lock().values().cloned().collect()
    }

    /// Every object currently owned by `owner`.
    pub fn owned_by(&self, owner: u16) -> Vec<GameObject> {
        self.objects
            .lock()
            .values()
            .filter(|o| o.owner == owner)
            .cloned()
            .collect()
    }

    /// Reassigns `id`'s owner. A no-op if `id` is not registered.
    pub fn set_owner(&self, id: u32, new_owner: u16) {
        if let Some(object) = self.objects.lock().get_mut(&id) {
            object.owner = new_owner;
        }
    }

    pub fn clear(&self) {
        self.objects.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
