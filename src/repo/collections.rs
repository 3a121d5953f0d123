use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::Collection;
use crate::store::{KeyValueStore, StoreError};

use super::write_with_reclaim;

/// Store key for the collection list
pub(crate) const COLLECTIONS_KEY: &str = "collections";

/// CRUD over named question groupings.
///
/// No cross-validation against the question repository: a collection may
/// keep ids of questions deleted later, and lookups of those ids are soft
/// failures for the consumer.
pub struct CollectionRepository {
    store: Arc<KeyValueStore>,
}

impl CollectionRepository {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get_all(&self) -> Vec<Collection> {
        self.store.get(COLLECTIONS_KEY, Vec::new())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Collection> {
        self.get_all()
            .into_iter()
            .find(|c| c.id.as_deref() == Some(id))
    }

    /// Save a collection and return its id, following the same new/replace/
    /// append contract as the question repository.
    pub fn save(&self, mut collection: Collection) -> Result<String, StoreError> {
        let mut collections = self.get_all();

        let id = match collection.id.clone() {
            None => {
                let id = Uuid::new_v4().to_string();
                collection.id = Some(id.clone());
                collection.created_at = Some(Utc::now());
                collections.push(collection);
                id
            }
            Some(id) => {
                match collections
                    .iter()
                    .position(|c| c.id.as_deref() == Some(id.as_str()))
                {
                    Some(pos) => {
                        collection.updated_at = Some(Utc::now());
                        collections[pos] = collection;
                    }
                    None => collections.push(collection),
                }
                id
            }
        };

        write_with_reclaim(&self.store, COLLECTIONS_KEY, &collections)?;
        debug!(id = %id, total = collections.len(), "Saved collection");
        Ok(id)
    }

    /// Replace the entire collection set (wholesale import)
    pub fn replace_all(&self, collections: &[Collection]) -> Result<(), StoreError> {
        write_with_reclaim(&self.store, COLLECTIONS_KEY, &collections)
    }

    /// Delete a collection. Returns true iff a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.get_all();
        let before = collections.len();
        collections.retain(|c| c.id.as_deref() != Some(id));
        if collections.len() == before {
            return Ok(false);
        }
        write_with_reclaim(&self.store, COLLECTIONS_KEY, &collections)?;
        Ok(true)
    }
}
