//! [`DocumentStore`] backed by an embedded `sled` database.
//!
//! ## Layout
//!
//! ```text
//! docs/<collection>     key: u64 big-endian (sled generate_id)   value: JSON document
//! unique/<collection>   key: <field> 0x00 <JSON value>          value: document key
//! ```
//!
//! Document keys come from `generate_id`, so iterating a collection tree yields documents in
//! insertion order. Inserts and updates touch both trees inside one sled transaction, which is
//! what makes unique indexes hold under concurrent writers.

use crate::document::{get_path, Document};
use crate::error::{StoreError, StoreResult};
use crate::pipeline::Pipeline;
use crate::query::{Filter, FindQuery, Update};
use crate::{Connectivity, DocumentStore, ID_FIELD};
use serde_json::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::Transactional;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const DOCS_TREE_PREFIX: &str = "docs/";
const UNIQUE_TREE_PREFIX: &str = "unique/";

pub struct SledStore {
    handle: RwLock<Option<sled::Db>>,
    unique_fields: RwLock<HashMap<String, Vec<String>>>,
    location: Option<PathBuf>,
}

impl SledStore {
    /// Opens (creating if needed) the database rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sled`] if the directory cannot be created or is locked by another
    /// process.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        tracing::debug!("opened sled store at {}", path.display());
        Ok(Self::from_db(db, Some(path.to_path_buf())))
    }

    /// Opens a throwaway database that is deleted when the store is dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db, None))
    }

    fn from_db(db: sled::Db, location: Option<PathBuf>) -> Self {
        Self {
            handle: RwLock::new(Some(db)),
            unique_fields: RwLock::new(HashMap::new()),
            location,
        }
    }

    /// Directory backing this store, `None` for temporary stores.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn db(&self) -> StoreResult<sled::Db> {
        self.handle
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone()
            .ok_or(StoreError::Unavailable)
    }

    fn unique_fields(&self, collection: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .unique_fields
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn load_all(db: &sled::Db, collection: &str) -> StoreResult<Vec<Document>> {
        let tree = docs_tree(db, collection)?;
        let mut documents = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            documents.push(decode(&bytes)?);
        }
        Ok(documents)
    }
}

impl DocumentStore for SledStore {
    fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        if self.unique_fields(collection)?.iter().any(|f| f == field) {
            return Ok(());
        }

        let db = self.db()?;
        let docs = docs_tree(&db, collection)?;
        let index = unique_tree(&db, collection)?;

        for entry in docs.iter() {
            let (key, bytes) = entry?;
            let document = decode(&bytes)?;
            let Some(value) = indexed_value(&document, field) else {
                continue;
            };
            let index_key = unique_key(field, value);
            match index.get(&index_key)? {
                Some(existing) if existing != key => {
                    return Err(duplicate(collection, field, value));
                }
                Some(_) => {}
                None => {
                    index.insert(index_key, key)?;
                }
            }
        }

        let mut registry = self
            .unique_fields
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        let fields = registry.entry(collection.to_string()).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        tracing::debug!("unique index ready on {collection}.{field}");
        Ok(())
    }

    fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<Document> {
        let db = self.db()?;
        let docs = docs_tree(&db, collection)?;
        let index = unique_tree(&db, collection)?;

        document.insert(
            ID_FIELD.to_string(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
        let key = db.generate_id()?.to_be_bytes();
        let bytes = encode(&document)?;

        let fields = self.unique_fields(collection)?;
        let entries: Vec<(&str, &Value, Vec<u8>)> = fields
            .iter()
            .filter_map(|field| {
                indexed_value(&document, field).map(|v| (field.as_str(), v, unique_key(field, v)))
            })
            .collect();

        let result: TransactionResult<(), StoreError> =
            (&docs, &index).transaction(|(tx_docs, tx_index)| {
                for (field, value, index_key) in &entries {
                    if tx_index.get(index_key.as_slice())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(duplicate(
                            collection, field, value,
                        )));
                    }
                    tx_index.insert(index_key.as_slice(), &key[..])?;
                }
                tx_docs.insert(&key[..], bytes.as_slice())?;
                Ok(())
            });
        from_transaction(result)?;

        Ok(document)
    }

    fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let db = self.db()?;
        let tree = docs_tree(&db, collection)?;

        // Without a sort the first `limit` matches in insertion order are final.
        let early_stop = match (&query.sort, query.limit) {
            (None, Some(limit)) => Some(limit),
            _ => None,
        };

        let mut matched = Vec::new();
        for entry in tree.iter() {
            if early_stop.is_some_and(|limit| matched.len() >= limit) {
                break;
            }
            let (_, bytes) = entry?;
            let document = decode(&bytes)?;
            if query.filter.matches(&document) {
                matched.push(document);
            }
        }
        Ok(query.finish(matched))
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<Option<Document>> {
        let db = self.db()?;
        let docs = docs_tree(&db, collection)?;
        let index = unique_tree(&db, collection)?;

        let mut target = None;
        for entry in docs.iter() {
            let (key, bytes) = entry?;
            if filter.matches(&decode(&bytes)?) {
                target = Some(key);
                break;
            }
        }
        let Some(key) = target else {
            return Ok(None);
        };

        let fields = self.unique_fields(collection)?;

        let result: TransactionResult<Option<Document>, StoreError> =
            (&docs, &index).transaction(|(tx_docs, tx_index)| {
                let Some(bytes) = tx_docs.get(&key)? else {
                    return Ok(None);
                };
                let before = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
                // Re-checked: the document may have changed since the scan above.
                if !filter.matches(&before) {
                    return Ok(None);
                }

                let mut after = before.clone();
                update
                    .apply(&mut after)
                    .map_err(ConflictableTransactionError::Abort)?;
                if let Some(id) = before.get(ID_FIELD) {
                    after.insert(ID_FIELD.to_string(), id.clone());
                }

                for field in &fields {
                    let old = indexed_value(&before, field);
                    let new = indexed_value(&after, field);
                    if old == new {
                        continue;
                    }
                    if let Some(new) = new {
                        let new_key = unique_key(field, new);
                        if let Some(existing) = tx_index.get(new_key.as_slice())? {
                            if existing != key {
                                return Err(ConflictableTransactionError::Abort(duplicate(
                                    collection, field, new,
                                )));
                            }
                        }
                        tx_index.insert(new_key, key.clone())?;
                    }
                    if let Some(old) = old {
                        tx_index.remove(unique_key(field, old))?;
                    }
                }

                let bytes = encode(&after).map_err(ConflictableTransactionError::Abort)?;
                tx_docs.insert(key.clone(), bytes)?;
                Ok(Some(after))
            });

        from_transaction(result)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let db = self.db()?;
        let input = Self::load_all(&db, collection)?;
        pipeline.run(input, |from| Self::load_all(&db, from))
    }

    fn ping(&self) -> Connectivity {
        match self.handle.read() {
            Ok(guard) if guard.is_some() => Connectivity::Connected,
            _ => Connectivity::Disconnected,
        }
    }

    fn close(&self) -> StoreResult<()> {
        let db = self
            .handle
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .take();
        if let Some(db) = db {
            let flushed = db.flush()?;
            tracing::info!("document store closed ({flushed} bytes flushed)");
        }
        Ok(())
    }
}

fn docs_tree(db: &sled::Db, collection: &str) -> StoreResult<sled::Tree> {
    Ok(db.open_tree(format!("{DOCS_TREE_PREFIX}{collection}"))?)
}

fn unique_tree(db: &sled::Db, collection: &str) -> StoreResult<sled::Tree> {
    Ok(db.open_tree(format!("{UNIQUE_TREE_PREFIX}{collection}"))?)
}

/// Null and missing values are not indexed, so any number of documents may omit a unique field.
fn indexed_value<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    get_path(document, field).filter(|v| !v.is_null())
}

fn unique_key(field: &str, value: &Value) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 16);
    key.extend_from_slice(field.as_bytes());
    key.push(0);
    key.extend_from_slice(value.to_string().as_bytes());
    key
}

fn duplicate(collection: &str, field: &str, value: &Value) -> StoreError {
    StoreError::DuplicateKey {
        collection: collection.to_string(),
        field: field.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

fn encode(document: &Document) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(document).map_err(StoreError::Serialization)
}

fn decode(bytes: &[u8]) -> StoreResult<Document> {
    serde_json::from_slice(bytes).map_err(StoreError::Deserialization)
}

fn from_transaction<T>(result: TransactionResult<T, StoreError>) -> StoreResult<T> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StoreError::Sled(e),
    })
}
