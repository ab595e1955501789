use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use salonbook_core::{Entity, OwnerId, Owned, RecordId, Versioned};

use super::query::{Direction, FieldKind, ResolvedQuery, field_text, field_time};
use super::{ListQuery, Page, Record, Repository, RepositoryError, from_json, stale_version, to_json};

/// In-memory owner-isolated repository for tests/dev.
///
/// Search, filter, range and sort semantics mirror [`super::PgRepository`].
#[derive(Debug)]
pub struct InMemoryRepository<R> {
    inner: RwLock<HashMap<(OwnerId, RecordId), R>>,
}

impl<R> InMemoryRepository<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Database("in-memory store lock poisoned".to_string())
}

impl<R: Record> InMemoryRepository<R> {
    fn check_unique(
        map: &HashMap<(OwnerId, RecordId), R>,
        record: &R,
        json: &JsonValue,
    ) -> Result<(), RepositoryError> {
        for fields in R::UNIQUE_FIELDS {
            let key: Vec<Option<String>> = fields.iter().map(|f| json.get(*f).and_then(field_text)).collect();
            if key.iter().any(Option::is_none) {
                continue;
            }
            let clash = map.values().any(|other| {
                other.is_owned_by(record.owner_id())
                    && other.id() != record.id()
                    && to_json(other)
                        .map(|o| fields.iter().map(|f| o.get(*f).and_then(field_text)).collect::<Vec<_>>() == key)
                        .unwrap_or(false)
            });
            if clash {
                return Err(RepositoryError::Conflict(format!(
                    "{} with the same {} already exists",
                    R::RESOURCE,
                    fields.join("+")
                )));
            }
        }
        Ok(())
    }
}

fn matches(json: &JsonValue, q: &ResolvedQuery<'_>, search_fields: &[&str]) -> bool {
    if let Some(term) = q.search {
        let term = term.to_lowercase();
        let hit = search_fields.iter().any(|f| {
            json.get(*f)
                .and_then(field_text)
                .is_some_and(|v| v.to_lowercase().contains(&term))
        });
        if !hit {
            return false;
        }
    }

    for (field, expected) in &q.filters {
        if json.get(*field).and_then(field_text).as_deref() != Some(*expected) {
            return false;
        }
    }

    if let Some((field, kind, range)) = q.range {
        match json.get(field).and_then(|v| field_time(v, kind)) {
            Some(at) if range.contains(at) => {}
            _ => return false,
        }
    }
    true
}

/// Compare two optional sort keys; missing values sort last ascending (as Postgres NULLs do).
fn compare_field(a: Option<&JsonValue>, b: Option<&JsonValue>, kind: FieldKind) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match kind {
            FieldKind::Numeric => {
                let x = a.as_f64().unwrap_or(0.0);
                let y = b.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            FieldKind::Timestamp | FieldKind::Date => field_time(a, kind).cmp(&field_time(b, kind)),
            FieldKind::Text => {
                let x = field_text(a).unwrap_or_default().to_lowercase();
                let y = field_text(b).unwrap_or_default().to_lowercase();
                x.cmp(&y)
            }
        },
    }
}

#[async_trait]
impl<R: Record> Repository<R> for InMemoryRepository<R> {
    async fn list(&self, owner: OwnerId, query: &ListQuery) -> Result<Page<R>, RepositoryError> {
        let resolved = query.resolve::<R>()?;
        let map = self.inner.read().map_err(|_| poisoned())?;

        let mut rows: Vec<(JsonValue, &R)> = Vec::new();
        for ((o, _), record) in map.iter() {
            if *o != owner {
                continue;
            }
            let json = to_json(record)?;
            if matches(&json, &resolved, R::SEARCH_FIELDS) {
                rows.push((json, record));
            }
        }

        rows.sort_by(|(ja, ra), (jb, rb)| {
            let primary = compare_field(ja.get(resolved.sort_field), jb.get(resolved.sort_field), resolved.sort_kind);
            let primary = match resolved.direction {
                Direction::Asc => primary,
                Direction::Desc => primary.reverse(),
            };
            primary.then_with(|| ra.id().cmp(rb.id()))
        });

        let total = rows.len() as u64;
        let p = resolved.pagination;
        let items = rows
            .into_iter()
            .skip(p.offset as usize)
            .take(p.limit as usize)
            .map(|(_, r)| r.clone())
            .collect();
        Ok(Page::new(items, total, p))
    }

    async fn get(&self, owner: OwnerId, id: RecordId) -> Result<Option<R>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(owner, id)).cloned())
    }

    async fn insert(&self, record: R) -> Result<R, RepositoryError> {
        let json = to_json(&record)?;
        // Round-trip so the in-memory store rejects what Postgres would fail to read back.
        let record: R = from_json(json.clone())?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (record.owner_id(), *record.id());
        if map.keys().any(|(_, id)| *id == key.1) {
            return Err(RepositoryError::Conflict(format!("{} {} already exists", R::RESOURCE, key.1)));
        }
        Self::check_unique(&map, &record, &json)?;
        map.insert(key, record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: R) -> Result<R, RepositoryError> {
        let json = to_json(&record)?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (record.owner_id(), *record.id());
        let expected = record.version();
        match map.get(&key) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.version() != expected => return Err(stale_version::<R>(key.1, expected)),
            Some(_) => {}
        }
        Self::check_unique(&map, &record, &json)?;
        record.set_version(expected + 1);
        map.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(&self, owner: OwnerId, id: RecordId) -> Result<bool, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&(owner, id)).is_some())
    }
}
