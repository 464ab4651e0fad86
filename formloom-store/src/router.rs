//! The submission router: writes a validated field bag through the sinks.
//!
//! Three persistence domains, written in a fixed order: entity
//! attributes first (create-or-update yields the owner id), then
//! repeatable records, then associations, then explicit removals.
//! There is no rollback — a sink failure is recorded and dependent
//! writes that need the missing id are skipped, nothing more.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, warn};

use formloom_fields::{FieldKind, Scope};
use formloom_validation::{FieldBag, ResolvedField};

use crate::error::SinkError;
use crate::sinks::{
    AssocId, AssociationSink, EntityId, EntitySink, MediaResolver, RecordSink, RowId,
};

/// Reserved record-key prefix for the companion row listing a grouped
/// field's row ids in submission order.
pub const GROUP_INDEX_PREFIX: &str = "_rows:";

/// Reserved record key holding a cross-entity relation written for a
/// belongs-to field.
pub const RELATION_KEY: &str = "_rel:owner";

/// The sinks a save writes through, borrowed from the host.
pub struct Sinks<'a> {
    pub entity: &'a mut dyn EntitySink,
    pub records: &'a mut dyn RecordSink,
    pub associations: &'a mut dyn AssociationSink,
    pub media: &'a mut dyn MediaResolver,
}

/// What a save accomplished. `failures` is non-empty when any sink
/// rejected a write; the rest of the outcome still reflects what *did*
/// get written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOutcome {
    pub entity_id: Option<EntityId>,
    /// Row ids written per `<record kind>:<key>`.
    pub record_rows: IndexMap<String, Vec<RowId>>,
    pub failures: Vec<SinkError>,
}

impl SaveOutcome {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write `bag` through the sinks.
///
/// The owner id is `known_entity_id` when the caller already has one,
/// else whatever the entity create yields, else an id discovered from a
/// belongs-to field. Record and association writes are skipped entirely
/// when no owner id can be established.
pub fn save(bag: &FieldBag, known_entity_id: Option<EntityId>, sinks: &mut Sinks<'_>) -> SaveOutcome {
    let mut outcome = SaveOutcome::default();

    let mut attributes: HashMap<String, Value> = HashMap::new();
    let mut belongs_to: Vec<EntityId> = Vec::new();
    if let Some(entity_fields) = bag.scopes.get(&Scope::Entity) {
        for field in entity_fields.values() {
            if field.descriptor.belongs_to {
                belongs_to.extend(value_ids(&field.value));
            } else {
                attributes.insert(field.descriptor.field.clone(), field.value.clone());
            }
        }
    }

    let mut owner = known_entity_id;
    if !attributes.is_empty() {
        let saved = match owner {
            Some(id) => sinks.entity.update(id, &attributes),
            None => sinks.entity.create(&attributes),
        };
        match saved {
            Ok(id) => owner = Some(id),
            Err(err) => {
                warn!(error = %err, "entity save failed");
                outcome.failures.push(err);
            }
        }
    }
    // A form editing only records/associations of an existing entity
    // names its owner through a belongs-to field.
    if owner.is_none() {
        owner = belongs_to.first().copied();
    }
    outcome.entity_id = owner;

    let Some(owner) = owner else {
        if !bag.scopes.keys().all(|s| matches!(s, Scope::Entity | Scope::Ephemeral)) {
            warn!("no owner id, skipping record and association writes");
        }
        return outcome;
    };

    for owner_of in &belongs_to {
        // Relation rows live under a reserved key so they never collide
        // with user record keys.
        if let Err(err) = sinks
            .records
            .add_row(owner, RELATION_KEY, &Value::from(*owner_of))
        {
            outcome.failures.push(err);
        }
    }

    for (scope, fields) in &bag.scopes {
        match scope {
            Scope::Record { kind } => {
                for field in fields.values() {
                    save_record_field(kind, field, owner, sinks, &mut outcome);
                }
            }
            Scope::Association { kind } => {
                let mut ids: IndexSet<AssocId> = IndexSet::new();
                for field in fields.values() {
                    ids.extend(value_ids(&field.value));
                }
                let ids: Vec<AssocId> = ids.into_iter().collect();
                debug!(kind, count = ids.len(), "replacing association set");
                sinks.associations.set_associations(owner, kind, &ids);
            }
            Scope::Entity | Scope::Ephemeral => {}
        }
    }

    // Removals run last so a field that both sets and removes within one
    // submission ends with the removals applied.
    for (kind, ids) in &bag.removals {
        for id in ids {
            sinks.associations.remove_association(owner, kind, *id);
        }
    }

    outcome
}

fn save_record_field(
    kind: &str,
    field: &ResolvedField,
    owner: EntityId,
    sinks: &mut Sinks<'_>,
    outcome: &mut SaveOutcome,
) {
    let key = record_key(&field.descriptor.field);
    sinks.records.delete_rows(owner, &key);

    let elements: Vec<Value> = match &field.value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    };
    let elements = if matches!(field.descriptor.kind, FieldKind::File) {
        resolve_uploads(elements, sinks.media, outcome)
    } else {
        elements
    };
    let elements: Vec<Value> = elements.into_iter().filter(|v| !v.is_null()).collect();

    if elements.is_empty() {
        // An empty submission clears the key; nothing gets rewritten.
        if field.descriptor.is_grouped_multi() {
            sinks.records.delete_rows(owner, &group_index_key(&key));
        }
        return;
    }

    let mut row_ids = Vec::with_capacity(elements.len());
    for element in &elements {
        match sinks.records.add_row(owner, &key, element) {
            Ok(row_id) => row_ids.push(row_id),
            Err(err) => outcome.failures.push(err),
        }
    }

    if field.descriptor.is_grouped_multi() {
        // Companion index row: grouped ordering survives sinks that do
        // not guarantee row order.
        let index_key = group_index_key(&key);
        sinks.records.delete_rows(owner, &index_key);
        let listing = Value::Array(row_ids.iter().map(|id| Value::from(*id)).collect());
        if let Err(err) = sinks.records.add_row(owner, &index_key, &listing) {
            outcome.failures.push(err);
        }
    }

    outcome.record_rows.insert(format!("{kind}:{key}"), row_ids);
}

/// The storage key for a field: the root of its path.
fn record_key(field: &str) -> String {
    match field.split_once(formloom_path::SEPARATOR) {
        Some((root, _)) => root.to_string(),
        None => field.to_string(),
    }
}

fn group_index_key(key: &str) -> String {
    format!("{GROUP_INDEX_PREFIX}{key}")
}

/// Replace upload descriptors with stored media references, dropping
/// slots whose upload errored or whose store failed.
fn resolve_uploads(
    elements: Vec<Value>,
    media: &mut dyn MediaResolver,
    outcome: &mut SaveOutcome,
) -> Vec<Value> {
    let mut resolved = Vec::with_capacity(elements.len());
    for element in elements {
        // A multi-file row carries its uploads one array level down; a
        // row left with no surviving upload is dropped outright.
        if let Value::Array(inner) = element {
            let kept = resolve_uploads(inner, media, outcome);
            if !kept.is_empty() {
                resolved.push(Value::Array(kept));
            }
            continue;
        }
        let Ok(upload) = serde_json::from_value::<UploadValue>(element.clone()) else {
            // Already a stored reference or something else; keep as-is.
            resolved.push(element);
            continue;
        };
        let upload = upload.into_descriptor();
        if !upload.is_ok() {
            debug!(filename = %upload.filename, code = upload.error_code, "dropping errored upload");
            continue;
        }
        match media.store(&upload) {
            Ok(media_ref) => match serde_json::to_value(&media_ref) {
                Ok(value) => resolved.push(value),
                Err(err) => outcome.failures.push(SinkError::new(err.to_string())),
            },
            Err(err) => {
                warn!(filename = %upload.filename, error = %err, "media store failed");
                outcome.failures.push(err);
            }
        }
    }
    resolved
}

/// Serde mirror of [`crate::sinks::UploadDescriptor`] for values carried
/// through the JSON payload.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct UploadValue {
    filename: String,
    content_type: String,
    tmp_path: String,
    size: u64,
    #[serde(default)]
    error_code: u32,
}

impl UploadValue {
    fn into_descriptor(self) -> crate::sinks::UploadDescriptor {
        crate::sinks::UploadDescriptor {
            filename: self.filename,
            content_type: self.content_type,
            tmp_path: self.tmp_path,
            size: self.size,
            error_code: self.error_code,
        }
    }
}

/// Numeric ids carried in a value: numbers, numeric strings, or arrays
/// of either.
fn value_ids(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(items) => items.iter().flat_map(value_ids).collect(),
        Value::Number(n) => n.as_u64().into_iter().collect(),
        Value::String(s) => s.parse::<u64>().ok().into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MediaRef, UploadDescriptor};
    use formloom_fields::{normalize, FieldSeed, RenderContext, Viewer};
    use serde_json::json;

    #[derive(Default)]
    struct FakeEntities {
        next_id: u64,
        entities: HashMap<EntityId, HashMap<String, Value>>,
        fail: bool,
    }

    impl EntitySink for FakeEntities {
        fn create(&mut self, attributes: &HashMap<String, Value>) -> Result<EntityId, SinkError> {
            if self.fail {
                return Err(SinkError::new("entity sink down"));
            }
            self.next_id += 1;
            self.entities.insert(self.next_id, attributes.clone());
            Ok(self.next_id)
        }

        fn update(
            &mut self,
            id: EntityId,
            attributes: &HashMap<String, Value>,
        ) -> Result<EntityId, SinkError> {
            if self.fail {
                return Err(SinkError::new("entity sink down"));
            }
            self.entities.entry(id).or_default().extend(attributes.clone());
            Ok(id)
        }
    }

    #[derive(Default)]
    struct FakeRecords {
        next_id: u64,
        rows: Vec<(EntityId, String, Value, RowId)>,
    }

    impl RecordSink for FakeRecords {
        fn add_row(&mut self, owner: EntityId, key: &str, value: &Value) -> Result<RowId, SinkError> {
            self.next_id += 1;
            self.rows.push((owner, key.to_string(), value.clone(), self.next_id));
            Ok(self.next_id)
        }

        fn delete_rows(&mut self, owner: EntityId, key: &str) {
            self.rows.retain(|(o, k, _, _)| !(*o == owner && k == key));
        }

        fn list_row_ids(&self, owner: EntityId, key: &str) -> Vec<RowId> {
            self.rows
                .iter()
                .filter(|(o, k, _, _)| *o == owner && k == key)
                .map(|(_, _, _, id)| *id)
                .collect()
        }
    }

    #[derive(Default)]
    struct FakeAssociations {
        sets: HashMap<(EntityId, String), Vec<AssocId>>,
    }

    impl AssociationSink for FakeAssociations {
        fn set_associations(&mut self, owner: EntityId, kind: &str, ids: &[AssocId]) {
            self.sets.insert((owner, kind.to_string()), ids.to_vec());
        }

        fn remove_association(&mut self, owner: EntityId, kind: &str, id: AssocId) {
            if let Some(ids) = self.sets.get_mut(&(owner, kind.to_string())) {
                ids.retain(|existing| *existing != id);
            }
        }
    }

    #[derive(Default)]
    struct FakeMedia {
        next_id: u64,
    }

    impl MediaResolver for FakeMedia {
        fn store(&mut self, upload: &UploadDescriptor) -> Result<MediaRef, SinkError> {
            self.next_id += 1;
            Ok(MediaRef {
                id: self.next_id,
                url: format!("/media/{}/{}", self.next_id, upload.filename),
            })
        }
    }

    #[derive(Default)]
    struct Fakes {
        entities: FakeEntities,
        records: FakeRecords,
        associations: FakeAssociations,
        media: FakeMedia,
    }

    fn bag_of(seeds: Vec<(FieldSeed, Value)>) -> FieldBag {
        let mut ctx = RenderContext::new().with_viewer(Viewer::logged_in());
        let mut bag = FieldBag::default();
        for (seed, value) in seeds {
            let descriptor = normalize(seed, &mut ctx).unwrap();
            bag.scopes
                .entry(descriptor.scope.clone())
                .or_default()
                .insert(descriptor.field.clone(), ResolvedField { descriptor, value });
        }
        bag
    }

    fn run(bag: &FieldBag, known: Option<EntityId>, fakes: &mut Fakes) -> SaveOutcome {
        let mut sinks = Sinks {
            entity: &mut fakes.entities,
            records: &mut fakes.records,
            associations: &mut fakes.associations,
            media: &mut fakes.media,
        };
        save(bag, known, &mut sinks)
    }

    #[test]
    fn test_entity_create_yields_id() {
        let bag = bag_of(vec![(
            FieldSeed::named("title").scope(Scope::Entity),
            json!("hello"),
        )]);
        let mut fake = Fakes::default();
        let outcome = run(&bag, None, &mut fake);
        assert!(outcome.succeeded());
        let id = outcome.entity_id.unwrap();
        assert_eq!(fake.entities.entities[&id]["title"], json!("hello"));
    }

    #[test]
    fn test_known_id_routes_to_update() {
        let bag = bag_of(vec![(
            FieldSeed::named("title").scope(Scope::Entity),
            json!("revised"),
        )]);
        let mut fake = Fakes::default();
        let outcome = run(&bag, Some(42), &mut fake);
        assert_eq!(outcome.entity_id, Some(42));
        assert_eq!(fake.entities.entities[&42]["title"], json!("revised"));
    }

    #[test]
    fn test_entity_failure_skips_dependent_writes() {
        let bag = bag_of(vec![
            (FieldSeed::named("title").scope(Scope::Entity), json!("x")),
            (
                FieldSeed::named("color").scope(Scope::record("meta")),
                json!("red"),
            ),
        ]);
        let mut fake = Fakes::default();
        fake.entities.fail = true;
        let outcome = run(&bag, None, &mut fake);
        assert_eq!(outcome.entity_id, None);
        assert_eq!(outcome.failures.len(), 1);
        assert!(fake.records.rows.is_empty());
    }

    #[test]
    fn test_grouped_field_writes_companion_index() {
        let bag = bag_of(vec![(
            FieldSeed::named("link:0:url")
                .add_more(true)
                .scope(Scope::record("profile")),
            json!([{ "url": "https://a" }, { "url": "https://b" }]),
        )]);
        let mut fake = Fakes::default();
        let outcome = run(&bag, Some(1), &mut fake);
        let rows = &outcome.record_rows["profile:link"];
        assert_eq!(rows.len(), 2);
        let index_rows: Vec<_> = fake
            .records
            .rows
            .iter()
            .filter(|(_, key, _, _)| key == "_rows:link")
            .collect();
        assert_eq!(index_rows.len(), 1);
        let listed = value_ids(&index_rows[0].2);
        assert_eq!(&listed, rows);
    }

    #[test]
    fn test_simple_multi_writes_rows_without_index() {
        let bag = bag_of(vec![(
            FieldSeed::named("color")
                .kind(FieldKind::Checkbox)
                .scope(Scope::record("meta")),
            json!(["red", "blue"]),
        )]);
        let mut fake = Fakes::default();
        run(&bag, Some(1), &mut fake);
        assert_eq!(fake.records.list_row_ids(1, "color").len(), 2);
        assert!(fake.records.list_row_ids(1, "_rows:color").is_empty());
    }

    #[test]
    fn test_empty_value_clears_existing_rows() {
        let mut fake = Fakes::default();
        fake.records.add_row(1, "color", &json!("old")).unwrap();
        let bag = bag_of(vec![(
            FieldSeed::named("color").scope(Scope::record("meta")),
            Value::Null,
        )]);
        run(&bag, Some(1), &mut fake);
        assert!(fake.records.list_row_ids(1, "color").is_empty());
    }

    #[test]
    fn test_associations_deduplicated() {
        let bag = bag_of(vec![(
            FieldSeed::named("tags").scope(Scope::association("topic")),
            json!([5, 5, 7]),
        )]);
        let mut fake = Fakes::default();
        run(&bag, Some(1), &mut fake);
        assert_eq!(fake.associations.sets[&(1, "topic".into())], vec![5, 7]);
    }

    #[test]
    fn test_removals_run_after_set() {
        let mut bag = bag_of(vec![(
            FieldSeed::named("tags").scope(Scope::association("topic")),
            json!([5, 7]),
        )]);
        bag.removals.insert("topic".into(), vec![5]);
        let mut fake = Fakes::default();
        run(&bag, Some(1), &mut fake);
        assert_eq!(fake.associations.sets[&(1, "topic".into())], vec![7]);
    }

    #[test]
    fn test_belongs_to_discovers_owner_and_writes_relation() {
        let mut seed = FieldSeed::named("owner").scope(Scope::Entity);
        seed.belongs_to = Some(true);
        let bag = bag_of(vec![
            (seed, json!(9)),
            (
                FieldSeed::named("color").scope(Scope::record("meta")),
                json!("red"),
            ),
        ]);
        let mut fake = Fakes::default();
        let outcome = run(&bag, None, &mut fake);
        // No attribute fields, so no entity create happens; the
        // belongs-to id becomes the owner.
        assert_eq!(outcome.entity_id, Some(9));
        assert_eq!(fake.records.list_row_ids(9, "color").len(), 1);
        assert_eq!(fake.records.list_row_ids(9, RELATION_KEY).len(), 1);
    }

    #[test]
    fn test_errored_upload_slot_is_dropped() {
        let good = |name: &str| {
            json!({
                "filename": name,
                "content_type": "image/png",
                "tmp_path": format!("/tmp/{name}"),
                "size": 10,
                "error_code": 0
            })
        };
        let mut broken = good("broken.png");
        broken["error_code"] = json!(4);
        let bag = bag_of(vec![(
            FieldSeed::named("photo:0:file")
                .kind(FieldKind::File)
                .add_more(true)
                .scope(Scope::record("gallery")),
            json!([good("a.png"), broken, good("c.png")]),
        )]);
        let mut fake = Fakes::default();
        let outcome = run(&bag, Some(1), &mut fake);
        assert!(outcome.succeeded());
        let rows = &outcome.record_rows["gallery:photo"];
        assert_eq!(rows.len(), 2);
        let listed: Vec<_> = fake
            .records
            .rows
            .iter()
            .filter(|(_, key, _, _)| key == "photo")
            .map(|(_, _, value, _)| value["url"].as_str().unwrap().to_string())
            .collect();
        assert!(listed[0].ends_with("a.png"));
        assert!(listed[1].ends_with("c.png"));
    }
}
