//! In-Memory Repository Store
//!
//! `InMemoryStore` keeps entities and relationships in hash maps behind a
//! `tokio::sync::RwLock`. It implements the full `MetadataStore` contract,
//! including anchor cascades and monotonic creation timestamps, and backs the
//! handler tests and the demo binary.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

use super::{
    DeleteResult, EntityQuery, EntityUpdate, MetadataStore, RelationshipQuery,
    RelationshipUpdate, SearchMode, StoreError, StoreResult, UpdateMode,
};
use crate::models::{Classification, MetadataElement, PropertyMap, Relationship};

#[derive(Default)]
struct StoreState {
    entities: HashMap<String, MetadataElement>,
    relationships: HashMap<String, Relationship>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Wall-clock time, nudged forward so no two stamps are ever equal
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }
}

/// Embedded repository store
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities
    pub async fn entity_count(&self) -> usize {
        self.state.read().await.entities.len()
    }

    /// Number of stored relationships
    pub async fn relationship_count(&self) -> usize {
        self.state.read().await.relationships.len()
    }
}

fn apply_properties(target: &mut PropertyMap, supplied: PropertyMap, mode: UpdateMode) {
    match mode {
        UpdateMode::Merge => {
            for (key, value) in supplied {
                target.insert(key, value);
            }
        }
        UpdateMode::Replace => *target = supplied,
    }
}

fn apply_classification(element: &mut MetadataElement, classification: Classification, mode: UpdateMode) {
    match element
        .classifications
        .iter_mut()
        .find(|c| c.name == classification.name)
    {
        Some(existing) => {
            apply_properties(&mut existing.properties, classification.properties, mode);
            existing.window = match mode {
                UpdateMode::Merge => existing.window.overlay(&classification.window),
                UpdateMode::Replace => classification.window,
            };
        }
        None => element.classifications.push(classification),
    }
}

fn collect_strings<'a>(value: &'a Value, into: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => into.push(s.as_str()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, into)),
        Value::Object(nested) => nested.values().for_each(|item| collect_strings(item, into)),
        _ => {}
    }
}

/// String values a text search can see
///
/// Strings nested in arrays and maps (`additionalProperties`) count as values
/// of the top-level property that holds them.
fn searchable_values<'a>(properties: &'a PropertyMap, names: &[String]) -> Vec<&'a str> {
    let mut values = Vec::new();
    if names.is_empty() {
        properties
            .values()
            .for_each(|value| collect_strings(value, &mut values));
    } else {
        names
            .iter()
            .filter_map(|name| properties.get(name))
            .for_each(|value| collect_strings(value, &mut values));
    }
    values
}

enum CompiledSearch<'a> {
    Any,
    Pattern(Regex),
    Exact(&'a str),
}

impl<'a> CompiledSearch<'a> {
    fn compile(search: &'a Option<SearchMode>) -> StoreResult<Self> {
        match search {
            None => Ok(Self::Any),
            Some(SearchMode::Exact(value)) => Ok(Self::Exact(value)),
            Some(SearchMode::Pattern(pattern)) => Regex::new(&format!("^(?:{})$", pattern))
                .map(Self::Pattern)
                .map_err(|e| StoreError::invalid_pattern(pattern, e.to_string())),
        }
    }

    fn matches(&self, properties: &PropertyMap, names: &[String]) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => searchable_values(properties, names)
                .iter()
                .any(|v| v == expected),
            Self::Pattern(regex) => searchable_values(properties, names)
                .iter()
                .any(|v| regex.is_match(v)),
        }
    }
}

fn matches_entity(element: &MetadataElement, query: &EntityQuery, search: &CompiledSearch<'_>) -> bool {
    if !query.type_names.is_empty() && !query.type_names.iter().any(|t| t == &element.type_name) {
        return false;
    }
    if let Some(anchor) = &query.anchor_guid {
        if element.anchor_guid.as_deref() != Some(anchor.as_str()) {
            return false;
        }
    }
    let equals_ok = query
        .property_equals
        .iter()
        .all(|(name, value)| element.properties.get(name) == Some(value));
    equals_ok && search.matches(&element.properties, &query.property_names)
}

fn matches_relationship(relationship: &Relationship, query: &RelationshipQuery) -> bool {
    let type_ok = query
        .type_name
        .as_deref()
        .map_or(true, |t| relationship.type_name == t);
    let end1_ok = query
        .end1_guid
        .as_deref()
        .map_or(true, |g| relationship.end1.guid == g);
    let end2_ok = query
        .end2_guid
        .as_deref()
        .map_or(true, |g| relationship.end2.guid == g);
    let any_ok = query
        .any_end_guid
        .as_deref()
        .map_or(true, |g| relationship.touches(g));
    type_ok && end1_ok && end2_ok && any_ok
}

fn page<T>(items: Vec<T>, start_from: usize, page_size: usize) -> Vec<T> {
    let iter = items.into_iter().skip(start_from);
    if page_size == 0 {
        iter.collect()
    } else {
        iter.take(page_size).collect()
    }
}

#[async_trait]
impl MetadataStore for InMemoryStore {
    async fn create_entity(&self, mut element: MetadataElement) -> StoreResult<MetadataElement> {
        let mut state = self.state.write().await;
        if state.entities.contains_key(&element.guid) || state.relationships.contains_key(&element.guid) {
            return Err(StoreError::duplicate_guid(&element.guid));
        }
        let now = state.next_timestamp();
        element.create_time = now;
        element.update_time = now;
        element.version = 1;
        state.entities.insert(element.guid.clone(), element.clone());
        Ok(element)
    }

    async fn get_entity(&self, guid: &str) -> StoreResult<Option<MetadataElement>> {
        Ok(self.state.read().await.entities.get(guid).cloned())
    }

    async fn update_entity(&self, guid: &str, update: EntityUpdate) -> StoreResult<MetadataElement> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let element = state
            .entities
            .get_mut(guid)
            .ok_or_else(|| StoreError::entity_not_found(guid))?;

        apply_properties(&mut element.properties, update.properties, update.mode);
        if let Some(window) = update.window {
            element.window = window;
        }
        if let Some(classification) = update.classification {
            apply_classification(element, classification, UpdateMode::Merge);
        }
        element.updated_by = Some(update.updated_by);
        element.update_time = now;
        element.version += 1;
        Ok(element.clone())
    }

    async fn delete_entity(&self, guid: &str) -> StoreResult<DeleteResult> {
        let mut state = self.state.write().await;
        if !state.entities.contains_key(guid) {
            return Err(StoreError::entity_not_found(guid));
        }

        // Breadth-first walk down the anchor tree
        let mut deleted: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([guid.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for (child_guid, child) in state.entities.iter() {
                if child.anchor_guid.as_deref() == Some(current.as_str()) && !seen.contains(child_guid) {
                    queue.push_back(child_guid.clone());
                }
            }
            deleted.push(current);
        }

        for entity_guid in &deleted {
            state.entities.remove(entity_guid);
        }

        let mut deleted_relationships: Vec<String> = state
            .relationships
            .values()
            .filter(|r| seen.contains(&r.end1.guid) || seen.contains(&r.end2.guid))
            .map(|r| r.guid.clone())
            .collect();
        deleted_relationships.sort();
        for relationship_guid in &deleted_relationships {
            state.relationships.remove(relationship_guid);
        }

        Ok(DeleteResult {
            deleted_entities: deleted,
            deleted_relationships,
        })
    }

    async fn find_entities(&self, query: &EntityQuery) -> StoreResult<Vec<MetadataElement>> {
        let search = CompiledSearch::compile(&query.search)?;
        let state = self.state.read().await;

        let mut matches: Vec<MetadataElement> = state
            .entities
            .values()
            .filter(|e| matches_entity(e, query, &search))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.create_time.cmp(&a.create_time).then_with(|| a.guid.cmp(&b.guid)));

        Ok(page(matches, query.start_from, query.page_size))
    }

    async fn classify_entity(
        &self,
        guid: &str,
        classification: Classification,
        mode: UpdateMode,
    ) -> StoreResult<MetadataElement> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let element = state
            .entities
            .get_mut(guid)
            .ok_or_else(|| StoreError::entity_not_found(guid))?;

        apply_classification(element, classification, mode);
        element.update_time = now;
        element.version += 1;
        Ok(element.clone())
    }

    async fn declassify_entity(&self, guid: &str, name: &str) -> StoreResult<MetadataElement> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let element = state
            .entities
            .get_mut(guid)
            .ok_or_else(|| StoreError::entity_not_found(guid))?;

        let before = element.classifications.len();
        element.classifications.retain(|c| c.name != name);
        if element.classifications.len() == before {
            return Err(StoreError::type_mismatch(guid, name, "unclassified"));
        }
        element.update_time = now;
        element.version += 1;
        Ok(element.clone())
    }

    async fn set_zone_membership(
        &self,
        guid: &str,
        zones: Vec<String>,
    ) -> StoreResult<MetadataElement> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let element = state
            .entities
            .get_mut(guid)
            .ok_or_else(|| StoreError::entity_not_found(guid))?;

        element.zone_membership = zones;
        element.update_time = now;
        element.version += 1;
        Ok(element.clone())
    }

    async fn create_relationship(&self, mut relationship: Relationship) -> StoreResult<Relationship> {
        let mut state = self.state.write().await;
        if state.relationships.contains_key(&relationship.guid)
            || state.entities.contains_key(&relationship.guid)
        {
            return Err(StoreError::duplicate_guid(&relationship.guid));
        }
        for end in [&relationship.end1, &relationship.end2] {
            if !state.entities.contains_key(&end.guid) {
                return Err(StoreError::entity_not_found(&end.guid));
            }
        }
        let now = state.next_timestamp();
        relationship.create_time = now;
        relationship.update_time = now;
        relationship.version = 1;
        state
            .relationships
            .insert(relationship.guid.clone(), relationship.clone());
        Ok(relationship)
    }

    async fn get_relationship(&self, guid: &str) -> StoreResult<Option<Relationship>> {
        Ok(self.state.read().await.relationships.get(guid).cloned())
    }

    async fn update_relationship(
        &self,
        guid: &str,
        update: RelationshipUpdate,
    ) -> StoreResult<Relationship> {
        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let relationship = state
            .relationships
            .get_mut(guid)
            .ok_or_else(|| StoreError::relationship_not_found(guid))?;

        apply_properties(&mut relationship.properties, update.properties, update.mode);
        if let Some(window) = update.window {
            relationship.window = window;
        }
        relationship.updated_by = Some(update.updated_by);
        relationship.update_time = now;
        relationship.version += 1;
        Ok(relationship.clone())
    }

    async fn delete_relationship(&self, guid: &str) -> StoreResult<()> {
        self.state
            .write()
            .await
            .relationships
            .remove(guid)
            .map(|_| ())
            .ok_or_else(|| StoreError::relationship_not_found(guid))
    }

    async fn find_relationships(&self, query: &RelationshipQuery) -> StoreResult<Vec<Relationship>> {
        let state = self.state.read().await;
        let mut matches: Vec<Relationship> = state
            .relationships
            .values()
            .filter(|r| matches_relationship(r, query))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.create_time.cmp(&a.create_time).then_with(|| a.guid.cmp(&b.guid)));
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationshipEnd;
    use serde_json::json;

    fn element(type_name: &str, qualified_name: &str) -> MetadataElement {
        let mut props = PropertyMap::new();
        props.insert("qualifiedName".to_string(), json!(qualified_name));
        MetadataElement::new("type-guid", type_name, props)
    }

    fn link(end1: &str, end2: &str) -> Relationship {
        Relationship::new(
            "rel-type",
            "CollectionMembership",
            RelationshipEnd::new(end1, "Collection", "memberOf"),
            RelationshipEnd::new(end2, "Referenceable", "members"),
            PropertyMap::new(),
        )
    }

    #[test]
    fn test_timestamps_are_strictly_monotonic() {
        let mut state = StoreState::default();
        let stamps: Vec<_> = (0..100).map(|_| state.next_timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_merge_and_replace() {
        let mut target = PropertyMap::new();
        target.insert("A".to_string(), json!(1));
        target.insert("B".to_string(), json!(2));

        let mut supplied = PropertyMap::new();
        supplied.insert("A".to_string(), json!(9));

        let mut merged = target.clone();
        apply_properties(&mut merged, supplied.clone(), UpdateMode::Merge);
        assert_eq!(merged.get("A"), Some(&json!(9)));
        assert_eq!(merged.get("B"), Some(&json!(2)));

        let mut replaced = target;
        apply_properties(&mut replaced, supplied, UpdateMode::Replace);
        assert_eq!(replaced.get("A"), Some(&json!(9)));
        assert!(replaced.get("B").is_none());
    }

    #[test]
    fn test_pattern_search_matches_whole_value() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            store.create_entity(element("Collection", "hr-policies")).await.unwrap();
            store.create_entity(element("Collection", "finance")).await.unwrap();

            let query = EntityQuery::new().with_search(SearchMode::Pattern("hr.*".to_string()));
            let found = store.find_entities(&query).await.unwrap();
            assert_eq!(found.len(), 1);

            let query = EntityQuery::new().with_search(SearchMode::Pattern("policies".to_string()));
            assert!(store.find_entities(&query).await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            let query = EntityQuery::new().with_search(SearchMode::Pattern("([".to_string()));
            assert!(matches!(
                store.find_entities(&query).await,
                Err(StoreError::InvalidPattern { .. })
            ));
        });
    }

    #[tokio::test]
    async fn test_find_orders_newest_first_and_pages() {
        let store = InMemoryStore::new();
        let mut guids = Vec::new();
        for i in 0..5 {
            let stored = store
                .create_entity(element("Collection", &format!("c{}", i)))
                .await
                .unwrap();
            guids.push(stored.guid);
        }

        let all = store.find_entities(&EntityQuery::new()).await.unwrap();
        let order: Vec<&str> = all.iter().map(|e| e.guid.as_str()).collect();
        let expected: Vec<&str> = guids.iter().rev().map(String::as_str).collect();
        assert_eq!(order, expected);

        let paged = store
            .find_entities(&EntityQuery::new().with_paging(1, 2))
            .await
            .unwrap();
        assert_eq!(paged.len(), 2);
        assert_eq!(paged[0].guid, guids[3]);
        assert_eq!(paged[1].guid, guids[2]);
    }

    #[tokio::test]
    async fn test_delete_cascades_through_anchors_and_relationships() {
        let store = InMemoryStore::new();
        let root = store.create_entity(element("Collection", "root")).await.unwrap();

        let mut child = element("Comment", "child");
        child.anchor_guid = Some(root.guid.clone());
        let child = store.create_entity(child).await.unwrap();

        let mut grandchild = element("Comment", "grandchild");
        grandchild.anchor_guid = Some(child.guid.clone());
        let grandchild = store.create_entity(grandchild).await.unwrap();

        let other = store.create_entity(element("Asset", "other")).await.unwrap();
        store.create_relationship(link(&root.guid, &other.guid)).await.unwrap();

        let result = store.delete_entity(&root.guid).await.unwrap();
        assert_eq!(result.deleted_entities[0], root.guid);
        assert_eq!(result.deleted_entities.len(), 3);
        assert!(result.deleted_entities.contains(&grandchild.guid));
        assert_eq!(result.deleted_relationships.len(), 1);

        assert_eq!(store.entity_count().await, 1);
        assert_eq!(store.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn test_pattern_search_reaches_additional_properties() {
        let store = InMemoryStore::new();
        let mut tagged = element("Asset", "a");
        tagged
            .properties
            .insert("additionalProperties".to_string(), json!({"owner": "payroll-team"}));
        store.create_entity(tagged).await.unwrap();
        store.create_entity(element("Asset", "b")).await.unwrap();

        let query = EntityQuery::new().with_search(SearchMode::Pattern("payroll-.*".to_string()));
        let found = store.find_entities(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), Some("a"));

        let query = EntityQuery::new()
            .with_search(SearchMode::Exact("payroll-team".to_string()))
            .with_property_names(vec!["qualifiedName".to_string()]);
        assert!(store.find_entities(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_classification_in_one_write() {
        let store = InMemoryStore::new();
        let e = store.create_entity(element("Asset", "a")).await.unwrap();

        let mut props = PropertyMap::new();
        props.insert("description".to_string(), json!("d"));
        let updated = store
            .update_entity(
                &e.guid,
                EntityUpdate {
                    properties: props,
                    mode: UpdateMode::Merge,
                    window: None,
                    classification: Some(Classification::new("Criticality", PropertyMap::new())),
                    updated_by: "u".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
        assert!(updated.has_classification("Criticality"));
        assert_eq!(updated.properties.get("description"), Some(&json!("d")));
    }

    #[tokio::test]
    async fn test_delete_unknown_entity_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.delete_entity("missing").await,
            Err(StoreError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_relationship_requires_existing_ends() {
        let store = InMemoryStore::new();
        let c = store.create_entity(element("Collection", "c")).await.unwrap();
        assert!(matches!(
            store.create_relationship(link(&c.guid, "ghost")).await,
            Err(StoreError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_classify_merges_into_existing_classification() {
        let store = InMemoryStore::new();
        let e = store.create_entity(element("Asset", "a")).await.unwrap();

        let mut first = PropertyMap::new();
        first.insert("level".to_string(), json!(1));
        first.insert("notes".to_string(), json!("x"));
        store
            .classify_entity(&e.guid, Classification::new("Confidentiality", first), UpdateMode::Merge)
            .await
            .unwrap();

        let mut second = PropertyMap::new();
        second.insert("level".to_string(), json!(3));
        let updated = store
            .classify_entity(&e.guid, Classification::new("Confidentiality", second), UpdateMode::Merge)
            .await
            .unwrap();

        let c = updated.classification("Confidentiality").unwrap();
        assert_eq!(c.properties.get("level"), Some(&json!(3)));
        assert_eq!(c.properties.get("notes"), Some(&json!("x")));
        assert_eq!(updated.version, 3);
    }
}
