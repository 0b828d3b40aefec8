use crate::error::TimetableResult;
use crate::event::Calendar;
use crate::graph::{RelationshipGraph, Role};
use crate::services::TimePeriodService;
use crate::timetable::{Timetable, TimetableKey, TimetableLocation};
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Where an entity inherits timetables from: the entities related to it
/// under `role`. A composite source contributes its own composite timetable,
/// a plain one only its direct timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableSource {
    pub role: Role,
    pub composite: bool,
}

impl TimetableSource {
    pub fn new(role: Role, composite: bool) -> Self {
        Self { role, composite }
    }
}

/// A facet contributing extra timetable sources to an entity.
pub trait CompositeTimetableSource: Send + Sync {
    fn timetable_sources(&self) -> Vec<TimetableSource>;
}

impl CompositeTimetableSource for Vec<TimetableSource> {
    fn timetable_sources(&self) -> Vec<TimetableSource> {
        self.clone()
    }
}

/// The timetables an entity owns, keyed by term and schema.
///
/// Storing a timetable stamps it with its location below the entity, which
/// becomes the suffix of the event UIDs derived from it.
#[derive(Debug, Clone)]
pub struct TimetableDict {
    path: String,
    domain: String,
    timetables: BTreeMap<TimetableKey, Timetable>,
}

impl TimetableDict {
    pub fn new(path: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            domain: domain.into(),
            timetables: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &TimetableKey) -> Option<&Timetable> {
        self.timetables.get(key)
    }

    pub fn get_mut(&mut self, key: &TimetableKey) -> Option<&mut Timetable> {
        self.timetables.get_mut(key)
    }

    pub fn insert(&mut self, key: TimetableKey, mut timetable: Timetable) -> Option<Timetable> {
        timetable.set_location(TimetableLocation {
            path: format!("{}/timetables/{}", self.path, key),
            domain: self.domain.clone(),
        });
        self.timetables.insert(key, timetable)
    }

    pub fn remove(&mut self, key: &TimetableKey) -> Option<Timetable> {
        self.timetables.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TimetableKey> {
        self.timetables.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimetableKey, &Timetable)> {
        self.timetables.iter()
    }

    pub fn len(&self) -> usize {
        self.timetables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timetables.is_empty()
    }
}

/// Anything that owns timetables and takes part in composition: a person,
/// a group, a resource.
pub struct TimetabledEntity {
    path: String,
    domain: String,
    timetables: TimetableDict,
    sources: Vec<TimetableSource>,
    facets: Vec<Box<dyn CompositeTimetableSource>>,
}

impl std::fmt::Debug for TimetabledEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimetabledEntity")
            .field("path", &self.path)
            .field("timetables", &self.timetables)
            .field("sources", &self.sources)
            .field("facets", &self.facets.len())
            .finish()
    }
}

impl TimetabledEntity {
    /// A new entity inheriting the composite timetables of its groups.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_domain(path, "localhost")
    }

    pub fn with_domain(path: impl Into<String>, domain: impl Into<String>) -> Self {
        let path = path.into();
        let domain = domain.into();
        Self {
            timetables: TimetableDict::new(path.clone(), domain.clone()),
            path,
            domain,
            sources: vec![TimetableSource::new(Role::Group, true)],
            facets: Vec::new(),
        }
    }

    /// Replaces the built-in sources.
    pub fn with_sources(mut self, sources: Vec<TimetableSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn add_facet(&mut self, facet: Box<dyn CompositeTimetableSource>) {
        self.facets.push(facet);
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn timetables(&self) -> &TimetableDict {
        &self.timetables
    }

    pub fn timetables_mut(&mut self) -> &mut TimetableDict {
        &mut self.timetables
    }

    /// Built-in sources followed by the ones every facet contributes.
    pub fn timetable_sources(&self) -> Vec<TimetableSource> {
        let mut sources = self.sources.clone();
        for facet in &self.facets {
            sources.extend(facet.timetable_sources());
        }
        sources
    }
}

/// Finds entities by path.
pub trait EntityLookup {
    fn entity(&self, path: &str) -> Option<&TimetabledEntity>;
}

#[derive(Debug, Default)]
pub struct EntityDirectory {
    entities: BTreeMap<String, TimetabledEntity>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: TimetabledEntity) {
        self.entities.insert(entity.path.clone(), entity);
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut TimetabledEntity> {
        self.entities.get_mut(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<TimetabledEntity> {
        self.entities.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityLookup for EntityDirectory {
    fn entity(&self, path: &str) -> Option<&TimetabledEntity> {
        self.entities.get(path)
    }
}

/// Merges an entity's own timetables with the ones it inherits through its
/// relationships.
///
/// Every result is built fresh on each call and owned by the caller.
pub struct CompositeTimetableEngine<'a, G, E> {
    graph: &'a G,
    entities: &'a E,
}

impl<'a, G, E> CompositeTimetableEngine<'a, G, E>
where
    G: RelationshipGraph + Sync,
    E: EntityLookup + Sync,
{
    pub fn new(graph: &'a G, entities: &'a E) -> Self {
        Self { graph, entities }
    }

    /// The merged timetable of `entity` for `key`, or `None` when neither the
    /// entity nor anything it inherits from has one.
    pub fn composite_timetable(&self, entity: &str, key: &TimetableKey) -> TimetableResult<Option<Timetable>> {
        let mut path = Vec::new();
        self.composite_on_path(entity, key, &mut path)
    }

    fn composite_on_path(
        &self,
        entity: &str,
        key: &TimetableKey,
        path: &mut Vec<String>,
    ) -> TimetableResult<Option<Timetable>> {
        if path.iter().any(|visited| visited == entity) {
            warn!(entity, via = ?path, "relationship cycle in composite timetable sources");
            return Ok(None);
        }
        let Some(found) = self.entities.entity(entity) else {
            return Ok(None);
        };

        let mut gathered: Vec<Cow<'a, Timetable>> = Vec::new();
        if let Some(own) = found.timetables().get(key) {
            gathered.push(Cow::Borrowed(own));
        }
        path.push(entity.to_string());
        for source in found.timetable_sources() {
            for related in self.graph.related(entity, &source.role) {
                if source.composite {
                    if let Some(inherited) = self.composite_on_path(&related, key, path)? {
                        gathered.push(Cow::Owned(inherited));
                    }
                } else if let Some(direct) = self.direct_timetable(&related, key) {
                    gathered.push(Cow::Borrowed(direct));
                }
            }
        }
        path.pop();

        let Some(first) = gathered.first() else {
            return Ok(None);
        };
        let mut merged = first.clone_empty();
        for timetable in &gathered {
            merged.update(timetable)?;
        }
        merged.set_location(TimetableLocation {
            path: format!("{}/composite-timetables/{}", found.path(), key),
            domain: found.domain().to_string(),
        });
        debug!(entity, %key, sources = gathered.len(), "composite timetable assembled");
        Ok(Some(merged))
    }

    fn direct_timetable(&self, entity: &str, key: &TimetableKey) -> Option<&'a Timetable> {
        self.entities
            .entity(entity)
            .and_then(|related| related.timetables().get(key))
    }

    /// Every key `entity` has a composite timetable for.
    pub fn list_composite_timetables(&self, entity: &str) -> BTreeSet<TimetableKey> {
        let mut keys = BTreeSet::new();
        let mut path = Vec::new();
        self.collect_keys(entity, &mut keys, &mut path);
        keys
    }

    fn collect_keys(&self, entity: &str, keys: &mut BTreeSet<TimetableKey>, path: &mut Vec<String>) {
        if path.iter().any(|visited| visited == entity) {
            warn!(entity, via = ?path, "relationship cycle in composite timetable sources");
            return;
        }
        let Some(found) = self.entities.entity(entity) else {
            return;
        };
        keys.extend(found.timetables().keys().cloned());
        path.push(entity.to_string());
        for source in found.timetable_sources() {
            for related in self.graph.related(entity, &source.role) {
                if source.composite {
                    self.collect_keys(&related, keys, path);
                } else if let Some(direct) = self.entities.entity(&related) {
                    keys.extend(direct.timetables().keys().cloned());
                }
            }
        }
        path.pop();
    }

    /// The calendar of every composite timetable of `entity`, merged.
    ///
    /// Keys are derived in parallel, each against the term its period id
    /// names.
    pub fn make_calendar(&self, entity: &str, terms: &TimePeriodService) -> TimetableResult<Calendar> {
        let keys: Vec<TimetableKey> = self.list_composite_timetables(entity).into_iter().collect();
        let calendars: Vec<TimetableResult<Calendar>> = keys
            .par_iter()
            .map(|key| {
                let Some(timetable) = self.composite_timetable(entity, key)? else {
                    return Ok(Calendar::new());
                };
                let term = terms.term(&key.period_id)?;
                timetable.create_calendar(term, None, None)
            })
            .collect();

        let mut merged = Calendar::new();
        for calendar in calendars {
            merged.update(calendar?);
        }
        debug!(entity, keys = keys.len(), events = merged.len(), "entity calendar made");
        Ok(merged)
    }
}
