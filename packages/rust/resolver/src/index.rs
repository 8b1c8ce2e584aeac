//! Read-only lookup structures over a snapshot of known entities.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

use notegraph_shared::KnownEntity;

use crate::similarity::normalize;

/// Lookup view over a flat entity collection: by normalized name, by
/// normalized alias, and by type.
///
/// Name and alias collisions are last-write-wins; each collision is logged
/// and counted in [`EntityIndex::collisions`].
#[derive(Debug, Default)]
pub struct EntityIndex {
    entities: Vec<KnownEntity>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    by_type: HashMap<String, Vec<usize>>,
    collisions: usize,
}

impl EntityIndex {
    /// Build the index from an ordered entity list.
    #[instrument(skip_all, fields(entity_count = entities.len()))]
    pub fn build(entities: Vec<KnownEntity>) -> Self {
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(entities.len());
        let mut by_alias: HashMap<String, usize> = HashMap::new();
        let mut by_type: HashMap<String, Vec<usize>> = HashMap::new();
        let mut collisions = 0;

        for (idx, entity) in entities.iter().enumerate() {
            let key = normalize(&entity.name);
            if let Some(prev) = by_name.insert(key.clone(), idx) {
                collisions += 1;
                warn!(
                    key = %key,
                    replaced = %entities[prev].path,
                    winner = %entity.path,
                    "duplicate entity name, later entry wins"
                );
            }

            for alias in &entity.aliases {
                let alias_key = normalize(alias);
                if let Some(prev) = by_alias.insert(alias_key.clone(), idx) {
                    if prev != idx {
                        collisions += 1;
                        warn!(
                            alias = %alias_key,
                            replaced = %entities[prev].path,
                            winner = %entity.path,
                            "duplicate entity alias, later entry wins"
                        );
                    }
                }
            }

            by_type
                .entry(entity.entity_type.clone())
                .or_default()
                .push(idx);
        }

        debug!(
            names = by_name.len(),
            aliases = by_alias.len(),
            types = by_type.len(),
            collisions,
            "entity index built"
        );

        Self {
            entities,
            by_name,
            by_alias,
            by_type,
            collisions,
        }
    }

    /// Exact lookup by an already-normalized name.
    pub fn by_name(&self, normalized: &str) -> Option<&KnownEntity> {
        self.by_name.get(normalized).map(|&i| &self.entities[i])
    }

    /// Exact lookup by an already-normalized alias.
    pub fn by_alias(&self, normalized: &str) -> Option<&KnownEntity> {
        self.by_alias.get(normalized).map(|&i| &self.entities[i])
    }

    /// Entities of one type, in corpus order.
    pub fn of_type<'a>(&'a self, entity_type: &str) -> impl Iterator<Item = &'a KnownEntity> + 'a {
        self.by_type
            .get(entity_type)
            .into_iter()
            .flatten()
            .map(|&i| &self.entities[i])
    }

    pub fn has_type(&self, entity_type: &str) -> bool {
        self.by_type.get(entity_type).is_some_and(|v| !v.is_empty())
    }

    /// Every entity, in corpus order.
    pub fn entities(&self) -> &[KnownEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of name/alias keys that were overwritten during the build.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
