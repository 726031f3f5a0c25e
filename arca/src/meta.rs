//! Entity metadata: the collection an entity type lives in and the field that identifies it.
//!
//! Both facts are discovered from the entity's [`EntityShape`] the first time they are needed
//! and cached per type for the lifetime of the process.

use crate::{Entity, Error, Result};
use dashmap::DashMap;
use std::{any::TypeId, sync::LazyLock};
use tracing::{trace, warn};

/// Field names tried, in order, when no field carries `#[entity(id)]`.
const FALLBACK_IDENTIFIERS: [&str; 3] = ["Id", "id", "_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityShape {
    pub type_name: &'static str,
    /// Explicit collection name from `#[entity(collection = "...")]`.
    pub collection: Option<&'static str>,
    pub fields: &'static [FieldShape],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// Name the field is stored under, after `#[serde(rename = "...")]`.
    pub name: &'static str,
    /// Whether the field carries `#[entity(id)]`.
    pub is_id: bool,
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    collection_names: DashMap<TypeId, &'static str>,
    identifiers: DashMap<TypeId, &'static FieldShape>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static Self {
        static CACHE: LazyLock<MetadataCache> = LazyLock::new(MetadataCache::new);

        &CACHE
    }

    pub fn collection_name<E: Entity>(&self) -> &'static str {
        let key = TypeId::of::<E>();

        if let Some(name) = self.collection_names.get(&key) {
            return *name;
        }

        let name = discover_collection_name(E::SHAPE);
        trace!(entity = E::SHAPE.type_name, collection = name, "resolved collection name");

        self.collection_names.insert(key, name);
        name
    }

    pub fn identifier<E: Entity>(&self) -> Result<&'static FieldShape> {
        let key = TypeId::of::<E>();

        if let Some(field) = self.identifiers.get(&key) {
            return Ok(*field);
        }

        let field = discover_identifier(E::SHAPE)?;
        trace!(entity = E::SHAPE.type_name, field = field.name, "resolved identifier field");

        self.identifiers.insert(key, field);
        Ok(field)
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.identifiers.contains_key(&TypeId::of::<E>())
    }
}

fn discover_collection_name(shape: &'static EntityShape) -> &'static str {
    shape.collection.unwrap_or(shape.type_name)
}

fn discover_identifier(shape: &'static EntityShape) -> Result<&'static FieldShape> {
    let by_ident = move |ident: &str| shape.fields.iter().find(|field| field.ident == ident);

    shape
        .fields
        .iter()
        .find(|field| field.is_id)
        .or_else(|| FALLBACK_IDENTIFIERS.into_iter().find_map(by_ident))
        .or_else(|| shape.fields.iter().find(|field| field.name == "_id"))
        .ok_or_else(|| {
            warn!(entity = shape.type_name, "entity has no identifier field");

            Error::Configuration(format!(
                "`{}` has no identifier field: mark one with `#[entity(id)]` or name it `id`",
                shape.type_name
            ))
        })
}

#[cfg(feature = "meta")]
pub use inventory;

#[cfg(feature = "meta")]
#[doc(hidden)]
pub struct EntityRegistration(pub &'static EntityShape);

#[cfg(feature = "meta")]
impl EntityRegistration {
    pub const fn new<E: Entity>() -> Self {
        Self(E::SHAPE)
    }
}

#[cfg(feature = "meta")]
inventory::collect!(EntityRegistration);

/// Shapes of every entity that derives [`Entity`](crate::Entity) in the final binary.
#[cfg(feature = "meta")]
pub fn registered_entities() -> impl Iterator<Item = &'static EntityShape> {
    inventory::iter::<EntityRegistration>
        .into_iter()
        .map(|registration| registration.0)
}

/// Resolves the identifier of every registered entity, so that a misconfigured entity fails at
/// startup instead of on its first update or delete.
#[cfg(feature = "meta")]
pub fn verify_entities() -> Result<()> {
    let problems = registered_entities()
        .filter_map(|shape| discover_identifier(shape).err())
        .map(|err| err.to_string())
        .collect::<Vec<_>>();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Configuration(problems.join("; ")))
    }
}
