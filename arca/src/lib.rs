//! Arca gives every serde entity a typed accessor to its `MongoDB` collection.
//!
//! ## Example
//!
//! ```ignore
//! // Define an entity
//! #[derive(Serialize, Deserialize, Entity)]
//! #[entity(collection = "users")]
//! struct User {
//!   #[serde(rename = "_id", with = "arca::uuid")]
//!   id: Uuid,
//!   email: String,
//!   username: String,
//! }
//!
//! let client = Client::connect(&Settings::from_env()?).await?;
//! let mongo = client.mongo();
//!
//! // Insert an entity into the database
//! let mut user = User {
//!   id: Uuid::new(),
//!   email: "mail@example.com".into(),
//!   username: "nikis05".into(),
//! };
//!
//! user.insert(mongo).await?;
//!
//! // Write the whole entity back, matched by its identifier
//! user.email = "new.email@example.com".into();
//! user.save(mongo).await?;
//!
//! // Update every entity matching a filter
//! User::update(
//!   mongo,
//!   user::filter! { username: "nikis05" },
//!   user::update! { email: "shared@example.com".into() },
//! ).await?;
//!
//! // Query lazily, then materialize
//! let users: Vec<User> = User::query(mongo)
//!   .filter(user::filter! { email: "shared@example.com" })
//!   .sort(user::Fields::Username, Order::Asc)
//!   .to_vec()
//!   .await?;
//!
//! // Remove the document that corresponds to an instance
//! user.remove(mongo).await?;
//!
//! // Delete entities matching the filter
//! User::delete(mongo, user::filter! { username: "nikis05" }).await?;
//! ```
//!
//! Every operation also exists in a blocking form, see [`blocking`].
//!
//! See [`guides`] module to learn more!

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate self as arca;

use futures_util::{FutureExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{self, Bson, Document, doc},
};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Display, marker::PhantomData};
use tracing::{debug, trace};

pub use arca_macros::{Entity, construct_filter, construct_update};
pub use mongodb;

#[cfg(feature = "blocking")]
pub mod blocking;
pub mod client;
pub mod conventions;
mod error;
pub mod guides;
pub mod identifier;
pub mod meta;
pub mod query;

pub use client::{Client, Mongo, Settings};
pub use conventions::{Conventions, DateTimeKind, UuidFormat, naive_datetime, uuid};
pub use error::{Error, Result};
pub use identifier::{IdFilter, IdKind};
pub use meta::{EntityShape, FieldShape, MetadataCache};
pub use query::{Order, Query};

pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    type Fields: Display + Send + Sync + 'static;

    const SHAPE: &'static EntityShape;

    fn collection_name() -> &'static str {
        MetadataCache::global().collection_name::<Self>()
    }

    fn identifier() -> Result<&'static FieldShape> {
        MetadataCache::global().identifier::<Self>()
    }

    fn collection(db: &Database) -> Collection<Self> {
        db.collection(Self::collection_name())
    }

    fn query(mongo: Mongo<'_>) -> Query<'_, Self> {
        Query::new(mongo)
    }

    fn count<'a>(mongo: Mongo<'a>, filter: impl Filter<Self> + 'a) -> BoxFuture<'a, Result<u64>> {
        async move {
            let filter = filter.to_document()?;
            let collection = Self::collection(mongo.db);

            let count = collection.count_documents(filter).await?;
            debug!(collection = Self::collection_name(), count, "counted entities");

            Ok(count)
        }
        .boxed()
    }

    fn exists<'a>(mongo: Mongo<'a>, filter: impl Filter<Self> + 'a) -> BoxFuture<'a, Result<bool>> {
        async move {
            let count = Self::count(mongo, filter).await?;

            Ok(count > 0)
        }
        .boxed()
    }

    fn insert<'a>(&'a self, mongo: Mongo<'a>) -> BoxFuture<'a, Result<()>> {
        async move {
            let collection = Self::collection(mongo.db);

            collection.insert_one(self).await?;
            debug!(collection = Self::collection_name(), "inserted entity");

            Ok(())
        }
        .boxed()
    }

    fn insert_many<'a>(mongo: Mongo<'a>, entities: &'a [Self]) -> BoxFuture<'a, Result<()>> {
        async move {
            ensure_entities(entities)?;
            let collection = Self::collection(mongo.db);

            let result = collection.insert_many(entities).await?;
            debug!(
                collection = Self::collection_name(),
                inserted = result.inserted_ids.len(),
                "inserted entities"
            );

            Ok(())
        }
        .boxed()
    }

    /// Deletes the document stored under this entity's identifier and returns how many
    /// documents were deleted (0 or 1).
    fn remove<'a>(&'a self, mongo: Mongo<'a>) -> BoxFuture<'a, Result<u64>> {
        async move {
            let filter = IdFilter::for_entity(self)?;
            trace!(collection = Self::collection_name(), filter = %filter.describe(), "removing entity");
            let collection = Self::collection(mongo.db);

            let result = collection.delete_one(filter.to_document()).await?;
            debug!(
                collection = Self::collection_name(),
                deleted = result.deleted_count,
                "removed entity"
            );

            Ok(result.deleted_count)
        }
        .boxed()
    }

    fn delete<'a>(mongo: Mongo<'a>, filter: impl Filter<Self> + 'a) -> BoxFuture<'a, Result<u64>> {
        async move {
            let filter = predicate(&filter)?;
            let collection = Self::collection(mongo.db);

            let result = collection.delete_many(filter).await?;
            debug!(
                collection = Self::collection_name(),
                deleted = result.deleted_count,
                "deleted entities"
            );

            Ok(result.deleted_count)
        }
        .boxed()
    }

    /// Overwrites every field of the stored document with this entity's values and returns how
    /// many documents were modified (0 or 1).
    fn save<'a>(&'a self, mongo: Mongo<'a>) -> BoxFuture<'a, Result<u64>> {
        async move {
            let (filter, document) = IdFilter::split(self)?;
            trace!(collection = Self::collection_name(), filter = %filter.describe(), "saving entity");
            let collection = Self::collection(mongo.db);

            let result = collection
                .update_one(filter.to_document(), replacement(document))
                .await?;
            debug!(
                collection = Self::collection_name(),
                matched = result.matched_count,
                modified = result.modified_count,
                "saved entity"
            );

            Ok(result.modified_count)
        }
        .boxed()
    }

    fn update<'a>(
        mongo: Mongo<'a>,
        filter: impl Filter<Self> + 'a,
        update: impl Update<Self> + 'a,
    ) -> BoxFuture<'a, Result<u64>> {
        async move {
            let filter = predicate(&filter)?;
            let update = modifications(&update)?;
            let collection = Self::collection(mongo.db);

            let result = collection.update_many(filter, update).await?;
            debug!(
                collection = Self::collection_name(),
                matched = result.matched_count,
                modified = result.modified_count,
                "updated entities"
            );

            Ok(result.modified_count)
        }
        .boxed()
    }
}

pub(crate) fn ensure_entities<E>(entities: &[E]) -> Result<()> {
    if entities.is_empty() {
        return Err(Error::invalid_argument(
            "entities",
            "at least one entity is required",
        ));
    }

    Ok(())
}

/// Filter document of a bulk operation. An empty filter would select the whole collection and
/// is rejected as a missing predicate.
pub(crate) fn predicate<E>(filter: &impl Filter<E>) -> Result<Document> {
    let document = filter.to_document()?;

    if document.is_empty() {
        return Err(Error::invalid_argument(
            "filter",
            "filter is empty; pass an explicit predicate",
        ));
    }

    Ok(document)
}

pub(crate) fn modifications<E>(update: &impl Update<E>) -> Result<Document> {
    let document = update.to_document()?;

    let sets_nothing = document
        .values()
        .all(|operand| matches!(operand, Bson::Document(fields) if fields.is_empty()));

    if sets_nothing {
        return Err(Error::invalid_argument("update", "update sets no fields"));
    }

    Ok(document)
}

/// `$set` of every stored field; `_id` is immutable and already pinned by the filter.
pub(crate) fn replacement(mut document: Document) -> Document {
    document.remove("_id");

    doc! { "$set": document }
}

pub trait Filter<E>: Send + Sync {
    fn to_document(&self) -> Result<Document>;
}

#[derive(Debug)]
pub struct FilterById<E> {
    value: Bson,
    entity: PhantomData<fn() -> E>,
}

pub fn by_id<E: Entity>(id: impl Into<Bson>) -> FilterById<E> {
    FilterById {
        value: id.into(),
        entity: PhantomData,
    }
}

impl<E: Entity> Filter<E> for FilterById<E> {
    fn to_document(&self) -> Result<Document> {
        let name = E::identifier()?.name;

        Ok(doc! { name: conventions::normalize(self.value.clone()) })
    }
}

#[derive(Debug)]
pub struct UntypedFilter<E>(Document, PhantomData<fn() -> E>);

impl<E> UntypedFilter<E> {
    pub fn new(document: Document) -> Self {
        Self(document, PhantomData)
    }
}

impl<E> Filter<E> for UntypedFilter<E> {
    fn to_document(&self) -> Result<Document> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
pub enum FilterOperator<'a, T: ?Sized> {
    Eq(&'a T),
    Ne(&'a T),
    Gt(&'a T),
    Gte(&'a T),
    Lt(&'a T),
    Lte(&'a T),
    In(&'a [&'a T]),
    Nin(&'a [&'a T]),
}

impl<T: ?Sized> FilterOperator<'_, T> {
    pub fn to_document(&self) -> Result<Document>
    where
        T: Serialize,
    {
        self.to_document_with(bson::to_bson::<T>)
    }

    /// Serializes operands with `serialize`, which is how fields declared with
    /// `#[serde(with = "...")]` are matched in their stored form.
    pub fn to_document_with(
        &self,
        serialize: impl Fn(&T) -> bson::ser::Result<Bson>,
    ) -> Result<Document> {
        let many = |vals: &[&T]| {
            vals.iter()
                .map(|val| serialize(*val))
                .collect::<bson::ser::Result<Vec<_>>>()
                .map(Bson::Array)
        };

        let (operator, value) = match self {
            Self::Eq(val) => ("$eq", serialize(*val)?),
            Self::Ne(val) => ("$ne", serialize(*val)?),
            Self::Gt(val) => ("$gt", serialize(*val)?),
            Self::Gte(val) => ("$gte", serialize(*val)?),
            Self::Lt(val) => ("$lt", serialize(*val)?),
            Self::Lte(val) => ("$lte", serialize(*val)?),
            Self::In(vals) => ("$in", many(*vals)?),
            Self::Nin(vals) => ("$nin", many(*vals)?),
        };

        Ok(doc! { operator: conventions::normalize(value) })
    }
}

/// A complete update document, operators included.
pub trait Update<E>: Send + Sync {
    fn to_document(&self) -> Result<Document>;
}

#[derive(Debug)]
pub struct UntypedUpdate<E>(Document, PhantomData<fn() -> E>);

impl<E> UntypedUpdate<E> {
    pub fn new(document: Document) -> Self {
        Self(document, PhantomData)
    }
}

impl<E> Update<E> for UntypedUpdate<E> {
    fn to_document(&self) -> Result<Document> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
pub enum Field<T> {
    Set(T),
    Omit,
}

impl<T> Field<T> {
    pub fn from_opt(opt: Option<T>) -> Self {
        match opt {
            Some(val) => Self::Set(val),
            None => Self::Omit,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Omit
    }
}

#[cfg(feature = "meta")]
#[doc(hidden)]
#[macro_export]
macro_rules! __register_entity {
    ($entity:ty) => {
        $crate::meta::inventory::submit! {
            $crate::meta::EntityRegistration::new::<$entity>()
        }
    };
}

#[cfg(not(feature = "meta"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __register_entity {
    ($entity:ty) => {};
}
