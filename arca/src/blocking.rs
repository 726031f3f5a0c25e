//! Blocking counterparts of [`Client`](crate::Client), [`Mongo`](crate::Mongo), the entity
//! operations and [`Query`](crate::Query), built on the driver's `sync` API. The operations are
//! methods of [`Mongo`].
//!
//! Operations validate their arguments exactly like the async ones and return the same counts.
//! A blocking client must not be created or used from inside an async runtime.
//!
//! ```ignore
//! use arca::blocking::Client;
//!
//! let client = Client::connect(&Settings::from_env()?)?;
//! let mongo = client.mongo();
//!
//! mongo.insert(&user)?;
//! let deleted = mongo.delete(user::filter! { username: "nikis05" })?;
//! ```

use crate::{
    Entity, Error, Filter, IdFilter, Result, Settings, Update,
    conventions::Conventions,
    ensure_entities, modifications, predicate,
    query::{Order, Selection},
    replacement,
};
use mongodb::{
    options::ClientOptions,
    sync::{Collection, Database},
};
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
pub struct Client {
    client: mongodb::sync::Client,
    database: Database,
    conventions: Conventions,
}

impl Client {
    pub fn connect(settings: &Settings) -> Result<Self> {
        settings.conventions().register()?;

        let client = mongodb::sync::Client::with_uri_str(&settings.uri)?;

        Ok(Self::assemble(client, &settings.database, settings.conventions()))
    }

    pub fn with_options(
        options: ClientOptions,
        database: &str,
        conventions: Conventions,
    ) -> Result<Self> {
        conventions.register()?;

        let client = mongodb::sync::Client::with_options(options)?;

        Ok(Self::assemble(client, database, conventions))
    }

    fn assemble(client: mongodb::sync::Client, database: &str, conventions: Conventions) -> Self {
        let database = client.database(database);
        info!(database = database.name(), "blocking client ready");

        Self {
            client,
            database,
            conventions,
        }
    }

    pub fn mongo(&self) -> Mongo<'_> {
        Mongo::new(&self.database)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn client(&self) -> &mongodb::sync::Client {
        &self.client
    }

    pub fn conventions(&self) -> Conventions {
        self.conventions
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Mongo<'a> {
    pub db: &'a Database,
}

impl<'a> From<&'a Database> for Mongo<'a> {
    fn from(value: &'a Database) -> Self {
        Self::new(value)
    }
}

fn collection<E: Entity>(db: &Database) -> Collection<E> {
    db.collection(E::collection_name())
}

/// Blocking entity operations. They live on the handle rather than on a trait, so they never
/// clash with the async methods of [`Entity`] when both are in scope.
impl<'a> Mongo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn query<E: Entity>(self) -> Query<'a, E> {
        Query::new(self)
    }

    pub fn count<E: Entity>(self, filter: impl Filter<E>) -> Result<u64> {
        let filter = filter.to_document()?;

        let count = collection::<E>(self.db).count_documents(filter).run()?;
        debug!(collection = E::collection_name(), count, "counted entities");

        Ok(count)
    }

    pub fn exists<E: Entity>(self, filter: impl Filter<E>) -> Result<bool> {
        Ok(self.count::<E>(filter)? > 0)
    }

    pub fn insert<E: Entity>(self, entity: &E) -> Result<()> {
        collection::<E>(self.db).insert_one(entity).run()?;
        debug!(collection = E::collection_name(), "inserted entity");

        Ok(())
    }

    pub fn insert_many<E: Entity>(self, entities: &[E]) -> Result<()> {
        ensure_entities(entities)?;

        let result = collection::<E>(self.db).insert_many(entities).run()?;
        debug!(
            collection = E::collection_name(),
            inserted = result.inserted_ids.len(),
            "inserted entities"
        );

        Ok(())
    }

    pub fn remove<E: Entity>(self, entity: &E) -> Result<u64> {
        let filter = IdFilter::for_entity(entity)?;
        trace!(collection = E::collection_name(), filter = %filter.describe(), "removing entity");

        let result = collection::<E>(self.db)
            .delete_one(filter.to_document())
            .run()?;
        debug!(
            collection = E::collection_name(),
            deleted = result.deleted_count,
            "removed entity"
        );

        Ok(result.deleted_count)
    }

    pub fn delete<E: Entity>(self, filter: impl Filter<E>) -> Result<u64> {
        let filter = predicate(&filter)?;

        let result = collection::<E>(self.db).delete_many(filter).run()?;
        debug!(
            collection = E::collection_name(),
            deleted = result.deleted_count,
            "deleted entities"
        );

        Ok(result.deleted_count)
    }

    pub fn save<E: Entity>(self, entity: &E) -> Result<u64> {
        let (filter, document) = IdFilter::split(entity)?;
        trace!(collection = E::collection_name(), filter = %filter.describe(), "saving entity");

        let result = collection::<E>(self.db)
            .update_one(filter.to_document(), replacement(document))
            .run()?;
        debug!(
            collection = E::collection_name(),
            matched = result.matched_count,
            modified = result.modified_count,
            "saved entity"
        );

        Ok(result.modified_count)
    }

    pub fn update<E: Entity>(self, filter: impl Filter<E>, update: impl Update<E>) -> Result<u64> {
        let filter = predicate(&filter)?;
        let update = modifications(&update)?;

        let result = collection::<E>(self.db)
            .update_many(filter, update)
            .run()?;
        debug!(
            collection = E::collection_name(),
            matched = result.matched_count,
            modified = result.modified_count,
            "updated entities"
        );

        Ok(result.modified_count)
    }
}

/// Blocking form of [`crate::Query`].
pub struct Query<'a, E> {
    mongo: Mongo<'a>,
    selection: Selection<'a, E>,
}

impl<'a, E: Entity> Query<'a, E> {
    pub fn new(mongo: Mongo<'a>) -> Self {
        Self {
            mongo,
            selection: Selection::new(),
        }
    }

    pub fn filter(mut self, filter: impl Filter<E> + 'a) -> Self {
        self.selection.filter(filter);
        self
    }

    pub fn sort(mut self, field: E::Fields, order: Order) -> Self {
        self.selection.sort(&field, order);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.selection.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.selection.limit = Some(limit);
        self
    }

    pub fn iter(self) -> Result<impl Iterator<Item = Result<E>>> {
        let collection = collection::<E>(self.mongo.db);

        let mut find = collection.find(self.selection.selector()?);

        if let Some(sort) = self.selection.sort_document() {
            find = find.sort(sort);
        }

        if let Some(skip) = self.selection.skip {
            find = find.skip(skip);
        }

        if let Some(limit) = self.selection.limit {
            find = find.limit(limit);
        }

        let cursor = find.run()?;

        Ok(cursor.map(|entity| entity.map_err(Error::from)))
    }

    pub fn to_vec(self) -> Result<Vec<E>> {
        self.iter()?.collect()
    }

    pub fn first(self) -> Result<Option<E>> {
        self.limit(1).iter()?.next().transpose()
    }

    pub fn count(self) -> Result<u64> {
        let collection = collection::<E>(self.mongo.db);

        let mut count = collection.count_documents(self.selection.selector()?);

        if let Some(skip) = self.selection.skip {
            count = count.skip(skip);
        }

        if let Some(limit) = self.selection.count_limit() {
            count = count.limit(limit);
        }

        Ok(count.run()?)
    }
}
