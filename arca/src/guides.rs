//! Guides to the library, one module per topic.

/// ## Getting started
///
/// The [`Entity`](crate::Entity) trait maps a Rust type to a `MongoDB` collection and gives
/// it operations to insert, save, update, remove and query its documents.
///
/// A type that derives [`Entity`](crate::Entity) must:
/// - be a struct with named fields
/// - implement [`Serialize`](serde::Serialize) and [`Deserialize`](serde::Deserialize)
/// - have an identifier field (see [`identifiers`](super::identifiers)) when it is saved,
///   removed or looked up by instance
///
/// ```ignore
/// use arca::{Entity, mongodb::bson::Uuid};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Entity)]
/// #[entity(collection = "users")]
/// struct User {
///   #[serde(rename = "_id", with = "arca::uuid")]
///   id: Uuid,
///   name: String,
///   logins: i32,
/// }
/// ```
///
/// Without `#[entity(collection = "...")]` the collection is named exactly like the type
/// (`User`).
///
/// ### Creating `Mongo`
///
/// Every operation takes a [`Mongo`](crate::Mongo), a copyable handle to the database. Get one
/// from a [`Client`](crate::Client):
///
/// ```ignore
/// let client = Client::connect(&Settings::from_env()?).await?;
/// let mongo = client.mongo();
/// ```
///
/// or wrap a database you already have with `Mongo::from(&database)`.
///
/// ### Method overview
///
/// | Method                  | Shell equivalent                                   | Returns           |
/// |-------------------------|----------------------------------------------------|-------------------|
/// | `user.insert(mongo)`    | `db.users.insertOne(user)`                         | `()`              |
/// | `User::insert_many`     | `db.users.insertMany([...])`                       | `()`              |
/// | `user.save(mongo)`      | `db.users.updateOne({ _id }, { $set: user })`      | modified count    |
/// | `User::update`          | `db.users.updateMany(filter, update)`              | modified count    |
/// | `user.remove(mongo)`    | `db.users.deleteOne({ _id })`                      | deleted count     |
/// | `User::delete`          | `db.users.deleteMany(filter)`                      | deleted count     |
/// | `User::count`           | `db.users.countDocuments(filter)`                  | `u64`             |
/// | `User::exists`          | `db.users.countDocuments(filter) > 0`              | `bool`            |
/// | `User::query`           | `db.users.find(filter).sort(..).skip(..).limit(..)`| [`Query`](crate::Query) |
///
/// `update` and `delete` refuse an empty filter, so a forgotten predicate never rewrites or
/// wipes a whole collection.
pub mod getting_started {}

/// ## Identifiers
///
/// `save` and `remove` find the stored document by the entity's identifier field. It is the
/// first match of:
///
/// 1. the field marked `#[entity(id)]`
/// 2. a field named `Id`, then `id`, then `_id`
/// 3. a field stored as `_id`
///
/// An entity with none of these can still be inserted and queried, but `save` and `remove`
/// fail with [`Error::Configuration`](crate::Error::Configuration). Call
/// [`verify_entities`](crate::meta::verify_entities) at startup to catch that early.
///
/// The identifier's value is read from the entity as serialized, so a `None` identifier is
/// rejected as an invalid argument rather than matching nothing.
pub mod identifiers {}

/// ## Conventions
///
/// UUIDs and naive timestamps have more than one stored form. [`Conventions`](crate::Conventions)
/// picks one for the whole process; it is registered by the first client and cannot change
/// afterwards.
///
/// Declare such fields with the adapters:
///
/// ```ignore
/// #[serde(rename = "_id", with = "arca::uuid")]
/// id: Uuid,
/// #[serde(with = "arca::naive_datetime")]
/// created_at: NaiveDateTime,
/// ```
///
/// Typed filters and updates serialize these fields through the same adapters, and UUID
/// values in untyped documents are rewritten into the registered representation.
pub mod conventions {}

/// ## Filters and updates
///
/// Deriving [`Entity`](crate::Entity) generates a helper module named after the struct in
/// snake_case, with `TypedFilter`, `TypedUpdate`, `Fields` and the `filter!` and `update!`
/// macros:
///
/// ```ignore
/// User::update(
///     mongo,
///     user::filter! { name: "Kit", logins: Lt(&3) },
///     user::update! { logins: 3 },
/// ).await?;
/// ```
///
/// A bare value compares for equality; `Ne`, `Gt`, `Gte`, `Lt`, `Lte`, `In` and `Nin` wrap
/// references. Typed updates `$set` the listed fields.
///
/// Anything else goes through [`UntypedFilter`](crate::UntypedFilter) and
/// [`UntypedUpdate`](crate::UntypedUpdate):
///
/// ```ignore
/// User::update(
///     mongo,
///     UntypedFilter::new(doc! { "name": { "$regex": "^K" } }),
///     UntypedUpdate::new(doc! { "$inc": { "logins": 1 } }),
/// ).await?;
/// ```
pub mod filters_and_updates {}

/// ## Queries
///
/// [`Entity::query`](crate::Entity::query) starts a lazy [`Query`](crate::Query). Filters are
/// combined with `$and`; sort keys apply in the order they were added.
///
/// ```ignore
/// let top = User::query(mongo)
///     .filter(user::filter! { logins: Gt(&0) })
///     .sort(user::Fields::Logins, Order::Desc)
///     .limit(10)
///     .to_vec()
///     .await?;
/// ```
pub mod queries {}

/// ## Blocking use
///
/// With the `blocking` feature, [`blocking::Client`](crate::blocking::Client) wraps the
/// driver's synchronous client. Its [`Mongo`](crate::blocking::Mongo) handle carries the same
/// operations as [`Entity`](crate::Entity), called without `.await`:
///
/// ```ignore
/// let mongo = client.mongo();
///
/// mongo.insert(&user)?;
/// let users = mongo.query::<User>().limit(10).to_vec()?;
/// ```
pub mod blocking {}
