use crate::{Entity, Error, Filter, Mongo, Result};
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use mongodb::bson::{Bson, Document, doc};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn to_bson(self) -> Bson {
        match self {
            Self::Asc => Bson::Int32(1),
            Self::Desc => Bson::Int32(-1),
        }
    }
}

/// Filters, sort keys and paging collected by a query before it runs.
pub(crate) struct Selection<'a, E> {
    filters: Vec<Box<dyn Filter<E> + 'a>>,
    sort: Vec<(String, Order)>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<i64>,
}

impl<'a, E: Entity> Selection<'a, E> {
    pub(crate) fn new() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    pub(crate) fn filter(&mut self, filter: impl Filter<E> + 'a) {
        self.filters.push(Box::new(filter));
    }

    pub(crate) fn sort(&mut self, field: &E::Fields, order: Order) {
        let name = field.to_string();

        self.sort.retain(|(existing, _)| *existing != name);
        self.sort.push((name, order));
    }

    /// Every added filter must match; no filter selects the whole collection.
    pub(crate) fn selector(&self) -> Result<Document> {
        let mut documents = self
            .filters
            .iter()
            .map(|filter| filter.to_document())
            .filter(|document| !matches!(document, Ok(document) if document.is_empty()))
            .collect::<Result<Vec<_>>>()?;

        let selector = match documents.len() {
            0 => Document::new(),
            1 => documents.remove(0),
            _ => doc! { "$and": documents },
        };
        trace!(entity = E::SHAPE.type_name, %selector, "built query selector");

        Ok(selector)
    }

    pub(crate) fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|(name, order)| (name.clone(), order.to_bson()))
                .collect(),
        )
    }

    /// `count_documents` takes an unsigned limit; a negative find limit means the same bound
    /// and 0 means none at all.
    pub(crate) fn count_limit(&self) -> Option<u64> {
        self.limit.map(i64::unsigned_abs).filter(|limit| *limit != 0)
    }
}

/// Lazily built query over the collection of `E`. Nothing is sent until a terminal method runs.
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

    /// Narrows the query. Successive filters are combined with `$and`.
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

    pub async fn stream(self) -> Result<BoxStream<'static, Result<E>>> {
        let collection = E::collection(self.mongo.db);

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

        let cursor = find.await?;
        debug!(collection = E::collection_name(), "opened query cursor");

        Ok(cursor.map_err(Error::from).boxed())
    }

    pub async fn to_vec(self) -> Result<Vec<E>> {
        self.stream().await?.try_collect().await
    }

    pub async fn first(self) -> Result<Option<E>> {
        self.limit(1).stream().await?.try_next().await
    }

    pub async fn count(self) -> Result<u64> {
        let collection = E::collection(self.mongo.db);

        let mut count = collection.count_documents(self.selection.selector()?);

        if let Some(skip) = self.selection.skip {
            count = count.skip(skip);
        }

        if let Some(limit) = self.selection.count_limit() {
            count = count.limit(limit);
        }

        let count = count.await?;
        debug!(collection = E::collection_name(), count, "counted query matches");

        Ok(count)
    }
}
