//! Filters selecting the stored document of a single entity instance.
//!
//! The identifier value is taken from the entity's own serialized form, so the filter embeds it
//! exactly as the driver stored it. [`IdFilter::to_json`] renders the same filter as shell
//! syntax for diagnostics.

use crate::{
    Entity, Error, Result,
    conventions::{Conventions, UuidFormat},
    meta::{FieldShape, MetadataCache},
};
use mongodb::bson::{self, Bson, Document, doc, spec::BinarySubtype};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Numeric,
    Uuid,
    Text,
}

impl IdKind {
    pub fn of(value: &Bson) -> Self {
        match value {
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
                Self::Numeric
            }
            Bson::Binary(binary)
                if matches!(binary.subtype, BinarySubtype::Uuid | BinarySubtype::UuidOld) =>
            {
                Self::Uuid
            }
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdFilter {
    field: &'static FieldShape,
    value: Bson,
}

impl IdFilter {
    pub fn new(field: &'static FieldShape, value: Bson) -> Self {
        Self { field, value }
    }

    pub fn for_entity<E: Entity>(entity: &E) -> Result<Self> {
        Self::split(entity).map(|(filter, _)| filter)
    }

    /// Builds the filter and hands back the serialized entity it was read from.
    pub(crate) fn split<E: Entity>(entity: &E) -> Result<(Self, Document)> {
        let field = MetadataCache::global().identifier::<E>()?;
        let document = bson::to_document(entity)?;

        let value = match document.get(field.name) {
            None | Some(Bson::Null) => {
                return Err(Error::invalid_argument(
                    "entity",
                    format!(
                        "identifier `{}` of `{}` has no value",
                        field.ident,
                        E::SHAPE.type_name
                    ),
                ));
            }
            Some(value) => value.clone(),
        };

        Ok((Self { field, value }, document))
    }

    pub fn field(&self) -> &'static FieldShape {
        self.field
    }

    pub fn value(&self) -> &Bson {
        &self.value
    }

    pub fn kind(&self) -> IdKind {
        IdKind::of(&self.value)
    }

    pub fn to_document(&self) -> Document {
        let name = self.field.name;

        doc! { name: self.value.clone() }
    }

    /// Renders the filter as shell syntax, e.g. `{"_id":CSUUID("…")}`.
    ///
    /// Fails with a configuration error when a UUID identifier was not stored in `format`; such
    /// a filter would match no document.
    pub fn to_json(&self, format: UuidFormat) -> Result<String> {
        let literal = match (&self.value, self.kind()) {
            (Bson::Binary(binary), IdKind::Uuid) => {
                format!("{}(\"{}\")", format.shell_tag(), format.decode(binary)?)
            }
            (value, IdKind::Numeric) => value.to_string(),
            (Bson::String(text), _) => quote(text),
            (Bson::ObjectId(oid), _) => quote(&oid.to_hex()),
            (value, _) => quote(&value.to_string()),
        };

        Ok(format!("{{{}:{literal}}}", quote(self.field.name)))
    }

    pub(crate) fn describe(&self) -> String {
        self.to_json(Conventions::current().uuid_format)
            .unwrap_or_else(|err| format!("{} ({err})", self.to_document()))
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_owned()).to_string()
}
