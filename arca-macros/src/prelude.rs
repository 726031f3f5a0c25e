pub(crate) use crate::utils::{krate, mongodb};
pub use darling::{FromAttributes, util::Flag};
pub use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
pub use itertools::Itertools;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Fields, FieldsNamed, Ident, LitStr, Path,
    Result, Token, Type,
    ext::IdentExt,
    meta::ParseNestedMeta,
    parse::{Parse, ParseStream},
    parse_quote, parse2,
    punctuated::Punctuated,
    spanned::Spanned,
};
