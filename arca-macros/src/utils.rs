use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

macro_rules! extract {
    ($val:expr, $pat:pat, $error_message: expr) => {
        let $pat = $val else {
            return Err(Error::new_spanned($val, $error_message));
        };
    };
}

pub fn extract_named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected struct"));
    };

    extract!(
        data_struct.fields,
        Fields::Named(named_fields),
        "expected named fields"
    );

    Ok(named_fields)
}

/// The subset of serde field attributes that changes how a field is stored.
#[derive(Default)]
pub struct SerdeField {
    pub rename: Option<String>,
    pub with: Option<Path>,
    pub skip: bool,
}

pub fn serde_field(attrs: &[Attribute]) -> Result<SerdeField> {
    let mut serde = SerdeField::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde.rename = Some(serialize_name(&meta)?);
            } else if meta.path.is_ident("with") {
                serde.with = Some(meta.value()?.parse::<LitStr>()?.parse()?);
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde.skip = true;
            } else {
                skip_meta(&meta)?;
            }

            Ok(())
        })?;
    }

    Ok(serde)
}

pub fn serde_rename_all(attrs: &[Attribute]) -> Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let span = meta.path.span();
                let name = serialize_name(&meta)?;

                rule = Some(
                    RenameRule::from_name(&name)
                        .ok_or_else(|| Error::new(span, format!("unknown rename rule `{name}`")))?,
                );
            } else {
                skip_meta(&meta)?;
            }

            Ok(())
        })?;
    }

    Ok(rule)
}

/// Reads `key = "..."` or the `serialize` half of `key(serialize = "...", deserialize = "...")`.
fn serialize_name(meta: &ParseNestedMeta) -> Result<String> {
    if meta.input.peek(Token![=]) {
        return Ok(meta.value()?.parse::<LitStr>()?.value());
    }

    let mut name = None;

    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("serialize") {
            name = Some(nested.value()?.parse::<LitStr>()?.value());
        } else {
            skip_meta(&nested)?;
        }

        Ok(())
    })?;

    name.ok_or_else(|| meta.error("expected a serialize name"))
}

fn skip_meta(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.input.parse::<proc_macro2::TokenTree>()?;
    }

    Ok(())
}

#[derive(Clone, Copy)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    pub fn apply(self, field: &str) -> String {
        match self {
            Self::Lower => field.to_lowercase(),
            Self::Upper => field.to_uppercase(),
            Self::Pascal => field.to_upper_camel_case(),
            Self::Camel => field.to_lower_camel_case(),
            Self::Snake => field.to_snake_case(),
            Self::ScreamingSnake => field.to_shouty_snake_case(),
            Self::Kebab => field.to_kebab_case(),
            Self::ScreamingKebab => field.to_shouty_kebab_case(),
        }
    }
}

pub fn build_fields_enum(field_idents: &[Ident], field_lits: &[LitStr]) -> TokenStream {
    let variants = field_idents
        .iter()
        .map(|ident| {
            Ident::new(
                &ident.unraw().to_string().to_upper_camel_case(),
                ident.span(),
            )
        })
        .collect_vec();

    quote! {
        /// Stored names of the entity's fields, for sorting.
        #[derive(
            ::std::fmt::Debug,
            ::std::clone::Clone,
            ::std::marker::Copy,
            ::std::cmp::PartialEq,
            ::std::cmp::Eq,
            ::std::hash::Hash,
        )]
        pub enum Fields {
            #( #variants ),*
        }

        impl Fields {
            pub const fn name(self) -> &'static str {
                match self {
                    #( Self::#variants => #field_lits ),*
                }
            }
        }

        impl ::std::fmt::Display for Fields {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::convert::From<Fields> for ::std::string::String {
            fn from(value: Fields) -> Self {
                ::std::string::ToString::to_string(&value)
            }
        }
    }
}

pub fn krate() -> TokenStream {
    match crate_name("arca") {
        Ok(FoundCrate::Name(name)) => {
            let name = Ident::new(&name, Span::call_site());
            quote! { ::#name }
        }
        Ok(FoundCrate::Itself) | Err(_) => quote! { ::arca },
    }
}

pub fn mongodb() -> TokenStream {
    let krate = krate();

    quote! { #krate::mongodb }
}
