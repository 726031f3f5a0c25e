use crate::{
    prelude::*,
    utils::{RenameRule, build_fields_enum, extract_named_fields, serde_field, serde_rename_all},
};

#[derive(FromAttributes)]
#[darling(attributes(entity))]
struct Attributes {
    collection: Option<String>,
}

#[derive(FromAttributes)]
#[darling(attributes(entity))]
struct FieldAttributes {
    id: Flag,
}

pub fn derive_entity(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "an entity cannot be generic",
        ));
    }

    let attributes = Attributes::from_attributes(&input.attrs)?;
    let rename_all = serde_rename_all(&input.attrs)?;

    let fields_named = extract_named_fields(input.span(), input.data)?;
    let fields_span = fields_named.span();

    let mut fields = vec![];

    for field in fields_named.named {
        let serde = serde_field(&field.attrs)?;
        let field_attributes = FieldAttributes::from_attributes(&field.attrs)?;

        let Some(ident) = field.ident else {
            return Err(Error::new(fields_span, "expected named fields"));
        };

        if serde.skip {
            if field_attributes.id.is_present() {
                return Err(Error::new_spanned(
                    &ident,
                    "the identifier field cannot be skipped",
                ));
            }

            continue;
        }

        let name = stored_name(&ident, serde.rename, rename_all);

        fields.push(FieldConfig {
            name: LitStr::new(&name, ident.span()),
            ident,
            ty: field.ty,
            with: serde.with,
            is_id: field_attributes.id.is_present(),
        });
    }

    if fields.is_empty() {
        return Err(Error::new(fields_span, "an entity needs at least one stored field"));
    }

    if let Some(second) = fields.iter().filter(|field| field.is_id).nth(1) {
        return Err(Error::new_spanned(
            &second.ident,
            "only one field can be marked with `#[entity(id)]`",
        ));
    }

    Ok(build(&input.vis, &input.ident, attributes.collection, &fields))
}

fn stored_name(ident: &Ident, rename: Option<String>, rename_all: Option<RenameRule>) -> String {
    let ident = ident.unraw().to_string();

    rename.unwrap_or_else(|| match rename_all {
        Some(rule) => rule.apply(&ident),
        None => ident,
    })
}

struct FieldConfig {
    ident: Ident,
    ty: Type,
    name: LitStr,
    with: Option<Path>,
    is_id: bool,
}

fn build(
    vis: &syn::Visibility,
    ident: &Ident,
    collection: Option<String>,
    fields: &[FieldConfig],
) -> TokenStream {
    let krate = krate();
    let mongodb = mongodb();

    let mod_ident = Ident::new(
        &ident.unraw().to_string().to_snake_case(),
        Span::call_site(),
    );

    let type_name = LitStr::new(&ident.unraw().to_string(), ident.span());

    let collection = match collection {
        Some(collection) => quote! { ::std::option::Option::Some(#collection) },
        None => quote! { ::std::option::Option::None },
    };

    let field_idents = fields.iter().map(|field| field.ident.clone()).collect_vec();

    let field_lits = fields.iter().map(|field| field.name.clone()).collect_vec();

    let field_ident_lits = fields
        .iter()
        .map(|field| LitStr::new(&field.ident.unraw().to_string(), field.ident.span()))
        .collect_vec();

    let field_is_ids = fields.iter().map(|field| field.is_id);

    let field_types = fields.iter().map(|field| &field.ty).collect_vec();

    let filter_field_types = fields
        .iter()
        .map(|field| -> Type {
            if field.with.is_none() {
                if let Type::Path(type_path) = &field.ty {
                    if type_path.qself.is_none() && type_path.path.is_ident("String") {
                        return parse_quote! { str };
                    }
                }
            }

            field.ty.clone()
        })
        .collect_vec();

    let filter_operands = fields.iter().map(|field| match &field.with {
        Some(path) => quote! {
            #krate::FilterOperator::to_document_with(operator, |value| {
                #path::serialize(value, #mongodb::bson::Serializer::new())
            })?
        },
        None => quote! { #krate::FilterOperator::to_document(operator)? },
    });

    let update_values = fields.iter().map(|field| match &field.with {
        Some(path) => quote! { #path::serialize(value, #mongodb::bson::Serializer::new())? },
        None => quote! { #mongodb::bson::to_bson(value)? },
    });

    let fields_enum = build_fields_enum(&field_idents, &field_lits);

    quote! {
        #vis mod #mod_ident {
            use super::*;

            impl #krate::Entity for #ident {
                type Fields = Fields;

                const SHAPE: &'static #krate::EntityShape = &#krate::EntityShape {
                    type_name: #type_name,
                    collection: #collection,
                    fields: &[
                        #(
                            #krate::FieldShape {
                                ident: #field_ident_lits,
                                name: #field_lits,
                                is_id: #field_is_ids,
                            }
                        ),*
                    ],
                };
            }

            #[derive(::std::fmt::Debug, ::std::default::Default)]
            pub struct TypedFilter<'a> {
                #(
                    pub #field_idents: #krate::Field<#krate::FilterOperator<'a, #filter_field_types>>
                ),*
            }

            impl #krate::Filter<#ident> for TypedFilter<'_> {
                fn to_document(&self) -> #krate::Result<#mongodb::bson::Document> {
                    let mut document = #mongodb::bson::Document::new();

                    #(
                        if let #krate::Field::Set(operator) = &self.#field_idents {
                            document.insert(#field_lits, #filter_operands);
                        }
                    )*

                    ::std::result::Result::Ok(document)
                }
            }

            /// Fields to `$set`; omitted fields keep their stored values.
            #[derive(::std::fmt::Debug, ::std::default::Default)]
            pub struct TypedUpdate {
                #(
                    pub #field_idents: #krate::Field<#field_types>
                ),*
            }

            impl #krate::Update<#ident> for TypedUpdate {
                fn to_document(&self) -> #krate::Result<#mongodb::bson::Document> {
                    let mut fields = #mongodb::bson::Document::new();

                    #(
                        if let #krate::Field::Set(value) = &self.#field_idents {
                            fields.insert(#field_lits, #krate::conventions::normalize(#update_values));
                        }
                    )*

                    ::std::result::Result::Ok(#mongodb::bson::doc! { "$set": fields })
                }
            }

            #fields_enum

            #[allow(unused_macros)]
            macro_rules! filter {
                ($( $input: tt )*) => {
                   #krate::construct_filter!(#mod_ident, $( $input )*)
                };
            }

            #[allow(unused_imports)]
            pub(crate) use filter;

            #[allow(unused_macros)]
            macro_rules! update {
                ($( $input: tt )*) => {
                   #krate::construct_update!(#mod_ident, $( $input )*)
                };
            }

            #[allow(unused_imports)]
            pub(crate) use update;

            #krate::__register_entity!(#ident);
        }
    }
}
