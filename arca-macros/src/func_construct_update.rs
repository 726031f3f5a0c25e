use crate::prelude::*;

struct Input {
    module: Ident,
    fields: Punctuated<Assignment, Token![,]>,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> Result<Self> {
        let module = input.parse()?;
        input.parse::<Token![,]>()?;
        let fields = Punctuated::parse_terminated(input)?;

        Ok(Self { module, fields })
    }
}

struct Assignment {
    ident: Ident,
    value: Expr,
}

impl Parse for Assignment {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let value = input.parse()?;

        Ok(Self { ident, value })
    }
}

pub fn func_construct_update(input: TokenStream) -> Result<TokenStream> {
    let input = parse2::<Input>(input)?;

    Ok(build(&input))
}

fn build(input: &Input) -> TokenStream {
    let krate = krate();
    let module = &input.module;

    let fields = input.fields.iter().map(|Assignment { ident, value }| {
        quote! {
            #ident: #krate::Field::Set(#value)
        }
    });

    quote! {
        #module::TypedUpdate {
            #( #fields, )*
            ..::std::default::Default::default()
        }
    }
}
