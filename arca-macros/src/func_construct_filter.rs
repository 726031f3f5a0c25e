use crate::prelude::*;

const OPERATORS: [&str; 8] = ["Eq", "Ne", "Gt", "Gte", "Lt", "Lte", "In", "Nin"];

struct Input {
    module: Ident,
    fields: Punctuated<Condition, Token![,]>,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> Result<Self> {
        let module = input.parse()?;
        input.parse::<Token![,]>()?;
        let fields = Punctuated::parse_terminated(input)?;

        Ok(Self { module, fields })
    }
}

/// `field: value` or `field: Operator(operand)`.
struct Condition {
    ident: Ident,
    operator: Ident,
    operand: Expr,
}

impl Parse for Condition {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident = input.parse()?;
        input.parse::<Token![:]>()?;

        let operator_or_value = input.parse::<Expr>()?;

        if let Expr::Call(expr_call) = &operator_or_value {
            if let Expr::Path(expr_path) = expr_call.func.as_ref() {
                if let Some(operator) = expr_path.path.get_ident() {
                    if OPERATORS.iter().any(|known| operator == known) && expr_call.args.len() == 1 {
                        return Ok(Self {
                            ident,
                            operator: operator.clone(),
                            operand: expr_call.args[0].clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            ident,
            operator: parse_quote! { Eq },
            operand: operator_or_value,
        })
    }
}

pub fn func_construct_filter(input: TokenStream) -> Result<TokenStream> {
    let input = parse2::<Input>(input)?;

    Ok(build(&input))
}

fn build(input: &Input) -> TokenStream {
    let krate = krate();
    let module = &input.module;

    let fields = input.fields.iter().map(|condition| {
        let Condition {
            ident,
            operator,
            operand,
        } = condition;

        quote! {
            #ident: #krate::Field::Set(#krate::FilterOperator::#operator(#operand))
        }
    });

    quote! {
        #module::TypedFilter {
            #( #fields, )*
            ..::std::default::Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_values_compare_for_equality() {
        let condition = parse2::<Condition>(quote! { name: "Kit" }).unwrap();

        assert_eq!(condition.ident, "name");
        assert_eq!(condition.operator, "Eq");
    }

    #[test]
    fn operators_are_recognized() {
        let condition = parse2::<Condition>(quote! { age: Gte(&18) }).unwrap();

        assert_eq!(condition.operator, "Gte");
        assert!(matches!(condition.operand, Expr::Reference(_)));
    }

    #[test]
    fn unknown_calls_are_values() {
        let condition = parse2::<Condition>(quote! { name: lookup(&key) }).unwrap();

        assert_eq!(condition.operator, "Eq");
        assert!(matches!(condition.operand, Expr::Call(_)));
    }
}
