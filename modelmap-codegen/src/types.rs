//! Shapes of relationship fields.

use syn::{GenericArgument, PathArguments, Type};

/// How a relationship field holds its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    /// `Vec<T>`
    List,
    /// `Option<Box<T>>`
    OptionBox,
    /// `Option<T>`
    Option,
    /// `Option<Vec<T>>`, `None` until loaded
    OptionList,
}

impl Holder {
    /// Check if the field holds many entities.
    pub fn is_many(self) -> bool {
        matches!(self, Self::List | Self::OptionList)
    }

    /// Check if the field tracks whether it was loaded.
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::OptionList)
    }
}

/// Split a relationship field type into its holder and target entity type.
pub fn relation_shape(ty: &Type) -> Option<(Holder, Type)> {
    let (outer, inner) = single_argument(ty)?;
    match outer.as_str() {
        "Vec" => Some((Holder::List, inner)),
        "Option" => match single_argument(&inner) {
            Some((boxed, target)) if boxed == "Box" => Some((Holder::OptionBox, target)),
            Some((list, target)) if list == "Vec" => Some((Holder::OptionList, target)),
            _ => Some((Holder::Option, inner)),
        },
        _ => None,
    }
}

/// `Name<Arg>` to `("Name", Arg)`, looking at the last path segment.
fn single_argument(ty: &Type) -> Option<(String, Type)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some((segment.ident.to_string(), inner.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::parse_quote;

    fn shape(ty: Type) -> Option<(Holder, String)> {
        relation_shape(&ty).map(|(holder, target)| (holder, target.to_token_stream().to_string()))
    }

    #[test]
    fn test_list_shape() {
        assert_eq!(shape(parse_quote!(Vec<Child>)), Some((Holder::List, "Child".into())));
    }

    #[test]
    fn test_option_shapes() {
        assert_eq!(
            shape(parse_quote!(Option<Box<Parent>>)),
            Some((Holder::OptionBox, "Parent".into()))
        );
        assert_eq!(
            shape(parse_quote!(std::option::Option<Parent>)),
            Some((Holder::Option, "Parent".into()))
        );
    }

    #[test]
    fn test_lazy_list_shape() {
        let (holder, target) = shape(parse_quote!(Option<Vec<Child>>)).unwrap();
        assert_eq!((holder, target.as_str()), (Holder::OptionList, "Child"));
        assert!(holder.is_many());
        assert!(holder.is_lazy());
        assert!(!Holder::List.is_lazy());
    }

    #[test]
    fn test_plain_types_are_not_relations() {
        assert_eq!(shape(parse_quote!(i64)), None);
        assert_eq!(shape(parse_quote!(Box<Parent>)), None);
        assert_eq!(shape(parse_quote!(HashMap<String, Child>)), None);
    }
}
