//! Implementation of the `#[derive(Entity)]` macro.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

use crate::attrs::{FieldInfo, FieldKind, RelationField, parse_field, parse_struct_attrs};
use crate::types::Holder;

/// Parse and generate code for the `#[derive(Entity)]` macro.
pub fn derive_entity_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Entity derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity derive only supports structs",
            ));
        }
    };

    let attrs = parse_struct_attrs(input)?;
    let model = attrs.name.clone().unwrap_or_else(|| ident.to_string());

    let infos: Vec<FieldInfo> = fields.iter().map(parse_field).collect::<syn::Result<_>>()?;

    let primary_keys = infos
        .iter()
        .filter(|f| matches!(f.kind, FieldKind::Column { primary_key: true }))
        .count();
    if primary_keys != 1 {
        return Err(syn::Error::new_spanned(
            input,
            "Entity must have exactly one field marked with #[modelmap(primary_key)]",
        ));
    }

    check_unique_names(input, &infos, &attrs.computed)?;

    let descriptor = generate_descriptor(&model, &infos, &attrs);
    let get = generate_get(&infos, &attrs.computed);
    let set = generate_set(&model, &infos);
    let relation = generate_relation(&infos);
    let set_relation = generate_set_relation(&model, &infos);
    let is_loaded = generate_is_loaded(&infos);

    Ok(quote! {
        impl ::modelmap::Model for #ident {
            fn descriptor() -> &'static ::modelmap::EntityType {
                static DESCRIPTOR: ::std::sync::OnceLock<::modelmap::EntityType> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    #descriptor
                        .build()
                        .unwrap_or_else(|err| panic!("invalid entity descriptor: {}", err))
                })
            }
        }

        impl ::modelmap::Entity for #ident {
            fn entity_type(&self) -> &'static ::modelmap::EntityType {
                <Self as ::modelmap::Model>::descriptor()
            }

            #get
            #set
            #relation
            #set_relation
            #is_loaded

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    })
}

/// Reject attribute names declared twice, which the descriptor builder
/// would only catch at runtime.
fn check_unique_names(
    input: &DeriveInput,
    infos: &[FieldInfo],
    computed: &[syn::Ident],
) -> syn::Result<()> {
    let mut seen = HashSet::new();
    let names = infos
        .iter()
        .filter(|f| !matches!(f.kind, FieldKind::Skip))
        .flat_map(|f| std::iter::once(f.name.clone()).chain(f.synonyms.iter().cloned()))
        .chain(computed.iter().map(ToString::to_string));

    for name in names {
        if name.is_empty() || name.contains('.') || name.starts_with('+') {
            return Err(syn::Error::new_spanned(
                input,
                format!("'{}' is not a valid attribute name", name),
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(syn::Error::new_spanned(
                input,
                format!("'{}' is declared more than once", name),
            ));
        }
    }
    Ok(())
}

fn generate_descriptor(
    model: &str,
    infos: &[FieldInfo],
    attrs: &crate::attrs::StructAttrs,
) -> TokenStream {
    let mut calls = Vec::new();

    for info in infos {
        let name = &info.name;
        let ty = &info.ty;
        match &info.kind {
            FieldKind::Column { primary_key: true } => calls.push(quote! {
                .primary_key(#name, <#ty as ::modelmap::ColumnValue>::COLUMN_TYPE)
            }),
            FieldKind::Column { primary_key: false } => calls.push(quote! {
                .column(#name, <#ty as ::modelmap::ColumnValue>::COLUMN_TYPE)
            }),
            FieldKind::Relation(RelationField { kind, target, .. }) => {
                let variant = kind.variant();
                calls.push(quote! {
                    .relationship(::modelmap::Relationship::new(
                        #name,
                        ::modelmap::RelationType::#variant,
                        <#target as ::modelmap::Model>::descriptor,
                    ))
                });
            }
            FieldKind::Skip => {}
        }
    }

    for info in infos {
        let target = &info.name;
        for synonym in &info.synonyms {
            calls.push(quote! { .synonym(#synonym, #target) });
        }
    }

    for method in &attrs.computed {
        let name = method.to_string();
        calls.push(quote! {
            .computed(#name, ::modelmap::column_type_of::<Self, _>(Self::#method))
        });
    }

    if !attrs.fields.is_empty() {
        let fields = &attrs.fields;
        calls.push(quote! { .default_fields([#(#fields),*]) });
    }
    if !attrs.exclude.is_empty() {
        let exclude = &attrs.exclude;
        calls.push(quote! { .default_exclude([#(#exclude),*]) });
    }
    if let Some(stringify) = attrs.stringify {
        calls.push(quote! { .stringify(#stringify) });
    }
    if let Some(hook) = &attrs.post_process {
        calls.push(quote! { .post_process(#hook) });
    }

    quote! {
        ::modelmap::EntityType::builder(#model)
            #(#calls)*
            .factory(|| ::std::boxed::Box::new(<Self as ::std::default::Default>::default()))
    }
}

fn generate_get(infos: &[FieldInfo], computed: &[syn::Ident]) -> TokenStream {
    let columns = infos.iter().filter_map(|info| {
        let FieldKind::Column { .. } = info.kind else {
            return None;
        };
        let field = &info.ident;
        let patterns = std::iter::once(&info.name).chain(&info.synonyms);
        Some(quote! {
            #(#patterns)|* => ::std::option::Option::Some(
                ::modelmap::ColumnValue::to_value(&self.#field)
            ),
        })
    });

    let properties = computed.iter().map(|method| {
        let name = LitStr::new(&method.to_string(), method.span());
        quote! {
            #name => ::std::option::Option::Some(
                ::modelmap::ColumnValue::to_value(&self.#method())
            ),
        }
    });

    quote! {
        fn get(&self, name: &str) -> ::std::option::Option<::modelmap::Value> {
            match name {
                #(#columns)*
                #(#properties)*
                _ => ::std::option::Option::None,
            }
        }
    }
}

fn generate_set(model: &str, infos: &[FieldInfo]) -> TokenStream {
    let arms = infos.iter().filter_map(|info| {
        let FieldKind::Column { .. } = info.kind else {
            return None;
        };
        let field = &info.ident;
        let name = &info.name;
        Some(quote! {
            #name => self.#field = ::modelmap::assign_column(#model, name, value)?,
        })
    });

    quote! {
        fn set(&mut self, name: &str, value: ::modelmap::Value) -> ::modelmap::ModelResult<()> {
            match name {
                #(#arms)*
                _ => {
                    return ::std::result::Result::Err(
                        ::modelmap::ModelError::unknown_field(#model, name),
                    );
                }
            }
            ::std::result::Result::Ok(())
        }
    }
}

fn relations(infos: &[FieldInfo]) -> impl Iterator<Item = (&FieldInfo, &RelationField)> {
    infos.iter().filter_map(|info| match &info.kind {
        FieldKind::Relation(relation) => Some((info, relation)),
        _ => None,
    })
}

fn generate_relation(infos: &[FieldInfo]) -> TokenStream {
    let arms = relations(infos).map(|(info, relation)| {
        let field = &info.ident;
        let name = &info.name;
        let view = match relation.holder {
            Holder::List => quote! {
                ::std::option::Option::Some(::modelmap::RelationRef::many(&self.#field))
            },
            Holder::OptionBox => quote! {
                ::std::option::Option::Some(::modelmap::RelationRef::one(self.#field.as_deref()))
            },
            Holder::Option => quote! {
                ::std::option::Option::Some(::modelmap::RelationRef::one(self.#field.as_ref()))
            },
            Holder::OptionList => quote! {
                self.#field.as_ref().map(|items| ::modelmap::RelationRef::many(items))
            },
        };
        quote! { #name => #view, }
    });

    quote! {
        fn relation(&self, name: &str) -> ::std::option::Option<::modelmap::RelationRef<'_>> {
            match name {
                #(#arms)*
                _ => ::std::option::Option::None,
            }
        }
    }
}

/// Only lazy holders can be unloaded; without one the trait default applies.
fn generate_is_loaded(infos: &[FieldInfo]) -> TokenStream {
    let arms: Vec<_> = relations(infos)
        .filter(|(_, relation)| relation.holder.is_lazy())
        .map(|(info, _)| {
            let field = &info.ident;
            let name = &info.name;
            quote! { #name => self.#field.is_some(), }
        })
        .collect();

    if arms.is_empty() {
        return TokenStream::new();
    }

    quote! {
        fn is_loaded(&self, name: &str) -> bool {
            match name {
                #(#arms)*
                _ => true,
            }
        }
    }
}

fn generate_set_relation(model: &str, infos: &[FieldInfo]) -> TokenStream {
    let arms: Vec<_> = relations(infos)
        .map(|(info, relation)| {
            let field = &info.ident;
            let name = &info.name;
            let target = &relation.target;
            let assign = match relation.holder {
                Holder::List => quote! { value.into_many::<#target>(#model, name)? },
                Holder::OptionBox => quote! { value.into_one::<#target>(#model, name)? },
                Holder::Option => quote! {
                    value.into_one::<#target>(#model, name)?.map(|boxed| *boxed)
                },
                Holder::OptionList => quote! {
                    ::std::option::Option::Some(value.into_many::<#target>(#model, name)?)
                },
            };
            quote! { #name => self.#field = #assign, }
        })
        .collect();

    let unknown = quote! {
        ::std::result::Result::Err(::modelmap::ModelError::unknown_relationship(#model, name))
    };

    let body = if arms.is_empty() {
        quote! {
            let _ = value;
            #unknown
        }
    } else {
        quote! {
            match name {
                #(#arms)*
                _ => return #unknown,
            }
            ::std::result::Result::Ok(())
        }
    };

    quote! {
        fn set_relation(
            &mut self,
            name: &str,
            value: ::modelmap::RelationValue,
        ) -> ::modelmap::ModelResult<()> {
            #body
        }
    }
}
