//! Parsing of `#[modelmap(...)]` attributes.

use convert_case::{Case, Casing};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{DeriveInput, Ident, LitBool, LitStr, Path, Token, Type};

use crate::types::{Holder, relation_shape};

/// Struct-level attributes.
#[derive(Default)]
pub struct StructAttrs {
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub exclude: Vec<String>,
    pub stringify: Option<bool>,
    pub post_process: Option<Path>,
    pub computed: Vec<Ident>,
}

/// Relation kinds accepted by `relation = "..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind.to_case(Case::Snake).as_str() {
            "one_to_one" => Some(Self::OneToOne),
            "one_to_many" => Some(Self::OneToMany),
            "many_to_one" => Some(Self::ManyToOne),
            "many_to_many" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    fn is_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    pub fn variant(self) -> Ident {
        let name = match self {
            Self::OneToOne => "OneToOne",
            Self::OneToMany => "OneToMany",
            Self::ManyToOne => "ManyToOne",
            Self::ManyToMany => "ManyToMany",
        };
        Ident::new(name, proc_macro2::Span::call_site())
    }
}

/// A relationship field.
pub struct RelationField {
    pub kind: RelationKind,
    pub holder: Holder,
    pub target: Type,
}

/// What a struct field maps to.
pub enum FieldKind {
    Column { primary_key: bool },
    Relation(RelationField),
    Skip,
}

/// A parsed struct field.
pub struct FieldInfo {
    pub ident: Ident,
    /// Attribute name as seen by the engines.
    pub name: String,
    pub ty: Type,
    pub kind: FieldKind,
    pub synonyms: Vec<String>,
}

/// Parse `#[modelmap(...)]` on the struct.
pub fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<StructAttrs> {
    let mut attrs = StructAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("modelmap") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.name = Some(value.value());
            } else if meta.path.is_ident("fields") {
                attrs.fields.extend(string_list(&meta)?);
            } else if meta.path.is_ident("exclude") {
                attrs.exclude.extend(string_list(&meta)?);
            } else if meta.path.is_ident("stringify") {
                let value: LitBool = meta.value()?.parse()?;
                attrs.stringify = Some(value.value);
            } else if meta.path.is_ident("post_process") {
                attrs.post_process = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("computed") {
                meta.parse_nested_meta(|inner| {
                    let ident = inner
                        .path
                        .get_ident()
                        .ok_or_else(|| inner.error("expected a method name"))?;
                    attrs.computed.push(ident.clone());
                    Ok(())
                })?;
            } else {
                return Err(meta.error("unknown modelmap attribute"));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}

/// Parse a field and its `#[modelmap(...)]` attributes.
pub fn parse_field(field: &syn::Field) -> syn::Result<FieldInfo> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "fields must be named"))?;

    let mut name = ident.unraw().to_string();
    let mut primary_key = false;
    let mut relation: Option<Option<LitStr>> = None;
    let mut skip = false;
    let mut synonyms = Vec::new();

    for attr in &field.attrs {
        if !attr.path().is_ident("modelmap") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                primary_key = true;
            } else if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
            } else if meta.path.is_ident("synonym") {
                let value: LitStr = meta.value()?.parse()?;
                synonyms.push(value.value());
            } else if meta.path.is_ident("relation") {
                relation = Some(if meta.input.peek(Token![=]) {
                    Some(meta.value()?.parse()?)
                } else {
                    None
                });
            } else {
                return Err(meta.error("unknown modelmap field attribute"));
            }
            Ok(())
        })?;
    }

    let kind = if skip {
        FieldKind::Skip
    } else if let Some(kind) = relation {
        if primary_key {
            return Err(syn::Error::new_spanned(
                &ident,
                "a relationship cannot be the primary key",
            ));
        }
        FieldKind::Relation(parse_relation(&field.ty, kind)?)
    } else {
        FieldKind::Column { primary_key }
    };

    if !synonyms.is_empty() && !matches!(kind, FieldKind::Column { .. }) {
        return Err(syn::Error::new_spanned(
            &ident,
            "synonyms can only target columns",
        ));
    }

    Ok(FieldInfo {
        ident,
        name,
        ty: field.ty.clone(),
        kind,
        synonyms,
    })
}

fn parse_relation(ty: &Type, kind: Option<LitStr>) -> syn::Result<RelationField> {
    let (holder, target) = relation_shape(ty).ok_or_else(|| {
        syn::Error::new_spanned(
            ty,
            "relationship fields must be Vec<T>, Option<Vec<T>>, Option<Box<T>> or Option<T>",
        )
    })?;

    let kind = match kind {
        Some(lit) => RelationKind::parse(&lit.value()).ok_or_else(|| {
            syn::Error::new_spanned(
                &lit,
                "expected one_to_one, one_to_many, many_to_one or many_to_many",
            )
        })?,
        None if holder.is_many() => RelationKind::OneToMany,
        None => RelationKind::ManyToOne,
    };

    if kind.is_many() != holder.is_many() {
        let expected = if kind.is_many() { "Vec<T> or Option<Vec<T>>" } else { "Option<Box<T>> or Option<T>" };
        return Err(syn::Error::new_spanned(
            ty,
            format!("this relation kind must be held in {}", expected),
        ));
    }

    Ok(RelationField { kind, holder, target })
}

/// Parse `name("a", "b.c")`.
fn string_list(meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<String>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let items = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
    Ok(items.iter().map(LitStr::value).collect())
}
