//! Fuzz target for field resolution.
//!
//! Arbitrary `fields` / `exclude` paths are resolved against a small
//! self-referencing entity type. Resolution must either succeed or fail
//! with an error, and every sub-selection it produces must resolve too.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_selection
//! ```

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modelmap_core::resolver::resolve;
use modelmap_core::{ColumnType, EntityType, Relationship, Selection};

#[derive(Debug, Arbitrary)]
struct Input {
    fields: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

fn node() -> &'static EntityType {
    static NODE: OnceLock<EntityType> = OnceLock::new();
    NODE.get_or_init(|| {
        EntityType::builder("Node")
            .primary_key("pk", ColumnType::Integer)
            .column("label", ColumnType::String)
            .column("created", ColumnType::DateTime)
            .column("shape", ColumnType::Geometry)
            .synonym("title", "label")
            .computed("size", ColumnType::Integer)
            .relationship(Relationship::many_to_one("parent", node))
            .relationship(Relationship::one_to_many("children", node))
            .default_fields(["pk", "children"])
            .default_exclude(["created"])
            .build()
            .expect("valid descriptor")
    })
}

fn walk(selection: &Selection, depth: usize) {
    if depth > 8 {
        return;
    }
    if let Ok(resolved) = resolve(node(), selection) {
        for relationship in &resolved.relationships {
            walk(&relationship.selection, depth + 1);
        }
    }
}

fuzz_target!(|input: Input| {
    let selection = Selection {
        fields: input.fields.map(|f| f.into_iter().collect()),
        exclude: input.exclude.map(|e| e.into_iter().collect()),
    };
    walk(&selection, 0);
});
