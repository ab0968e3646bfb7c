//! Entities shared by the integration tests.

#![allow(dead_code)]

use modelmap::Entity;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Parent {
    #[modelmap(primary_key)]
    pub pk: i64,
    #[modelmap(relation)]
    pub childs: Vec<Child>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Child {
    #[modelmap(primary_key)]
    pub pk: i64,
    pub parent_pk: Option<i64>,
    #[modelmap(relation)]
    pub parent: Option<Box<Parent>>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct A {
    #[modelmap(primary_key)]
    pub pk: i64,
    #[modelmap(relation)]
    pub b_set: Vec<B>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct B {
    #[modelmap(primary_key)]
    pub pk: i64,
    pub a_pk: Option<i64>,
    #[modelmap(relation)]
    pub a: Option<Box<A>>,
    #[modelmap(relation)]
    pub c_set: Vec<C>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct C {
    #[modelmap(primary_key)]
    pub pk: i64,
    pub b_pk: Option<i64>,
    #[modelmap(relation)]
    pub b: Option<Box<B>>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[modelmap(fields("v_set"))]
pub struct U {
    #[modelmap(primary_key)]
    pub pk: i64,
    #[modelmap(relation)]
    pub v_set: Vec<V>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[modelmap(exclude("u_pk"))]
pub struct V {
    #[modelmap(primary_key)]
    pub pk: i64,
    pub u_pk: Option<i64>,
    #[modelmap(relation)]
    pub u: Option<Box<U>>,
}

/// Parent 1 owning child 1, seen from the parent.
pub fn parent_with_child() -> Parent {
    Parent {
        pk: 1,
        childs: vec![Child {
            pk: 1,
            parent_pk: Some(1),
            parent: None,
        }],
    }
}

/// Child 1 of parent 1, seen from the child.
pub fn child_with_parent() -> Child {
    Child {
        pk: 1,
        parent_pk: Some(1),
        parent: Some(Box::new(Parent {
            pk: 1,
            childs: Vec::new(),
        })),
    }
}

/// A(1) -> B(10) -> C(100), seen from A.
pub fn a_tree() -> A {
    A {
        pk: 1,
        b_set: vec![B {
            pk: 10,
            a_pk: Some(1),
            a: None,
            c_set: vec![C {
                pk: 100,
                b_pk: Some(10),
                b: None,
            }],
        }],
    }
}

/// C(100) -> B(10) -> {A(1), [C(100) -> B(10)]}, seen from C.
pub fn c_tree() -> C {
    let b = B {
        pk: 10,
        a_pk: Some(1),
        a: None,
        c_set: Vec::new(),
    };
    let back = C {
        pk: 100,
        b_pk: Some(10),
        b: Some(Box::new(b.clone())),
    };
    C {
        pk: 100,
        b_pk: Some(10),
        b: Some(Box::new(B {
            a: Some(Box::new(A {
                pk: 1,
                b_set: Vec::new(),
            })),
            c_set: vec![back],
            ..b
        })),
    }
}

/// U(1) with V(1), seen from U.
pub fn u_tree() -> U {
    U {
        pk: 1,
        v_set: vec![V {
            pk: 1,
            u_pk: Some(1),
            u: None,
        }],
    }
}

/// V(1) of U(1), seen from V.
pub fn v_tree() -> V {
    V {
        pk: 1,
        u_pk: Some(1),
        u: Some(Box::new(u_tree())),
    }
}
