//! Type-erased iteration over sequence/set/map descriptors.
//!
//! The source used one hand-rolled vtable per container kind; here each
//! container kind gets its own thin wrapper around a boxed `Iterator`
//! instead — there is no shared "erased iterator" interface to hand-roll
//! when the language already has `dyn Iterator`.

use crate::typed_ref::{TypedRef, TypedRefMut};

pub struct SeqIter<'a> {
    inner: Box<dyn Iterator<Item = TypedRef<'a>> + 'a>,
}

impl<'a> SeqIter<'a> {
    pub fn new(inner: impl Iterator<Item = TypedRef<'a>> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<'a> Iterator for SeqIter<'a> {
    type Item = TypedRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct SeqIterMut<'a> {
    inner: Box<dyn Iterator<Item = TypedRefMut<'a>> + 'a>,
}

impl<'a> SeqIterMut<'a> {
    pub fn new(inner: impl Iterator<Item = TypedRefMut<'a>> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<'a> Iterator for SeqIterMut<'a> {
    type Item = TypedRefMut<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct MapIter<'a> {
    inner: Box<dyn Iterator<Item = (TypedRef<'a>, TypedRef<'a>)> + 'a>,
}

impl<'a> MapIter<'a> {
    pub fn new(inner: impl Iterator<Item = (TypedRef<'a>, TypedRef<'a>)> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<'a> Iterator for MapIter<'a> {
    type Item = (TypedRef<'a>, TypedRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct MapIterMut<'a> {
    inner: Box<dyn Iterator<Item = (TypedRef<'a>, TypedRefMut<'a>)> + 'a>,
}

impl<'a> MapIterMut<'a> {
    pub fn new(inner: impl Iterator<Item = (TypedRef<'a>, TypedRefMut<'a>)> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<'a> Iterator for MapIterMut<'a> {
    type Item = (TypedRef<'a>, TypedRefMut<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
