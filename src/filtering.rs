//! Composable filters for narrowing the displayed image set.
//!
//! The filter form builds a predicate from the user's selections (which
//! categories, AND/OR, negated or not) and applies it to every image's
//! category-id collection. Filters compose structurally: a selected-id
//! filter at the leaves, with NOT and binary AND/OR combinators above it.

use std::collections::BTreeSet;

use crate::dataset::Dataset;
use crate::model::{CategoryId, ImageId};

/// How two filter results (or a selected-id set) combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Applies the operator to two booleans.
    #[inline]
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            LogicalOperator::And => a && b,
            LogicalOperator::Or => a || b,
        }
    }
}

/// A boolean predicate over a borrowed item.
pub trait Filter<T: ?Sized> {
    fn evaluate(&self, item: &T) -> bool;
}

/// Matches everything; the neutral element for composition.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneFilter;

impl<T: ?Sized> Filter<T> for NoneFilter {
    fn evaluate(&self, _item: &T) -> bool {
        true
    }
}

/// Negates an inner filter.
#[derive(Clone, Copy, Debug)]
pub struct NotFilter<F> {
    inner: F,
}

impl<F> NotFilter<F> {
    /// Wraps a filter so its result is negated.
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<T: ?Sized, F: Filter<T>> Filter<T> for NotFilter<F> {
    fn evaluate(&self, item: &T) -> bool {
        !self.inner.evaluate(item)
    }
}

/// Joins two filters with a logical operator.
#[derive(Clone, Copy, Debug)]
pub struct ComposedFilter<A, B> {
    a: A,
    b: B,
    operator: LogicalOperator,
}

impl<A, B> ComposedFilter<A, B> {
    /// Combines two filters under the given operator.
    pub fn new(a: A, b: B, operator: LogicalOperator) -> Self {
        Self { a, b, operator }
    }
}

impl<T: ?Sized, A: Filter<T>, B: Filter<T>> Filter<T> for ComposedFilter<A, B> {
    fn evaluate(&self, item: &T) -> bool {
        self.operator.apply(self.a.evaluate(item), self.b.evaluate(item))
    }
}

/// Matches an item's category ids against a selected set.
///
/// An empty selection matches everything. Under `And` every selected id
/// must occur in the item; under `Or` at least one must. Duplicate ids in
/// the item count once.
#[derive(Clone, Debug)]
pub struct CategoryIdFilter {
    ids: BTreeSet<CategoryId>,
    operator: LogicalOperator,
}

impl CategoryIdFilter {
    /// Creates a filter over the selected category ids.
    pub fn new(ids: impl IntoIterator<Item = CategoryId>, operator: LogicalOperator) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            operator,
        }
    }

    /// Replaces the selection.
    pub fn set_ids(&mut self, ids: impl IntoIterator<Item = CategoryId>, operator: LogicalOperator) {
        self.ids = ids.into_iter().collect();
        self.operator = operator;
    }
}

impl Default for CategoryIdFilter {
    fn default() -> Self {
        Self::new([], LogicalOperator::And)
    }
}

impl Filter<[CategoryId]> for CategoryIdFilter {
    fn evaluate(&self, item: &[CategoryId]) -> bool {
        if self.ids.is_empty() {
            return true;
        }

        let unique: BTreeSet<CategoryId> = item.iter().copied().collect();
        let matches = unique.intersection(&self.ids).count();

        match self.operator {
            LogicalOperator::And => matches == self.ids.len(),
            LogicalOperator::Or => matches > 0,
        }
    }
}

/// Applies a filter to every image's resolved category ids and returns the
/// ids of the matching images, in id order.
///
/// Images without annotations evaluate against an empty id collection.
pub fn filter_images<F: Filter<[CategoryId]>>(dataset: &Dataset, filter: &F) -> Vec<ImageId> {
    let mut matching = Vec::new();
    for image in &dataset.images {
        let ids: Vec<CategoryId> = dataset
            .annotations_for(image.id)
            .iter()
            .filter_map(|annotation| annotation.category_id)
            .collect();
        if filter.evaluate(&ids) {
            matching.push(image.id);
        }
    }
    matching.sort();
    matching
}
