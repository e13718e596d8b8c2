//! Predicates over observed state.
//!
//! A predicate is a pure test over `Option<&S>`: `None` means the fetch came
//! back "not found".  Every predicate except [`ResourceAbsent`] treats `None`
//! (and any missing field) as "not yet", so the poller keeps going.
//! Descriptions end up in timeout and mismatch reports.

use std::collections::BTreeSet;

use crate::crd::table::Table;
use crate::observed::{ConditionStatus, ReplicaState, TableSnapshot, TableState};

pub trait Predicate<S>: Send + Sync {
    fn evaluate(&self, observed: Option<&S>) -> bool;
    fn description(&self) -> String;
}

impl<S, P: Predicate<S> + ?Sized> Predicate<S> for Box<P> {
    fn evaluate(&self, observed: Option<&S>) -> bool {
        (**self).evaluate(observed)
    }
    fn description(&self) -> String {
        (**self).description()
    }
}

/// Combinators available on every predicate.
pub trait PredicateExt<S>: Predicate<S> + Sized {
    fn and<P: Predicate<S>>(self, other: P) -> And<Self, P> {
        And(self, other)
    }
}

impl<S, P: Predicate<S>> PredicateExt<S> for P {}

// ── Composition ───────────────────────────────────────────────────────────────

pub struct And<A, B>(pub A, pub B);

impl<S, A: Predicate<S>, B: Predicate<S>> Predicate<S> for And<A, B> {
    fn evaluate(&self, observed: Option<&S>) -> bool {
        self.0.evaluate(observed) && self.1.evaluate(observed)
    }
    fn description(&self) -> String {
        format!("{} and {}", self.0.description(), self.1.description())
    }
}

/// Conjunction over a runtime-sized list.  An empty list always holds.
pub struct All<S>(pub Vec<Box<dyn Predicate<S>>>);

impl<S> Predicate<S> for All<S> {
    fn evaluate(&self, observed: Option<&S>) -> bool {
        self.0.iter().all(|p| p.evaluate(observed))
    }
    fn description(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|p| p.description()).collect();
        format!("all of [{}]", parts.join("; "))
    }
}

/// Adapter for ad-hoc predicates written as closures.
pub struct FnPredicate<F> {
    description: String,
    f: F,
}

pub fn from_fn<S, F>(description: impl Into<String>, f: F) -> FnPredicate<F>
where
    F: Fn(Option<&S>) -> bool + Send + Sync,
{
    FnPredicate {
        description: description.into(),
        f,
    }
}

impl<S, F> Predicate<S> for FnPredicate<F>
where
    F: Fn(Option<&S>) -> bool + Send + Sync,
{
    fn evaluate(&self, observed: Option<&S>) -> bool {
        (self.f)(observed)
    }
    fn description(&self) -> String {
        self.description.clone()
    }
}

// ── Existence ─────────────────────────────────────────────────────────────────

/// Holds exactly when the fetch reported "not found".
pub struct ResourceAbsent;

impl<S> Predicate<S> for ResourceAbsent {
    fn evaluate(&self, observed: Option<&S>) -> bool {
        observed.is_none()
    }
    fn description(&self) -> String {
        "resource absent".to_string()
    }
}

// ── Managed-table predicates ──────────────────────────────────────────────────

pub struct StatusEquals(pub TableState);

impl Predicate<TableSnapshot> for StatusEquals {
    fn evaluate(&self, observed: Option<&TableSnapshot>) -> bool {
        observed
            .and_then(|t| t.status())
            .is_some_and(|s| s.as_str() == self.0.as_str())
    }
    fn description(&self) -> String {
        format!("status equals {}", self.0)
    }
}

/// Exact set equality on replica region names; order is irrelevant.
pub struct ReplicaRegionSetEquals(pub BTreeSet<String>);

impl ReplicaRegionSetEquals {
    pub fn new<I, R>(regions: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self(regions.into_iter().map(Into::into).collect())
    }
}

impl Predicate<TableSnapshot> for ReplicaRegionSetEquals {
    fn evaluate(&self, observed: Option<&TableSnapshot>) -> bool {
        observed.is_some_and(|t| {
            let actual = t.region_names();
            actual.len() == self.0.len() && self.0.iter().all(|r| actual.contains(r.as_str()))
        })
    }
    fn description(&self) -> String {
        let regions: Vec<&str> = self.0.iter().map(String::as_str).collect();
        format!("replica region set equals {{{}}}", regions.join(", "))
    }
}

pub struct ReplicaStatusEquals {
    pub region: String,
    pub expected: ReplicaState,
}

impl ReplicaStatusEquals {
    pub fn new(region: impl Into<String>, expected: ReplicaState) -> Self {
        Self {
            region: region.into(),
            expected,
        }
    }
}

impl Predicate<TableSnapshot> for ReplicaStatusEquals {
    fn evaluate(&self, observed: Option<&TableSnapshot>) -> bool {
        observed
            .and_then(|t| t.replica(&self.region))
            .and_then(|r| r.status.as_ref())
            .is_some_and(|s| s.as_str() == self.expected.as_str())
    }
    fn description(&self) -> String {
        format!("replica {} has status {}", self.region, self.expected)
    }
}

/// Every replica in `regions` has `status`.  Other replicas are ignored.
pub fn replicas_status_equal(regions: &[&str], status: ReplicaState) -> All<TableSnapshot> {
    All(regions
        .iter()
        .map(|r| {
            Box::new(ReplicaStatusEquals::new(*r, status.clone())) as Box<dyn Predicate<TableSnapshot>>
        })
        .collect())
}

// ── Kubernetes resource predicates ────────────────────────────────────────────

/// The controller has written a status block onto the resource.
pub struct ConsumedByController;

impl Predicate<Table> for ConsumedByController {
    fn evaluate(&self, observed: Option<&Table>) -> bool {
        observed.is_some_and(|t| t.status.is_some())
    }
    fn description(&self) -> String {
        "resource consumed by controller".to_string()
    }
}

/// A condition of the given type is present with status True.
pub struct ConditionPresent(pub String);

impl Predicate<Table> for ConditionPresent {
    fn evaluate(&self, observed: Option<&Table>) -> bool {
        observed
            .and_then(|t| t.status.as_ref())
            .is_some_and(|s| {
                s.conditions.iter().any(|c| {
                    c.type_ == self.0 && ConditionStatus::from(c.status.as_str()) == ConditionStatus::True
                })
            })
    }
    fn description(&self) -> String {
        format!("condition {} is True", self.0)
    }
}
