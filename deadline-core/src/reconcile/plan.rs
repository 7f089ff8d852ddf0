//! The outcome of a reconciliation pass: remote mutations to apply.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::RemoteEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Insert,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "+"),
            MutationKind::Delete => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    pub event: RemoteEvent,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.event)
    }
}

/// Remote mutations of one pass, inserts ordered before deletes.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub mutations: Vec<Mutation>,
    /// Remote entries left untouched because they match an open deadline.
    pub kept: usize,
    /// Past remote entries with no local counterpart, preserved as history.
    pub history: usize,
    /// Remote entries recognised as created by hand and kept.
    pub manual: usize,
}

impl SyncPlan {
    pub(crate) fn new(inserts: Vec<RemoteEvent>, deletes: Vec<RemoteEvent>) -> Self {
        let mutations = inserts
            .into_iter()
            .map(|event| Mutation {
                kind: MutationKind::Insert,
                event,
            })
            .chain(deletes.into_iter().map(|event| Mutation {
                kind: MutationKind::Delete,
                event,
            }))
            .collect();

        SyncPlan {
            mutations,
            ..SyncPlan::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    fn of_kind(&self, kind: MutationKind) -> impl Iterator<Item = &RemoteEvent> {
        self.mutations
            .iter()
            .filter(move |m| m.kind == kind)
            .map(|m| &m.event)
    }

    pub fn inserts(&self) -> impl Iterator<Item = &RemoteEvent> {
        self.of_kind(MutationKind::Insert)
    }

    pub fn deletes(&self) -> impl Iterator<Item = &RemoteEvent> {
        self.of_kind(MutationKind::Delete)
    }

    /// (inserts, deletes)
    pub fn counts(&self) -> (usize, usize) {
        self.mutations
            .iter()
            .fold((0, 0), |(inserted, deleted), m| match m.kind {
                MutationKind::Insert => (inserted + 1, deleted),
                MutationKind::Delete => (inserted, deleted + 1),
            })
    }
}
