//! Per-user undo/redo history of a model.
//!
//! Every mutating operation of a batch becomes one [`ChangeEvent`]: the
//! [`GraphChange`]s it applied, in order. [`UndoManager`] keeps a bounded undo
//! and redo stack per user. Undo applies the inverses of an event's changes
//! in reverse order; redo re-applies them forward.
//!
//! Histories of different users on the same model are independent, so one
//! user's undo can meet a graph that another user changed since. When an
//! inverse no longer applies, the partial work is rolled back and the undo
//! fails with an internal error, leaving graph and stacks unchanged.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_core::{CoreError, GraphChange, ModelGraph, UserId};

use crate::error::ApiError;

/// One logical client operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub user: UserId,
    /// Creation time, epoch milliseconds.
    pub time: i64,
    pub description: String,
    pub changes: Vec<GraphChange>,
}

impl ChangeEvent {
    pub fn new(user: UserId, time: i64, description: impl Into<String>, changes: Vec<GraphChange>) -> Self {
        ChangeEvent {
            id: Uuid::new_v4().to_string(),
            user,
            time,
            description: description.into(),
            changes,
        }
    }
}

/// A history entry as listed by `get-undo-redo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "user-id")]
    pub user_id: String,
    /// Milliseconds elapsed since the event was recorded.
    pub time: i64,
    pub description: String,
    pub changes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    undo: VecDeque<ChangeEvent>,
    redo: VecDeque<ChangeEvent>,
}

impl UserHistory {
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

/// Undo/redo stacks of one model, keyed by user.
#[derive(Debug, Clone)]
pub struct UndoManager {
    capacity: usize,
    users: HashMap<UserId, UserHistory>,
}

impl UndoManager {
    pub fn new(capacity: usize) -> Self {
        UndoManager {
            capacity: capacity.max(1),
            users: HashMap::new(),
        }
    }

    pub fn history(&self, user: &UserId) -> Option<&UserHistory> {
        self.users.get(user)
    }

    /// Records an event for its user and clears the user's redo stack.
    /// Events without changes are ignored. The oldest event is evicted when
    /// the stack is full.
    pub fn record(&mut self, event: ChangeEvent) {
        if event.changes.is_empty() {
            return;
        }
        let history = self.users.entry(event.user.clone()).or_default();
        history.redo.clear();
        push_bounded(&mut history.undo, event, self.capacity);
    }

    /// Reverts the user's latest event.
    pub fn undo(&mut self, graph: &mut ModelGraph, user: &UserId) -> Result<ChangeEvent, ApiError> {
        let history = self.users.get_mut(user).ok_or(ApiError::NothingToUndo)?;
        let event = history.undo.back().ok_or(ApiError::NothingToUndo)?;
        let inverses: Vec<GraphChange> = event.changes.iter().rev().map(|c| c.inverse()).collect();
        apply_all(graph, &inverses)
            .map_err(|e| ApiError::InternalError(format!("cannot undo '{}': {}", event.description, e)))?;

        let event = history.undo.pop_back().ok_or(ApiError::NothingToUndo)?;
        push_bounded(&mut history.redo, event.clone(), self.capacity);
        tracing::info!(user = %user, event = %event.description, "undo");
        Ok(event)
    }

    /// Re-applies the user's latest undone event.
    pub fn redo(&mut self, graph: &mut ModelGraph, user: &UserId) -> Result<ChangeEvent, ApiError> {
        let history = self.users.get_mut(user).ok_or(ApiError::NothingToRedo)?;
        let event = history.redo.back().ok_or(ApiError::NothingToRedo)?;
        apply_all(graph, &event.changes)
            .map_err(|e| ApiError::InternalError(format!("cannot redo '{}': {}", event.description, e)))?;

        let event = history.redo.pop_back().ok_or(ApiError::NothingToRedo)?;
        push_bounded(&mut history.undo, event.clone(), self.capacity);
        tracing::info!(user = %user, event = %event.description, "redo");
        Ok(event)
    }

    /// Undo and redo entries of all users, oldest first, with times relative
    /// to `now` (epoch milliseconds).
    pub fn peek_history(&self, now: i64) -> (Vec<HistoryEntry>, Vec<HistoryEntry>) {
        let entries = |pick: fn(&UserHistory) -> &VecDeque<ChangeEvent>| {
            let mut out: Vec<(i64, HistoryEntry)> = self
                .users
                .values()
                .flat_map(|h| pick(h).iter())
                .map(|e| {
                    (
                        e.time,
                        HistoryEntry {
                            id: e.id.clone(),
                            user_id: e.user.to_string(),
                            time: now - e.time,
                            description: e.description.clone(),
                            changes: e.changes.len(),
                        },
                    )
                })
                .collect();
            out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
            out.into_iter().map(|(_, entry)| entry).collect()
        };
        (entries(|h| &h.undo), entries(|h| &h.redo))
    }
}

fn push_bounded(stack: &mut VecDeque<ChangeEvent>, event: ChangeEvent, capacity: usize) {
    stack.push_back(event);
    while stack.len() > capacity {
        stack.pop_front();
    }
}

/// Applies `changes` in order; on failure the ones already applied are
/// reverted before the error is returned.
pub(crate) fn apply_all(graph: &mut ModelGraph, changes: &[GraphChange]) -> Result<(), CoreError> {
    for (i, change) in changes.iter().enumerate() {
        if let Err(err) = graph.apply(change) {
            for applied in changes[..i].iter().rev() {
                graph.apply(&applied.inverse())?;
            }
            return Err(err);
        }
    }
    Ok(())
}
