//! State Dispatch
//!
//! A [`Dispatch`] is a command value: which slot list, which slot, and how to
//! fold an action into the slot's state. It holds the slot list weakly and
//! resolves it when invoked, so dispatching to a component that has since
//! unmounted is dropped instead of touching a discarded node.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::slot::HookList;

/// Enqueue a re-render of whichever work node currently owns a slot list.
pub(crate) type ScheduleUpdate = Arc<dyn Fn(Weak<Mutex<HookList>>) + Send + Sync>;

type ReducerFn<S, A> = dyn Fn(&S, A) -> S + Send + Sync;

enum Reduce<S, A> {
    /// State hook: the action is the new state.
    Replace(fn(A) -> S),
    Reducer(Arc<ReducerFn<S, A>>),
}

impl<S, A> Clone for Reduce<S, A> {
    fn clone(&self) -> Self {
        match self {
            Reduce::Replace(f) => Reduce::Replace(*f),
            Reduce::Reducer(f) => Reduce::Reducer(Arc::clone(f)),
        }
    }
}

/// Updates one state slot and schedules its component to re-render.
pub struct Dispatch<S, A> {
    hooks: Weak<Mutex<HookList>>,
    slot: usize,
    reduce: Reduce<S, A>,
    schedule: ScheduleUpdate,
    _state: PhantomData<fn(A) -> S>,
}

/// The setter returned by `use_state`.
pub type SetState<S> = Dispatch<S, S>;

impl<S, A> Dispatch<S, A>
where
    S: 'static,
{
    pub(crate) fn reducer(
        hooks: Weak<Mutex<HookList>>,
        slot: usize,
        reducer: Arc<ReducerFn<S, A>>,
        schedule: ScheduleUpdate,
    ) -> Self {
        Self {
            hooks,
            slot,
            reduce: Reduce::Reducer(reducer),
            schedule,
            _state: PhantomData,
        }
    }

    pub(crate) fn replace(
        hooks: Weak<Mutex<HookList>>,
        slot: usize,
        replace: fn(A) -> S,
        schedule: ScheduleUpdate,
    ) -> Self {
        Self {
            hooks,
            slot,
            reduce: Reduce::Replace(replace),
            schedule,
            _state: PhantomData,
        }
    }

    /// Fold `action` into the slot's latest state and schedule a re-render.
    ///
    /// Returns `false` when the component is no longer mounted; the action is
    /// dropped in that case.
    pub fn dispatch(&self, action: A) -> bool {
        let Some(hooks) = self.hooks.upgrade() else {
            tracing::warn!(slot = self.slot, "dispatch to an unmounted component ignored");
            return false;
        };

        {
            let mut list = hooks.lock();
            let owner = list.owner;
            let Some(state) = list.slots.get_mut(self.slot).and_then(|s| s.state_mut::<S>()) else {
                tracing::warn!(?owner, slot = self.slot, "dispatch target slot no longer holds this state");
                return false;
            };
            let next = match &self.reduce {
                Reduce::Replace(replace) => replace(action),
                Reduce::Reducer(reducer) => reducer(&*state, action),
            };
            *state = next;
            tracing::trace!(?owner, slot = self.slot, "state slot updated");
        }

        (self.schedule)(Arc::downgrade(&hooks));
        true
    }

    /// Whether the component behind this dispatcher is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.hooks.strong_count() > 0
    }
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            hooks: Weak::clone(&self.hooks),
            slot: self.slot,
            reduce: self.reduce.clone(),
            schedule: Arc::clone(&self.schedule),
            _state: PhantomData,
        }
    }
}

impl<S, A> fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("slot", &self.slot)
            .field("mounted", &(self.hooks.strong_count() > 0))
            .finish()
    }
}
