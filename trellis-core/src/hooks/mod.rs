//! Hooks Runtime
//!
//! Function components keep state between renders in an ordered list of hook
//! slots attached to their work node. A [`Hooks`] value is the render context
//! handed to the component: every `use_*` call claims the next slot.
//!
//! # How It Works
//!
//! 1. The work loop opens a context for the node with [`Hooks::begin`]. If the
//!    node has an alternate, the alternate's slot list is adopted (update
//!    path); otherwise a fresh list is allocated (mount path).
//!
//! 2. Each hook call advances a cursor. On update, the slot under the cursor
//!    must hold the same kind of hook as before; a mismatch is a
//!    [`HookError`] unless the root runs with lenient hooks.
//!
//! 3. Effects whose dependencies changed are queued on the context. When the
//!    component returns, [`Hooks::finish`] hands the list and both effect
//!    queues back to the work loop, which stores them on the node for commit.
//!
//! 4. On the update path the list is shared with the committed node, so slot
//!    writes (new effect dependencies, lenient repairs) are staged in a
//!    [`SlotPatch`] and only land in the list when the node commits.
//!
//! The context is an explicit value threaded through the render call; there
//! is no global "currently rendering" pointer.

mod dispatch;
mod effect;
mod slot;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HookError;
use crate::fiber::FiberId;

pub use dispatch::{Dispatch, SetState};
pub use effect::{Dep, Deps, EffectQueue, EffectTag, QueuedEffect};
pub use slot::{HookList, HookListRef};
pub(crate) use slot::SlotPatch;

pub(crate) use dispatch::ScheduleUpdate;
pub(crate) use effect::deps_changed;
use slot::HookSlot;

/// How a hook call obtained its slot.
enum Claim {
    /// The slot from the previous render is reused as is.
    Reuse,
    /// The slot must be (re)initialized.
    Install,
}

/// What a finished render leaves behind for the work node.
#[derive(Debug)]
pub(crate) struct RenderedHooks {
    pub list: HookListRef,
    pub layout_effects: EffectQueue,
    pub passive_effects: EffectQueue,
    /// Slot writes to apply when the node commits.
    pub(crate) patch: SlotPatch,
}

/// Per-render hook context for one function component.
pub struct Hooks {
    list: HookListRef,
    cursor: usize,
    /// Slot count of the previous render, `None` on mount.
    previous: Option<usize>,
    strict: bool,
    schedule: ScheduleUpdate,
    layout_effects: EffectQueue,
    passive_effects: EffectQueue,
    patch: SlotPatch,
}

impl Hooks {
    /// Open a render context for `owner`, adopting `previous` if the node has
    /// rendered before.
    pub(crate) fn begin(
        owner: FiberId,
        previous: Option<HookListRef>,
        strict: bool,
        schedule: ScheduleUpdate,
    ) -> Self {
        let (list, previous) = match previous {
            Some(list) => {
                let len = list.lock().slots.len();
                (list, Some(len))
            }
            None => (Arc::new(Mutex::new(HookList::new(owner))), None),
        };
        Self {
            list,
            cursor: 0,
            previous,
            strict,
            schedule,
            layout_effects: EffectQueue::new(),
            passive_effects: EffectQueue::new(),
            patch: SlotPatch::new(owner),
        }
    }

    /// Close the context, checking that no hook from the previous render was
    /// skipped.
    pub(crate) fn finish(mut self) -> Result<RenderedHooks, HookError> {
        if let Some(expected) = self.previous {
            if self.cursor < expected {
                if self.strict {
                    return Err(HookError::MissingHooks {
                        expected,
                        rendered: self.cursor,
                    });
                }
                tracing::warn!(expected, rendered = self.cursor, "dropping unused hook slots");
                self.patch.truncate(self.cursor);
            }
        }
        Ok(RenderedHooks {
            list: self.list,
            layout_effects: self.layout_effects,
            passive_effects: self.passive_effects,
            patch: self.patch,
        })
    }

    /// Number of hooks called so far in this render.
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn claim(
        &mut self,
        list: &HookList,
        current: &'static str,
        fits: impl Fn(&HookSlot) -> bool,
    ) -> Result<(usize, Claim), HookError> {
        let index = self.cursor;
        self.cursor += 1;

        let Some(expected) = self.previous else {
            return Ok((index, Claim::Install));
        };
        if index >= expected {
            if self.strict {
                return Err(HookError::ExtraHook { index });
            }
            tracing::warn!(index, hook = current, "appending hook not present in previous render");
            return Ok((index, Claim::Install));
        }
        match list.slots.get(index) {
            Some(slot) if fits(slot) => Ok((index, Claim::Reuse)),
            Some(slot) => {
                if self.strict {
                    return Err(HookError::OrderMismatch {
                        index,
                        previous: slot.describe(),
                        current,
                    });
                }
                tracing::warn!(index, previous = slot.describe(), current, "re-initializing hook slot");
                Ok((index, Claim::Install))
            }
            None => Ok((index, Claim::Install)),
        }
    }

    /// Write a slot: straight into a freshly mounted list, staged otherwise.
    fn write(&mut self, list: &mut HookList, index: usize, slot: HookSlot) {
        match self.previous {
            None => list.put(index, slot),
            Some(_) => self.patch.write(index, slot),
        }
    }

    /// Reducer hook: returns the latest state and a dispatcher that folds an
    /// action into it with `reducer`.
    ///
    /// `initial` is only used on mount. The dispatcher always reduces from
    /// the slot's latest value, so consecutive dispatches compose.
    pub fn use_reducer<S, A, R>(
        &mut self,
        reducer: R,
        initial: S,
    ) -> Result<(S, Dispatch<S, A>), HookError>
    where
        S: Clone + Send + 'static,
        A: 'static,
        R: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        let (index, state) = self.state_slot(initial)?;
        let dispatch = Dispatch::reducer(
            Arc::downgrade(&self.list),
            index,
            Arc::new(reducer),
            Arc::clone(&self.schedule),
        );
        Ok((state, dispatch))
    }

    /// State hook: a reducer hook whose action is the next state.
    pub fn use_state<S>(&mut self, initial: S) -> Result<(S, SetState<S>), HookError>
    where
        S: Clone + Send + 'static,
    {
        fn replace<S>(next: S) -> S {
            next
        }

        let (index, state) = self.state_slot(initial)?;
        let set = Dispatch::replace(
            Arc::downgrade(&self.list),
            index,
            replace::<S>,
            Arc::clone(&self.schedule),
        );
        Ok((state, set))
    }

    fn state_slot<S>(&mut self, initial: S) -> Result<(usize, S), HookError>
    where
        S: Clone + Send + 'static,
    {
        let list = Arc::clone(&self.list);
        let mut list = list.lock();
        let (index, claim) = self.claim(&list, std::any::type_name::<S>(), HookSlot::holds::<S>)?;
        let state = match claim {
            Claim::Install => {
                let state = initial.clone();
                self.write(&mut list, index, HookSlot::state(initial));
                state
            }
            Claim::Reuse => list.slots[index]
                .state_ref::<S>()
                .cloned()
                .ok_or(HookError::OrderMismatch {
                    index,
                    previous: list.slots[index].describe(),
                    current: std::any::type_name::<S>(),
                })?,
        };
        Ok((index, state))
    }

    /// Passive effect: fires after the node's layout effects during commit.
    pub fn use_effect<F>(&mut self, callback: F, deps: Option<Deps>) -> Result<(), HookError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.effect(EffectTag::Passive, Box::new(callback), deps)
    }

    /// Layout effect: fires right after the node's own host mutation.
    pub fn use_layout_effect<F>(&mut self, callback: F, deps: Option<Deps>) -> Result<(), HookError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.effect(EffectTag::Layout, Box::new(callback), deps)
    }

    fn effect(
        &mut self,
        tag: EffectTag,
        callback: Box<dyn FnOnce() + Send>,
        deps: Option<Deps>,
    ) -> Result<(), HookError> {
        let list = Arc::clone(&self.list);
        let mut list = list.lock();
        let (index, claim) = self.claim(&list, tag.describe(), |slot| slot.is_effect(tag))?;

        let queue = match claim {
            Claim::Install => true,
            Claim::Reuse => match &list.slots[index] {
                HookSlot::Effect { deps: previous, .. } => {
                    deps_changed(previous.as_ref(), deps.as_ref())
                }
                HookSlot::State { .. } => true,
            },
        };
        self.write(&mut list, index, HookSlot::Effect { tag, deps });
        drop(list);

        if queue {
            let effect = QueuedEffect::new(tag, callback);
            match tag {
                EffectTag::Layout => self.layout_effects.push(effect),
                EffectTag::Passive => self.passive_effects.push(effect),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("cursor", &self.cursor)
            .field("previous", &self.previous)
            .field("strict", &self.strict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    use super::*;
    use crate::deps;

    fn counting_schedule() -> (ScheduleUpdate, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let schedule: ScheduleUpdate = Arc::new(move |_: Weak<Mutex<HookList>>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (schedule, count)
    }

    /// Render once with `body` without committing.
    fn render_uncommitted<T>(
        previous: Option<HookListRef>,
        strict: bool,
        schedule: &ScheduleUpdate,
        body: impl FnOnce(&mut Hooks) -> Result<T, HookError>,
    ) -> Result<(T, RenderedHooks), HookError> {
        let mut hooks = Hooks::begin(FiberId::new(), previous, strict, schedule.clone());
        let out = body(&mut hooks)?;
        Ok((out, hooks.finish()?))
    }

    /// Render once with `body` and commit its slot writes.
    fn render<T>(
        previous: Option<HookListRef>,
        strict: bool,
        schedule: &ScheduleUpdate,
        body: impl FnOnce(&mut Hooks) -> Result<T, HookError>,
    ) -> Result<(T, RenderedHooks), HookError> {
        let (out, mut rendered) = render_uncommitted(previous, strict, schedule, body)?;
        let owner = rendered.list.lock().owner();
        let patch = std::mem::replace(&mut rendered.patch, SlotPatch::new(owner));
        patch.apply(&mut rendered.list.lock());
        Ok((out, rendered))
    }

    #[test]
    fn state_survives_renders() {
        let (schedule, _) = counting_schedule();
        let (value, first) = render(None, true, &schedule, |h| h.use_state(7).map(|s| s.0)).unwrap();
        assert_eq!(value, 7);

        let (value, _) =
            render(Some(first.list), true, &schedule, |h| h.use_state(0).map(|s| s.0)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn dispatches_compose_from_the_latest_state() {
        let (schedule, scheduled) = counting_schedule();
        let ((_, dispatch), first) = render(None, true, &schedule, |h| {
            h.use_reducer(|count: &i32, step: i32| count + step, 1)
        })
        .unwrap();

        assert!(dispatch.dispatch(2));
        assert!(dispatch.dispatch(10));
        assert_eq!(scheduled.load(Ordering::SeqCst), 2);

        let ((value, _), _) = render(Some(first.list), true, &schedule, |h| {
            h.use_reducer(|count: &i32, step: i32| count + step, 1)
        })
        .unwrap();
        assert_eq!(value, 13);
    }

    #[test]
    fn dispatch_after_unmount_is_dropped() {
        let (schedule, scheduled) = counting_schedule();
        let ((_, set), rendered) =
            render(None, true, &schedule, |h| h.use_state(String::from("a"))).unwrap();
        drop(rendered);

        assert!(!set.is_mounted());
        assert!(!set.dispatch("b".to_string()));
        assert_eq!(scheduled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strict_mode_rejects_reordered_hooks() {
        let (schedule, _) = counting_schedule();
        let (_, first) = render(None, true, &schedule, |h| {
            h.use_state(1i32)?;
            h.use_state("x")?;
            Ok(())
        })
        .unwrap();

        let err = render(Some(first.list), true, &schedule, |h| {
            h.use_state("x")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, HookError::OrderMismatch { index: 0, .. }));
    }

    #[test]
    fn strict_mode_rejects_extra_and_missing_hooks() {
        let (schedule, _) = counting_schedule();
        let (_, first) = render(None, true, &schedule, |h| h.use_state(1).map(drop)).unwrap();

        let err = render(Some(first.list.clone()), true, &schedule, |h| {
            h.use_state(1)?;
            h.use_effect(|| {}, None)
        })
        .unwrap_err();
        assert_eq!(err, HookError::ExtraHook { index: 1 });

        let err = render(Some(first.list), true, &schedule, |_| Ok(())).unwrap_err();
        assert_eq!(err, HookError::MissingHooks { expected: 1, rendered: 0 });
    }

    #[test]
    fn lenient_mode_repairs_the_slot_list() {
        let (schedule, _) = counting_schedule();
        let (_, first) = render(None, false, &schedule, |h| {
            h.use_state(1i32)?;
            h.use_state(2i32)?;
            Ok(())
        })
        .unwrap();

        let (value, second) = render(Some(first.list), false, &schedule, |h| {
            h.use_state("fresh").map(|s| s.0)
        })
        .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(second.list.lock().len(), 1);
    }

    #[test]
    fn effect_dependencies_decide_queuing() {
        let (schedule, _) = counting_schedule();
        let body = |count: i32| {
            move |h: &mut Hooks| {
                h.use_effect(|| {}, Some(deps![]))?;
                h.use_effect(|| {}, Some(deps![count]))?;
                h.use_layout_effect(|| {}, None)
            }
        };

        let (_, first) = render(None, true, &schedule, body(1)).unwrap();
        assert_eq!(first.passive_effects.len(), 2);
        assert_eq!(first.layout_effects.len(), 1);

        let (_, second) = render(Some(first.list), true, &schedule, body(1)).unwrap();
        assert_eq!(second.passive_effects.len(), 0);
        assert_eq!(second.layout_effects.len(), 1);

        let (_, third) = render(Some(second.list), true, &schedule, body(2)).unwrap();
        assert_eq!(third.passive_effects.len(), 1);
    }

    #[test]
    fn abandoned_render_leaves_committed_slots_alone() {
        let (schedule, _) = counting_schedule();
        let body = |count: i32| {
            move |h: &mut Hooks| {
                h.use_state(0u8)?;
                h.use_effect(|| {}, Some(deps![count]))
            }
        };
        let (_, first) = render(None, false, &schedule, body(1)).unwrap();

        let (_, abandoned) = render_uncommitted(Some(first.list.clone()), false, &schedule, body(2)).unwrap();
        assert_eq!(abandoned.passive_effects.len(), 1);
        drop(abandoned);

        // a lenient repair that is never committed
        let (_, repaired) = render_uncommitted(Some(first.list.clone()), false, &schedule, |h| {
            h.use_state("other").map(drop)
        })
        .unwrap();
        drop(repaired);
        assert_eq!(first.list.lock().len(), 2);

        let (_, retried) = render(Some(first.list), false, &schedule, body(2)).unwrap();
        assert_eq!(retried.passive_effects.len(), 1);
    }

    #[test]
    fn owner_changes_when_the_render_commits() {
        let (schedule, _) = counting_schedule();
        let first = FiberId::new();
        let mut hooks = Hooks::begin(first, None, true, schedule.clone());
        hooks.use_state(0u8).unwrap();
        assert_eq!(hooks.position(), 1);
        let mounted = hooks.finish().unwrap();
        assert_eq!(mounted.list.lock().owner(), first);

        let second = FiberId::new();
        let mut hooks = Hooks::begin(second, Some(mounted.list.clone()), true, schedule);
        hooks.use_state(0u8).unwrap();
        let updated = hooks.finish().unwrap();
        assert_eq!(updated.list.lock().owner(), first);

        updated.patch.apply(&mut updated.list.lock());
        assert_eq!(mounted.list.lock().owner(), second);
    }
}
