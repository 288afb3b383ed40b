#![forbid(unsafe_code)]

//! Modal registry: the id to record table and its lifecycle.
//!
//! A [`ModalRegistry`] owns every open modal instance. Opening inserts a
//! record and returns a [`ModalHandle`]. The host calls [`ModalRegistry::render`]
//! whenever [`ModalRegistry::subscribe`] reports a change, and
//! [`ModalRegistry::tick`] from its event loop so evictions run.
//!
//! # Record lifecycle
//!
//! ```text
//! open() ──► open, not installed
//!              │ first render (post-render effect)
//!              ▼
//!            open, installed ──close/force_close──► closed (eviction scheduled)
//!                                                     │ next render with is_open = false
//!                                                     ▼
//!                                                   marked for cleanup (not rendered)
//!                                                     │ grace delay elapses, tick()
//!                                                     ▼
//!                                                   evicted
//! ```
//!
//! # Invariants
//!
//! 1. Ids are never reused; at most one record exists per id.
//! 2. `is_open` only goes `true -> false`. Reopening means a new record.
//! 3. `marked_for_cleanup` implies `!is_open`.
//! 4. A record is installed at most once and never uninstalled.
//! 5. Membership changes (open, mark for cleanup, evict, teardown) bump the
//!    registry version exactly once each. A record's own open-state change
//!    notifies only that record's subscribers.
//! 6. No internal borrow is held while adapters, listeners or subscribers
//!    run, or while records are dropped.
//! 7. A render pass notifies membership subscribers only after every adapter
//!    in the pass has run, before `render()` returns.
//!
//! # Failure Modes
//!
//! - Adapter panic: propagates out of `render()`. Instances rendered earlier
//!   in the same pass do not get their post-render effects; the next pass
//!   applies them.
//! - Listener panic: propagates out of the `close` call; the record is left
//!   open and a later close still negotiates normally.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use fmodal_core::ModalId;
use fmodal_runtime::{DeferredQueue, Observable, RegistryConfig, Subscription, TaskId};

use super::adapter::{ModalProps, SharedAdapter};
use super::context::{BeforeCloseListener, ModalContext};
use super::handle::ModalHandle;
use super::negotiation::{ControlRef, ModalControl};

struct ModalRecord<C, O, R> {
    content: Rc<C>,
    options: Rc<O>,
    adapter: SharedAdapter<C, O, R>,
    is_open: bool,
    open_state: Observable<bool>,
    installed: bool,
    marked_for_cleanup: bool,
    listener: Option<(u64, BeforeCloseListener)>,
    eviction: Option<TaskId>,
}

struct RegistryState<C, O, R> {
    records: BTreeMap<ModalId, ModalRecord<C, O, R>>,
    next_listener_generation: u64,
}

struct RenderJob<C, O, R> {
    id: ModalId,
    content: Rc<C>,
    options: Rc<O>,
    adapter: SharedAdapter<C, O, R>,
}

pub(crate) struct RegistryShared<C, O, R> {
    this: Weak<Self>,
    state: RefCell<RegistryState<C, O, R>>,
    version: Observable<u64>,
    queue: DeferredQueue,
    config: RegistryConfig,
    default_adapter: SharedAdapter<C, O, R>,
}

impl<C: 'static, O: 'static, R: 'static> RegistryShared<C, O, R> {
    fn control(&self) -> ControlRef {
        let control: Weak<dyn ModalControl> = self.this.clone();
        control
    }

    fn bump_version(&self) {
        self.version.update(|version| *version += 1);
    }

    fn insert(&self, adapter: SharedAdapter<C, O, R>, content: C, options: O) -> ModalId {
        let id = ModalId::next();
        let record = ModalRecord {
            content: Rc::new(content),
            options: Rc::new(options),
            adapter,
            is_open: true,
            open_state: Observable::new(true),
            installed: false,
            marked_for_cleanup: false,
            listener: None,
            eviction: None,
        };
        let open = {
            let mut state = self.state.borrow_mut();
            state.records.insert(id, record);
            state.records.len()
        };
        tracing::debug!(modal_id = id.id(), open, "modal opened");
        self.bump_version();
        id
    }

    fn schedule_eviction(&self, id: ModalId) -> TaskId {
        let registry = self.this.clone();
        let delay = self.config.grace_delay;
        tracing::debug!(modal_id = id.id(), ?delay, "modal eviction scheduled");
        self.queue.schedule(delay, move || {
            if let Some(registry) = registry.upgrade() {
                registry.evict(id);
            }
        })
    }

    fn evict(&self, id: ModalId) {
        let removed = self.state.borrow_mut().records.remove(&id);
        if let Some(record) = removed {
            drop(record);
            tracing::debug!(modal_id = id.id(), "modal evicted");
            self.bump_version();
        }
    }

    fn render_jobs(&self, only: Option<ModalId>) -> Vec<RenderJob<C, O, R>> {
        let state = self.state.borrow();
        state
            .records
            .iter()
            .filter(|(id, record)| !record.marked_for_cleanup && only.is_none_or(|o| o == **id))
            .map(|(&id, record)| RenderJob {
                id,
                content: Rc::clone(&record.content),
                options: Rc::clone(&record.options),
                adapter: Rc::clone(&record.adapter),
            })
            .collect()
    }

    fn render_pass(&self, only: Option<ModalId>) -> Vec<RenderedModal<R>> {
        let jobs = self.render_jobs(only);
        let mut rendered = Vec::with_capacity(jobs.len());
        for job in jobs {
            // An earlier adapter in this pass may have torn the record down.
            let Some(is_open) = self.open_state(job.id) else {
                continue;
            };
            let context = ModalContext::new(job.id, self.control());
            let output = job.adapter.render(ModalProps {
                is_open,
                context: &context,
                children: &*job.content,
                options: &*job.options,
            });
            rendered.push(RenderedModal {
                id: job.id,
                is_open,
                output,
            });
        }
        self.apply_effects(&rendered);
        rendered
    }

    /// Post-render effects: install handles, mark closed records for cleanup.
    fn apply_effects(&self, rendered: &[RenderedModal<R>]) {
        let mut membership_changed = false;
        {
            let mut state = self.state.borrow_mut();
            for instance in rendered {
                let Some(record) = state.records.get_mut(&instance.id) else {
                    continue;
                };
                if !record.installed {
                    record.installed = true;
                    tracing::trace!(modal_id = instance.id.id(), "modal installed");
                }
                if !instance.is_open && !record.marked_for_cleanup {
                    record.marked_for_cleanup = true;
                    membership_changed = true;
                }
            }
        }
        if membership_changed {
            self.bump_version();
        }
    }

    fn teardown(&self) -> usize {
        let records = std::mem::take(&mut self.state.borrow_mut().records);
        for task in records.values().filter_map(|record| record.eviction) {
            self.queue.cancel(task);
        }
        let count = records.len();
        drop(records);
        count
    }
}

impl<C: 'static, O: 'static, R: 'static> ModalControl for RegistryShared<C, O, R> {
    fn open_state(&self, id: ModalId) -> Option<bool> {
        self.state.borrow().records.get(&id).map(|r| r.is_open)
    }

    fn is_installed(&self, id: ModalId) -> Option<bool> {
        self.state.borrow().records.get(&id).map(|r| r.installed)
    }

    fn listener(&self, id: ModalId) -> Option<BeforeCloseListener> {
        let state = self.state.borrow();
        let (_, listener) = state.records.get(&id)?.listener.as_ref()?;
        Some(Rc::clone(listener))
    }

    fn listener_generation(&self, id: ModalId) -> Option<u64> {
        let state = self.state.borrow();
        state.records.get(&id)?.listener.as_ref().map(|(g, _)| *g)
    }

    fn commit_close(&self, id: ModalId) -> bool {
        let open_state = {
            let mut state = self.state.borrow_mut();
            let Some(record) = state.records.get_mut(&id) else {
                return false;
            };
            if !record.is_open {
                return false;
            }
            record.is_open = false;
            record.eviction = Some(self.schedule_eviction(id));
            record.open_state.clone()
        };
        open_state.set(false);
        true
    }

    fn set_listener(&self, id: ModalId, listener: BeforeCloseListener) -> Option<u64> {
        let mut state = self.state.borrow_mut();
        if !state.records.contains_key(&id) {
            drop(state);
            drop(listener);
            return None;
        }
        let generation = state.next_listener_generation;
        state.next_listener_generation += 1;
        let previous = state
            .records
            .get_mut(&id)
            .and_then(|record| record.listener.replace((generation, listener)));
        drop(state);
        drop(previous);
        Some(generation)
    }

    fn remove_listener(&self, id: ModalId, generation: u64) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            match state.records.get_mut(&id) {
                Some(record) if record.listener.as_ref().is_some_and(|(g, _)| *g == generation) => {
                    record.listener.take()
                }
                _ => None,
            }
        };
        removed.is_some()
    }
}

impl<C, O, R> Drop for RegistryShared<C, O, R> {
    fn drop(&mut self) {
        let pending: Vec<TaskId> = self
            .state
            .get_mut()
            .records
            .values()
            .filter_map(|record| record.eviction)
            .collect();
        for task in pending {
            self.queue.cancel(task);
        }
    }
}

/// One instance's output from a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModal<R> {
    /// Instance ID, usable as a reconciliation key.
    pub id: ModalId,
    /// Open state the adapter was given.
    pub is_open: bool,
    /// Whatever the adapter returned.
    pub output: R,
}

/// Table of open modal instances bound to a default adapter.
///
/// `C` is the content type, `O` the per-modal options and `R` the adapter's
/// output. Cloning produces another handle to the same registry.
pub struct ModalRegistry<C, O = (), R = ()> {
    pub(crate) shared: Rc<RegistryShared<C, O, R>>,
}

impl<C, O, R> Clone for ModalRegistry<C, O, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C: 'static, O: 'static, R: 'static> ModalRegistry<C, O, R> {
    /// Create a registry with the default configuration.
    pub fn new(render: impl Fn(ModalProps<'_, C, O>) -> R + 'static) -> Self {
        Self::with_config(render, RegistryConfig::default())
    }

    /// Create a registry with an explicit configuration.
    pub fn with_config(
        render: impl Fn(ModalProps<'_, C, O>) -> R + 'static,
        config: RegistryConfig,
    ) -> Self {
        Self::with_scheduler(Rc::new(render), config, DeferredQueue::new())
    }

    /// Create a registry whose evictions run on an externally owned queue.
    pub fn with_scheduler(
        adapter: SharedAdapter<C, O, R>,
        config: RegistryConfig,
        queue: DeferredQueue,
    ) -> Self {
        let shared = Rc::new_cyclic(|this| RegistryShared {
            this: this.clone(),
            state: RefCell::new(RegistryState {
                records: BTreeMap::new(),
                next_listener_generation: 1,
            }),
            version: Observable::new(0),
            queue,
            config,
            default_adapter: adapter,
        });
        Self { shared }
    }

    /// Open a modal with the registry's default adapter.
    pub fn open(&self, content: C, options: O) -> ModalHandle {
        self.open_with(Rc::clone(&self.shared.default_adapter), content, options)
    }

    /// Open a modal rendered by `adapter` instead of the default one.
    pub fn open_with(&self, adapter: SharedAdapter<C, O, R>, content: C, options: O) -> ModalHandle {
        let id = self.shared.insert(adapter, content, options);
        ModalHandle::new(id, self.shared.control())
    }

    /// Render every instance not marked for cleanup, in open order.
    ///
    /// Runs the post-render effects afterwards: instances rendered for the
    /// first time become installed, and closed instances are marked for
    /// cleanup and excluded from later passes. Subscribers hear about those
    /// marks before this returns.
    pub fn render(&self) -> Vec<RenderedModal<R>> {
        self.shared.render_pass(None)
    }

    /// Re-render a single instance.
    ///
    /// Returns `None` if the instance is gone or marked for cleanup.
    pub fn render_instance(&self, id: ModalId) -> Option<RenderedModal<R>> {
        self.shared.render_pass(Some(id)).pop()
    }

    /// Run due deferred tasks (evictions). Returns the number run.
    pub fn tick(&self) -> usize {
        self.shared.queue.run_due()
    }

    /// The queue evictions are scheduled on.
    #[must_use]
    pub fn scheduler(&self) -> &DeferredQueue {
        &self.shared.queue
    }

    /// The registry's configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Subscribe to membership changes. The callback gets the new version.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(u64) + 'static) -> Subscription {
        self.shared.version.subscribe(move |version| callback(*version))
    }

    /// Membership version; bumps once per membership change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version.get()
    }

    /// Subscribe to one instance's open state.
    ///
    /// Returns `None` if the instance does not exist.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_instance(
        &self,
        id: ModalId,
        callback: impl Fn(bool) + 'static,
    ) -> Option<Subscription> {
        let open_state = self
            .shared
            .state
            .borrow()
            .records
            .get(&id)
            .map(|record| record.open_state.clone())?;
        Some(open_state.subscribe(move |is_open| callback(*is_open)))
    }

    /// Handle for an existing instance.
    #[must_use]
    pub fn handle(&self, id: ModalId) -> Option<ModalHandle> {
        self.contains(id)
            .then(|| ModalHandle::new(id, self.shared.control()))
    }

    /// Number of records, including closed ones awaiting eviction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.borrow().records.len()
    }

    /// Whether the registry holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.borrow().records.is_empty()
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: ModalId) -> bool {
        self.shared.state.borrow().records.contains_key(&id)
    }

    /// Open state of `id`, or `None` if the record is gone.
    #[must_use]
    pub fn is_open(&self, id: ModalId) -> Option<bool> {
        self.shared.open_state(id)
    }

    /// Whether `id` has been marked for cleanup, or `None` if it is gone.
    #[must_use]
    pub fn is_marked_for_cleanup(&self, id: ModalId) -> Option<bool> {
        self.shared
            .state
            .borrow()
            .records
            .get(&id)
            .map(|record| record.marked_for_cleanup)
    }

    /// Ids of every record, in open order.
    #[must_use]
    pub fn ids(&self) -> Vec<ModalId> {
        self.shared.state.borrow().records.keys().copied().collect()
    }

    /// Drop every record and cancel pending evictions.
    ///
    /// Outstanding handles become inert. Returns the number of records
    /// dropped.
    pub fn teardown(&self) -> usize {
        let dropped = self.shared.teardown();
        tracing::debug!(dropped, "modal registry torn down");
        if dropped > 0 {
            self.shared.bump_version();
        }
        dropped
    }
}

impl<C, O, R> fmt::Debug for ModalRegistry<C, O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ModalRegistry")
            .field("ids", &state.records.keys().collect::<Vec<_>>())
            .field("grace_delay", &self.shared.config.grace_delay)
            .finish()
    }
}
