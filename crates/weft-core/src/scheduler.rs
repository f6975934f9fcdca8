// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chore scheduler: scheduling entry point, drain loop and drain barrier.
//!
//! Single-threaded. Deferred drains and deferred chore settlements run as
//! [`tokio::task::spawn_local`] tasks, so a scheduler must be driven from
//! inside a [`tokio::task::LocalSet`].
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

use crate::arena::ChoreArena;
use crate::blocking::{find_blocking_chore, find_blocking_chore_for_visible, Pools};
use crate::chore::{
    Chore, ChoreState, ChoreSummary, ChoreWork, EffectBatch, ReactiveSource, TaskFlavor, TaskRef,
    Value,
};
use crate::completion::{ChoreHandle, ChoreOutcome};
use crate::config::SchedulerConfig;
use crate::error::ChoreError;
use crate::handlers::{ChoreContext, ChoreFuture, ChoreHandlers, Execution};
use crate::host::HostTree;
use crate::ident::{ChoreId, CodeRef, HostId};
use crate::kind::ChoreKind;
use crate::ordering::compare_chores;
use crate::queue::{remove_id, WorkQueue};
use crate::retry::{retry_on_not_ready, settle, Settlement};
use crate::telemetry::{NullTelemetrySink, TelemetryEvent, TelemetrySink, TracingTelemetrySink};

#[derive(Debug)]
struct SchedulerState {
    arena: ChoreArena,
    queue: WorkQueue,
    parked: Vec<ChoreId>,
    running: Vec<ChoreId>,
    /// Queued and running chores per owner.
    owner_queued: FxHashMap<HostId, Vec<ChoreId>>,
    /// Parked chores per owner.
    owner_parked: FxHashMap<HostId, Vec<ChoreId>>,
    draining: bool,
    drain_scheduled: bool,
    flushing: bool,
    last_flush: Instant,
    barrier: Option<ChoreId>,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            arena: ChoreArena::default(),
            queue: WorkQueue::default(),
            parked: Vec::new(),
            running: Vec::new(),
            owner_queued: FxHashMap::default(),
            owner_parked: FxHashMap::default(),
            draining: false,
            drain_scheduled: false,
            flushing: false,
            last_flush: Instant::now(),
            barrier: None,
        }
    }

    fn pools(&self) -> Pools<'_> {
        self.pools_excluding(&[])
    }

    fn pools_excluding<'a>(&'a self, exclude: &'a [ChoreId]) -> Pools<'a> {
        Pools {
            arena: &self.arena,
            queue: &self.queue,
            parked: &self.parked,
            running: &self.running,
            owner_queued: &self.owner_queued,
            owner_parked: &self.owner_parked,
            exclude,
        }
    }

    /// Every parked chore waiting on `chore`, directly or through another
    /// parked chore.
    fn waiting_on(&self, chore: &Chore) -> Vec<ChoreId> {
        let mut found = Vec::new();
        let mut pending = chore.blocked_dependents.clone();
        while let Some(id) = pending.pop() {
            if found.contains(&id) {
                continue;
            }
            found.push(id);
            if let Some(dep) = self.arena.get(id) {
                pending.extend_from_slice(&dep.blocked_dependents);
            }
        }
        found
    }

    fn summaries(&self, ids: impl Iterator<Item = ChoreId>) -> Vec<ChoreSummary> {
        ids.filter_map(|id| self.arena.get(id).map(|c| c.summary(id)))
            .collect()
    }
}

fn unmirror(mirror: &mut FxHashMap<HostId, Vec<ChoreId>>, owner: Option<HostId>, id: ChoreId) {
    let Some(owner) = owner else { return };
    if let Some(ids) = mirror.get_mut(&owner) {
        remove_id(ids, id);
        if ids.is_empty() {
            mirror.remove(&owner);
        }
    }
}

fn mirror(map: &mut FxHashMap<HostId, Vec<ChoreId>>, owner: Option<HostId>, id: ChoreId) {
    if let Some(owner) = owner {
        map.entry(owner).or_default().push(id);
    }
}

struct Inner {
    state: RefCell<SchedulerState>,
    tree: Rc<dyn HostTree>,
    handlers: Rc<dyn ChoreHandlers>,
    telemetry: Rc<dyn TelemetrySink>,
    config: SchedulerConfig,
}

/// Where a chore ended up after placement.
enum Placement {
    Queued,
    Parked,
}

/// Cooperative, structure-aware chore scheduler.
///
/// Cloning is cheap and yields another handle to the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.try_borrow();
        let mut dbg = f.debug_struct("Scheduler");
        dbg.field("config", &self.inner.config);
        if let Ok(st) = state {
            dbg.field("queued", &st.queue.len())
                .field("parked", &st.parked.len())
                .field("running", &st.running.len());
        }
        dbg.finish_non_exhaustive()
    }
}

/// Builder for [`Scheduler`].
pub struct SchedulerBuilder {
    tree: Rc<dyn HostTree>,
    handlers: Rc<dyn ChoreHandlers>,
    config: SchedulerConfig,
    telemetry: Option<Rc<dyn TelemetrySink>>,
}

impl SchedulerBuilder {
    /// Replaces the default configuration.
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a diagnostic sink.
    pub fn telemetry(mut self, sink: Rc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> Scheduler {
        let telemetry = self.telemetry.unwrap_or_else(|| {
            if self.config.trace_chores {
                Rc::new(TracingTelemetrySink)
            } else {
                Rc::new(NullTelemetrySink)
            }
        });
        Scheduler {
            inner: Rc::new(Inner {
                state: RefCell::new(SchedulerState::new()),
                tree: self.tree,
                handlers: self.handlers,
                telemetry,
                config: self.config,
            }),
        }
    }
}

/// Resets the drain flag when the loop exits, including by unwinding, and
/// gives a pending drain barrier a chance to resolve.
struct DrainGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut st) = self.scheduler.inner.state.try_borrow_mut() else {
            return;
        };
        st.draining = false;
        drop(st);
        self.scheduler.try_finish_barrier();
    }
}

impl Scheduler {
    /// Starts building a scheduler over `tree` that delegates to `handlers`.
    pub fn builder(tree: Rc<dyn HostTree>, handlers: Rc<dyn ChoreHandlers>) -> SchedulerBuilder {
        SchedulerBuilder {
            tree,
            handlers,
            config: SchedulerConfig::default(),
            telemetry: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    fn emit(&self, event: TelemetryEvent) {
        self.inner.telemetry.record(&event);
    }

    /// Schedules `work` and returns its completion handle.
    ///
    /// Urgent work (code invocation, and component evaluation on the server)
    /// drains immediately; everything else drains on the next tick.
    pub fn schedule(&self, work: ChoreWork) -> ChoreHandle {
        let kind = work.kind();
        if kind == ChoreKind::DrainBarrier {
            return self.settled();
        }
        let server = self.inner.config.mode.is_server();
        if server && kind.is_client_only() {
            self.emit(TelemetryEvent::ShortCircuited { kind });
            return ChoreHandle::settled(kind, Ok(Value::Null));
        }
        if server && !kind.may_backpatch() {
            if let Some(host) = work.owner().filter(|h| !self.inner.tree.is_updatable(*h)) {
                warn!(%kind, %host, "cannot schedule chore on a host that was already streamed");
                self.emit(TelemetryEvent::Rejected { kind, host });
                return ChoreHandle::settled(kind, Err(ChoreError::Streamed { kind, host }));
            }
        }

        let handle = ChoreHandle::new(kind);
        let placement = self.place(Chore::new(work, handle.clone()));
        if matches!(placement, Placement::Queued) {
            let urgent = kind == ChoreKind::InvokeCode
                || (server && kind == ChoreKind::EvaluateComponent);
            if urgent {
                self.drain();
            } else {
                self.schedule_drain();
            }
        }
        handle
    }

    /// Schedules resolution of a deferred code reference.
    pub fn schedule_resolve_code(&self, owner: Option<HostId>, code: CodeRef) -> ChoreHandle {
        self.schedule(ChoreWork::ResolveCode { owner, code })
    }

    /// Schedules a code invocation.
    pub fn schedule_invoke(
        &self,
        owner: Option<HostId>,
        code: CodeRef,
        args: Vec<Value>,
    ) -> ChoreHandle {
        self.schedule(ChoreWork::InvokeCode {
            owner,
            code,
            args: Rc::from(args),
        })
    }

    /// Schedules a task or resource run.
    pub fn schedule_task(&self, task: TaskRef) -> ChoreHandle {
        self.schedule(ChoreWork::Task(task))
    }

    /// Schedules reconciliation of `render` below `host`.
    pub fn schedule_reconcile(&self, host: HostId, render: Rc<Value>) -> ChoreHandle {
        self.schedule(ChoreWork::Reconcile { host, render })
    }

    /// Schedules an attribute write (backpatch on the server).
    pub fn schedule_attribute(&self, host: HostId, name: &str, value: Rc<Value>) -> ChoreHandle {
        self.schedule(ChoreWork::WriteAttribute {
            host,
            name: Rc::from(name),
            value,
        })
    }

    /// Schedules a component evaluation.
    pub fn schedule_component(&self, host: HostId, code: CodeRef, props: Rc<Value>) -> ChoreHandle {
        self.schedule(ChoreWork::EvaluateComponent { host, code, props })
    }

    /// Schedules recomputation of the effects subscribed to `source`.
    pub fn schedule_effects(
        &self,
        owner: Option<HostId>,
        source: ReactiveSource,
        batch: Rc<EffectBatch>,
    ) -> ChoreHandle {
        self.schedule(ChoreWork::RecomputeEffects {
            owner,
            source,
            batch,
        })
    }

    /// Schedules a visible task.
    pub fn schedule_visible(&self, task: TaskRef) -> ChoreHandle {
        self.schedule(ChoreWork::Visible(task))
    }

    /// Schedules teardown of a visible task.
    pub fn schedule_cleanup(&self, task: TaskRef) -> ChoreHandle {
        self.schedule(ChoreWork::CleanupVisible(task))
    }

    /// Drain barrier: resolves once nothing is queued or running.
    ///
    /// Returns the same handle until it resolves; afterwards a fresh one.
    pub fn settled(&self) -> ChoreHandle {
        let handle = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            let pending = st
                .barrier
                .and_then(|id| st.arena.get(id))
                .map(|c| c.handle.clone());
            match pending {
                Some(handle) => handle,
                None => {
                    let handle = ChoreHandle::new(ChoreKind::DrainBarrier);
                    let id = st
                        .arena
                        .insert(Chore::new(ChoreWork::DrainBarrier, handle.clone()));
                    st.barrier = Some(id);
                    handle
                }
            }
        };
        self.schedule_drain();
        handle
    }

    /// Blocking check, then park or queue (coalescing either way).
    fn place(&self, chore: Chore) -> Placement {
        let tree = &*self.inner.tree;
        let mut guard = self.inner.state.borrow_mut();
        let st = &mut *guard;
        let kind = chore.kind();
        let owner = chore.owner();

        let waiting = st.waiting_on(&chore);
        let blocker = find_blocking_chore(&chore.work, &st.pools_excluding(&waiting), tree);
        if let Some(blocker) = blocker {
            self.park_behind(st, chore, blocker);
            return Placement::Parked;
        }

        let (id, at) = st.queue.add(chore, &mut st.arena, tree);
        if at.is_ok() {
            self.emit(TelemetryEvent::Coalesced { into: id, kind });
        } else {
            mirror(&mut st.owner_queued, owner, id);
            self.emit(TelemetryEvent::Scheduled { id, kind, owner });
        }
        Placement::Queued
    }

    /// Links `chore` into `blocker`'s dependents, merging it into an equal
    /// dependent when one is already waiting there.
    fn park_behind(&self, st: &mut SchedulerState, chore: Chore, blocker: ChoreId) {
        let tree = &*self.inner.tree;
        let kind = chore.kind();
        let twin = st.arena.get(blocker).and_then(|b| {
            b.blocked_dependents.iter().copied().find(|dep| {
                st.arena
                    .get(*dep)
                    .is_some_and(|d| compare_chores(&chore.work, &d.work, tree).is_eq())
            })
        });
        if let Some(into) = twin {
            if let Some(existing) = st.arena.get_mut(into) {
                existing.absorb(chore);
            }
            self.emit(TelemetryEvent::Coalesced { into, kind });
            return;
        }
        let owner = chore.owner();
        let id = st.arena.insert(chore);
        if let Some(b) = st.arena.get_mut(blocker) {
            b.blocked_dependents.push(id);
        }
        st.parked.push(id);
        mirror(&mut st.owner_parked, owner, id);
        trace!(%id, %kind, %blocker, "parked");
        self.emit(TelemetryEvent::Blocked { id, kind, blocker });
    }

    /// Parks an already-popped chore behind a running blocker.
    fn park_popped(&self, id: ChoreId, blocker: ChoreId) {
        let mut guard = self.inner.state.borrow_mut();
        let st = &mut *guard;
        let Some(chore) = st.arena.remove(id) else { return };
        unmirror(&mut st.owner_queued, chore.owner(), id);
        self.park_behind(st, chore, blocker);
    }

    /// Re-examines parked chores whose blocker settled.
    fn release(&self, dependents: Vec<ChoreId>) {
        if dependents.is_empty() {
            return;
        }
        let mut requeued = false;
        for dep in dependents {
            let chore = {
                let mut guard = self.inner.state.borrow_mut();
                let st = &mut *guard;
                remove_id(&mut st.parked, dep);
                let Some(chore) = st.arena.remove(dep) else { continue };
                unmirror(&mut st.owner_parked, chore.owner(), dep);
                chore
            };
            self.emit(TelemetryEvent::Released { id: dep, kind: chore.kind() });
            requeued |= matches!(self.place(chore), Placement::Queued);
        }
        let draining = self.inner.state.borrow().draining;
        if requeued && !draining {
            self.schedule_drain();
        }
    }

    /// Runs the drain on the next tick, once.
    fn schedule_drain(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.drain_scheduled {
                return;
            }
            st.drain_scheduled = true;
        }
        let weak = Rc::downgrade(&self.inner);
        tokio::task::spawn_local(async move {
            let Some(inner) = weak.upgrade() else { return };
            inner.state.borrow_mut().drain_scheduled = false;
            Scheduler { inner }.drain();
        });
    }

    /// Runs queued chores in order until the queue is empty or the flush
    /// budget is spent. A no-op while a drain is already running.
    #[instrument(level = "trace", skip(self))]
    pub fn drain(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.draining {
                return;
            }
            st.draining = true;
        }
        let _guard = DrainGuard { scheduler: self };

        if self.inner.state.borrow().queue.is_empty() {
            self.flush();
            return;
        }

        let budget = self.inner.config.flush_budget();
        loop {
            let now = Instant::now();
            let popped = {
                let mut guard = self.inner.state.borrow_mut();
                let st = &mut *guard;
                st.queue
                    .pop_front()
                    .and_then(|id| st.arena.get(id).map(|c| (id, c.work.clone())))
            };
            let Some((id, work)) = popped else { break };
            let kind = work.kind();

            if let Some(owner) = work.owner() {
                if kind != ChoreKind::CleanupVisible && self.inner.tree.is_deleted(owner) {
                    self.skip(id, owner);
                    continue;
                }
            }

            if kind == ChoreKind::Visible {
                self.flush();
                let blocker = {
                    let st = self.inner.state.borrow();
                    find_blocking_chore_for_visible(&work, &st.pools(), &*self.inner.tree)
                };
                if let Some(blocker) = blocker {
                    self.park_popped(id, blocker);
                    continue;
                }
            }

            self.execute(id, work, now);

            let since_flush = {
                let st = self.inner.state.borrow();
                Instant::now().saturating_duration_since(st.last_flush)
            };
            if since_flush > budget {
                trace!(?since_flush, "flush budget spent, yielding");
                self.flush();
                self.schedule_drain();
                break;
            }
        }

        let idle = {
            let st = self.inner.state.borrow();
            st.queue.is_empty() && st.running.is_empty()
        };
        if idle {
            self.flush();
        }
    }

    /// Discards a popped chore whose owner was deleted.
    fn skip(&self, id: ChoreId, owner: HostId) {
        let chore = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            unmirror(&mut st.owner_queued, Some(owner), id);
            st.arena.remove(id)
        };
        let Some(mut chore) = chore else { return };
        chore.state = ChoreState::Done;
        trace!(%id, kind = %chore.kind(), %owner, "owner deleted, skipping");
        self.emit(TelemetryEvent::Skipped { id, kind: chore.kind(), owner });
        settle_all(&chore, &Ok(Value::Null));
        self.release(chore.blocked_dependents);
    }

    fn execute(&self, id: ChoreId, work: ChoreWork, now: Instant) {
        let kind = work.kind();
        {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            let Some(chore) = st.arena.get_mut(id) else { return };
            chore.state = ChoreState::Running;
            chore.started_at = Some(now);
            st.running.push(id);
        }
        self.emit(TelemetryEvent::Started { id, kind });

        match self.dispatch(work) {
            Settlement::Ready(outcome) => self.finish(id, outcome),
            Settlement::Deferred(fut) => {
                self.emit(TelemetryEvent::Deferred { id, kind });
                self.spawn_settlement(id, fut);
            }
        }
    }

    /// Calls the collaborator for `work`, retrying on not-ready signals.
    fn dispatch(&self, work: ChoreWork) -> Settlement {
        let weak = Rc::downgrade(&self.inner);
        let max_retries = self.inner.config.max_retries;
        settle(max_retries, move || {
            let Some(inner) = weak.upgrade() else {
                return Execution::Ready(Err(ChoreError::SchedulerDropped));
            };
            Scheduler { inner }.run_handler(&work)
        })
    }

    fn run_handler(&self, work: &ChoreWork) -> Execution {
        let handlers = &*self.inner.handlers;
        let cx = ChoreContext::new(self, work);
        let server = self.inner.config.mode.is_server();
        match work {
            ChoreWork::ResolveCode { code, .. } => handlers.resolve_code(&cx, code),
            ChoreWork::InvokeCode { code, args, .. } => handlers.invoke_code(&cx, code, args),
            ChoreWork::Task(task) if task.flavor == TaskFlavor::Resource => {
                handlers.run_resource(&cx, task)
            }
            ChoreWork::Task(task) => handlers.run_task(&cx, task),
            ChoreWork::Reconcile { host, render } => handlers.reconcile(&cx, *host, render),
            ChoreWork::WriteAttribute { host, name, value } if server => {
                handlers.backpatch_attribute(&cx, *host, name, value)
            }
            ChoreWork::WriteAttribute { host, name, value } => {
                handlers.apply_attribute(&cx, *host, name, value)
            }
            ChoreWork::EvaluateComponent { host, code, props } => {
                let evaluated = handlers.evaluate_component(&cx, *host, code, props);
                if server {
                    evaluated
                } else {
                    self.reconcile_rendered(&cx, *host, evaluated)
                }
            }
            ChoreWork::RecomputeEffects { source, batch, .. } => {
                handlers.recompute_effects(&cx, source, batch)
            }
            ChoreWork::Visible(task) => handlers.run_visible(&cx, task),
            ChoreWork::CleanupVisible(task) => handlers.cleanup_visible(&cx, task),
            ChoreWork::DrainBarrier => Execution::done(Value::Null),
        }
    }

    /// Client-side component evaluation continues into reconciliation of the
    /// render output it produced.
    fn reconcile_rendered(
        &self,
        cx: &ChoreContext<'_>,
        host: HostId,
        evaluated: Execution,
    ) -> Execution {
        match evaluated {
            Execution::Ready(Ok(render)) => {
                self.inner.handlers.reconcile(cx, host, &Rc::new(render))
            }
            Execution::Deferred(fut) => {
                let weak = Rc::downgrade(&self.inner);
                let max_retries = self.inner.config.max_retries;
                let work = ChoreWork::Reconcile {
                    host,
                    render: Rc::new(Value::Null),
                };
                Execution::deferred(async move {
                    let render = Rc::new(fut.await?);
                    retry_on_not_ready(max_retries, move || {
                        let Some(inner) = weak.upgrade() else {
                            return Execution::Ready(Err(ChoreError::SchedulerDropped));
                        };
                        let scheduler = Scheduler { inner };
                        let cx = ChoreContext::new(&scheduler, &work);
                        scheduler.inner.handlers.reconcile(&cx, host, &render)
                    })
                    .await
                })
            }
            other => other,
        }
    }

    fn spawn_settlement(&self, id: ChoreId, fut: ChoreFuture) {
        let handles = {
            let st = self.inner.state.borrow();
            st.arena.get(id).map(all_handles).unwrap_or_default()
        };
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        tokio::task::spawn_local(async move {
            let outcome = fut.await;
            match weak.upgrade() {
                Some(inner) => Scheduler { inner }.settle_deferred(id, outcome),
                None => {
                    for handle in &handles {
                        handle.settle(Err(ChoreError::SchedulerDropped));
                    }
                }
            }
        });
    }

    fn settle_deferred(&self, id: ChoreId, outcome: ChoreOutcome) {
        self.finish(id, outcome);
        let (running_empty, queue_empty) = {
            let st = self.inner.state.borrow();
            (st.running.is_empty(), st.queue.is_empty())
        };
        if running_empty {
            self.flush();
            self.try_finish_barrier();
        }
        if !queue_empty {
            self.schedule_drain();
        }
    }

    /// Moves a running chore to its terminal state, settles its handles and
    /// releases its dependents (also after a failure).
    fn finish(&self, id: ChoreId, outcome: ChoreOutcome) {
        let chore = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            match st.arena.get(id) {
                Some(c) if c.state == ChoreState::Running => {}
                _ => return,
            }
            remove_id(&mut st.running, id);
            let Some(mut chore) = st.arena.remove(id) else { return };
            unmirror(&mut st.owner_queued, chore.owner(), id);
            chore.state = if outcome.is_ok() {
                ChoreState::Done
            } else {
                ChoreState::Failed
            };
            chore.ended_at = Some(Instant::now());
            chore
        };
        let kind = chore.kind();
        if let Err(error) = &outcome {
            debug!(%id, %kind, %error, "chore failed");
            self.inner.handlers.on_error(error, kind, chore.owner());
        }
        if let (Some(start), Some(end)) = (chore.started_at, chore.ended_at) {
            trace!(%id, %kind, elapsed = ?end.saturating_duration_since(start), "chore finished");
        }
        self.emit(TelemetryEvent::Finished {
            id,
            kind,
            state: chore.state,
        });
        settle_all(&chore, &outcome);
        self.release(chore.blocked_dependents);
    }

    fn flush(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.flushing {
                return;
            }
            st.flushing = true;
        }
        self.inner.handlers.flush();
        {
            let mut st = self.inner.state.borrow_mut();
            st.flushing = false;
            st.last_flush = Instant::now();
        }
        self.emit(TelemetryEvent::Flushed);
    }

    /// Resolves the pending drain barrier if nothing is queued or running.
    fn try_finish_barrier(&self) -> bool {
        let handle = {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            if !st.queue.is_empty() || !st.running.is_empty() {
                return false;
            }
            let Some(id) = st.barrier.take() else {
                return false;
            };
            st.arena.remove(id).map(|c| c.handle)
        };
        let Some(handle) = handle else { return false };
        self.emit(TelemetryEvent::Settled);
        handle.settle(Ok(Value::Null));
        true
    }

    /// Snapshots of queued chores, in execution order.
    pub fn queued(&self) -> Vec<ChoreSummary> {
        let st = self.inner.state.borrow();
        st.summaries(st.queue.iter())
    }

    /// Snapshots of parked chores.
    pub fn parked(&self) -> Vec<ChoreSummary> {
        let st = self.inner.state.borrow();
        st.summaries(st.parked.iter().copied())
    }

    /// Snapshots of running chores.
    pub fn running(&self) -> Vec<ChoreSummary> {
        let st = self.inner.state.borrow();
        st.summaries(st.running.iter().copied())
    }

    /// Number of queued chores.
    pub fn queued_len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    /// Number of parked chores.
    pub fn parked_len(&self) -> usize {
        self.inner.state.borrow().parked.len()
    }

    /// Number of running chores.
    pub fn running_len(&self) -> usize {
        self.inner.state.borrow().running.len()
    }

    /// True when `host` has queued, running or parked chores.
    pub fn has_pending_work(&self, host: HostId) -> bool {
        let st = self.inner.state.borrow();
        st.owner_queued.contains_key(&host) || st.owner_parked.contains_key(&host)
    }
}

fn all_handles(chore: &Chore) -> Vec<ChoreHandle> {
    std::iter::once(chore.handle.clone())
        .chain(chore.merged.iter().cloned())
        .collect()
}

fn settle_all(chore: &Chore, outcome: &ChoreOutcome) {
    for handle in all_handles(chore) {
        handle.settle(outcome.clone());
    }
}
