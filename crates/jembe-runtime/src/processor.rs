//! The request processor.
//!
//! One processor serves one request. It owns the command queue, the
//! live instances, and the DOM record, and drives the cooperative
//! single-threaded loop:
//!
//! ```text
//!   parse request ─▶ seed queue ─▶ drain commands
//!                                     │
//!                 ┌───────────────────┤
//!                 │ Initialise: materialise instance (defaults,
//!                 │   inherited injection, client state, params,
//!                 │   inject hook), then run the guard
//!                 │ CallAction: run handler, flush its emits,
//!                 │   apply the outcome
//!                 │ Emit: match listeners of live instances
//!                 └───────────────────┤
//!                                     ▼
//!            deferred actions ─▶ policy-driven redisplays ─▶ done
//! ```
//!
//! Nothing survives the request: state round-trips through the client.

use crate::command::{Command, XRequest};
use crate::matcher::glob_match;
use crate::router::{url_of, RouteMatch};
use crate::template::{RenderContext, Renderer, RenderServices};
use jembe_component::{
    system, ActionArgs, ActionCtx, ActionOutcome, Event, Instance, InitSources, ListenerDef,
    ListenerOutcome, Registry, RequestContext, DISPLAY_ACTION,
};
use jembe_types::{ErrorCode, ExecName, JembeError};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Client-reported view of one instance.
#[derive(Debug, Clone, Default)]
struct ClientRecord {
    state: Map<String, Value>,
}

/// One live instance plus its per-request bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) instance: Instance,
    /// State the client reported, for change detection; `None` when
    /// the instance was not on the page.
    prev_state: Option<Map<String, Value>>,
    /// Rendered output, once recorded.
    pub(crate) dom: Option<String>,
    /// Snapshot of the non-injected state at the moment `dom` was
    /// recorded; drives re-render decisions.
    dom_state: Option<Value>,
    /// An action ran on this instance this request.
    executed: bool,
    /// Materialised during this request rather than reported by the
    /// client; always included in the response.
    fresh: bool,
    /// A body explicitly suppressed this instance's redisplay.
    suppressed: bool,
    /// `dom` was recorded at least once this request.
    displayed: bool,
}

impl Slot {
    fn on_page(&self) -> bool {
        self.prev_state.is_some()
    }

    fn state_changed(&self) -> bool {
        match &self.prev_state {
            None => true,
            Some(prev) => self.instance.state.to_json() != Value::Object(prev.clone()),
        }
    }
}

/// One queue entry; `force` marks a deferred call released for
/// execution so it is not parked again.
#[derive(Debug, Clone)]
struct Queued {
    command: Command,
    force: bool,
}

/// Per-request command processor.
pub struct Processor<'app> {
    registry: &'app Registry,
    renderer: &'app dyn Renderer,
    request: RequestContext,
    client: BTreeMap<ExecName, ClientRecord>,
    slots: BTreeMap<ExecName, Slot>,
    rendered: Vec<ExecName>,
    queue: VecDeque<Queued>,
    deferred: Vec<Command>,
    cancelled: BTreeSet<ExecName>,
    failure: Option<JembeError>,
}

impl<'app> Processor<'app> {
    /// Creates a processor for one request.
    #[must_use]
    pub fn new(
        registry: &'app Registry,
        renderer: &'app dyn Renderer,
        request: RequestContext,
    ) -> Self {
        Self {
            registry,
            renderer,
            request,
            client: BTreeMap::new(),
            slots: BTreeMap::new(),
            rendered: Vec::new(),
            queue: VecDeque::new(),
            deferred: Vec::new(),
            cancelled: BTreeSet::new(),
            failure: None,
        }
    }

    /// Runs a full-page request from a matched route.
    ///
    /// Seeds an initialise/display chain for every component on the
    /// primary branch, URL-supplied params feeding the matching depth.
    ///
    /// # Errors
    ///
    /// Returns the first error no `_exception` listener handled.
    pub fn run_page(&mut self, matched: &RouteMatch) -> Result<(), JembeError> {
        for prefix in matched.exec_name.prefixes() {
            let params = matched
                .params
                .get(&prefix.full_name())
                .cloned()
                .unwrap_or_default();
            self.enqueue(Command::Init {
                target: prefix.clone(),
                params,
                merge_existing: true,
            });
            self.enqueue(Command::Call {
                target: prefix,
                action: DISPLAY_ACTION.to_string(),
                args: ActionArgs::empty(),
            });
        }
        self.drain()
    }

    /// Runs a partial request.
    ///
    /// Every client-reported instance is re-materialised first (with
    /// injected params refreshed); each command is prefixed by the
    /// initialise chain for whatever part of its branch the client did
    /// not report.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadRequest`] for malformed input and the
    /// first error no `_exception` listener handled.
    pub fn run_partial(&mut self, request: XRequest) -> Result<(), JembeError> {
        let mut reported: Vec<(ExecName, Map<String, Value>)> =
            Vec::with_capacity(request.components.len());
        for wire in request.components {
            reported.push((ExecName::parse(&wire.exec_name)?, wire.state));
        }
        // Parents first, so a child materialises with its ancestors'
        // inject_into_children values live regardless of wire order.
        reported.sort_by_key(|(exec, _)| exec.depth());
        for (exec, state) in reported {
            self.client.insert(exec.clone(), ClientRecord { state });
            self.enqueue(Command::Init {
                target: exec,
                params: Map::new(),
                merge_existing: true,
            });
        }
        let mut scheduled: BTreeSet<ExecName> = self.client.keys().cloned().collect();
        for wire in request.commands {
            let command = wire.into_command()?;
            // An explicit initialise carries its own params; only its
            // ancestors need bootstrapping.
            let mut prefixes = command.target().prefixes();
            if matches!(command, Command::Init { .. }) {
                scheduled.insert(command.target().clone());
                prefixes.pop();
            }
            for prefix in prefixes {
                if scheduled.insert(prefix.clone()) {
                    self.enqueue(Command::Init {
                        target: prefix,
                        params: Map::new(),
                        merge_existing: true,
                    });
                }
            }
            self.enqueue(command);
        }
        self.drain()
    }

    /// Live instances included in the DOM record, in record order.
    #[must_use]
    pub fn rendered(&self) -> &[ExecName] {
        &self.rendered
    }

    pub(crate) fn slot(&self, exec: &ExecName) -> Option<&Slot> {
        self.slots.get(exec)
    }

    /// The registry this processor serves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Browser URL of the deepest rendered component that contributes
    /// to the URL; `/` when nothing does. Ties at equal depth go to the
    /// instance later in depth-first tree order.
    ///
    /// Hosts call this after [`Processor::run_partial`] to push the
    /// history entry that accompanies the patch list.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::Internal`] when a URL param value is
    /// missing from the live state.
    pub fn page_url(&self) -> Result<String, JembeError> {
        let deepest = self
            .rendered
            .iter()
            .filter(|exec| {
                self.registry
                    .lookup(&exec.full_name())
                    .is_some_and(|c| c.changes_url())
            })
            .max_by(|a, b| {
                a.depth()
                    .cmp(&b.depth())
                    .then_with(|| a.as_str().cmp(b.as_str()))
            });
        match deepest {
            Some(exec) => self.url_for_exec(exec),
            None => Ok("/".to_string()),
        }
    }

    /// Browser URL of one live component.
    pub(crate) fn url_for_exec(&self, exec: &ExecName) -> Result<String, JembeError> {
        url_of(self.registry, exec, |prefix, param| {
            self.slots
                .get(prefix)
                .and_then(|slot| slot.instance.state.get(param).cloned())
        })
    }

    fn enqueue(&mut self, command: Command) {
        self.queue.push_back(Queued {
            command,
            force: false,
        });
    }

    fn drain(&mut self) -> Result<(), JembeError> {
        loop {
            while let Some(queued) = self.queue.pop_front() {
                self.execute(queued);
            }
            if !self.deferred.is_empty() {
                self.flush_deferred();
                continue;
            }
            if self.enqueue_redisplays() {
                continue;
            }
            break;
        }
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Moves deferred calls back onto the queue, each component's
    /// ordered by its descriptor's partial order, arrival order kept
    /// otherwise.
    fn flush_deferred(&mut self) {
        let pending = std::mem::take(&mut self.deferred);
        let mut by_target: Vec<(ExecName, Vec<Command>)> = Vec::new();
        for command in pending {
            let target = command.target().clone();
            match by_target.iter_mut().find(|(t, _)| *t == target) {
                Some((_, bucket)) => bucket.push(command),
                None => by_target.push((target, vec![command])),
            }
        }
        for (target, mut bucket) in by_target {
            if let Some(config) = self.registry.lookup(&target.full_name()) {
                let order = config.deferred_order();
                bucket.sort_by_key(|command| match command {
                    Command::Call { action, .. } => {
                        order.iter().position(|n| n == action).unwrap_or(usize::MAX)
                    }
                    _ => usize::MAX,
                });
            }
            for command in bucket {
                self.queue.push_back(Queued {
                    command,
                    force: true,
                });
            }
        }
    }

    /// Applies the redisplay policies; returns `true` when new display
    /// calls were enqueued.
    fn enqueue_redisplays(&mut self) -> bool {
        let mut targets = Vec::new();
        for (exec, slot) in &self.slots {
            if slot.suppressed {
                continue;
            }
            let needs_first_render = slot.fresh && !slot.displayed;
            let policy = slot.instance.config().redisplay();
            let wants = policy.wants(slot.state_changed(), slot.on_page(), slot.executed);
            let stale = match (&slot.dom_state, slot.displayed) {
                (_, false) => true,
                (Some(snapshot), true) => snapshot != &slot.instance.state.to_json(),
                (None, true) => false,
            };
            if (needs_first_render || wants) && stale {
                targets.push(exec.clone());
            }
        }
        for target in &targets {
            self.enqueue(Command::Call {
                target: target.clone(),
                action: DISPLAY_ACTION.to_string(),
                args: ActionArgs::empty(),
            });
        }
        !targets.is_empty()
    }

    fn execute(&mut self, queued: Queued) {
        if self.is_cancelled(queued.command.target()) {
            tracing::debug!(target = %queued.command.target(), "skipping command on cancelled branch");
            return;
        }
        match queued.command {
            Command::Init {
                target,
                params,
                merge_existing,
            } => self.execute_init(&target, &params, merge_existing),
            Command::Call {
                target,
                action,
                args,
            } => self.execute_call(&target, &action, &args, queued.force),
            Command::Emit { source, emit } => {
                let event = emit.into_event(source);
                self.dispatch_event(event);
            }
        }
    }

    fn is_cancelled(&self, target: &ExecName) -> bool {
        self.cancelled
            .iter()
            .any(|c| c == target || c.is_ancestor_of(target))
    }

    fn execute_init(&mut self, target: &ExecName, params: &Map<String, Value>, merge: bool) {
        self.dispatch_event(Event::new(system::INITIALISING, target.clone()));
        match self.materialise(target, params, merge) {
            Ok(()) => {}
            Err(err) => self.handle_failure(target, err),
        }
    }

    fn materialise(
        &mut self,
        target: &ExecName,
        params: &Map<String, Value>,
        merge: bool,
    ) -> Result<(), JembeError> {
        let config = Arc::clone(self.registry.require(&target.full_name())?);
        let mount_defaults = self.mount_defaults(target)?;
        let inherited = inherited_params(&self.slots, target, &self.request);

        let existing_state = self.slots.get(target).map(|slot| {
            match slot.instance.state.to_json() {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        });
        let client_state = if merge {
            existing_state
                .as_ref()
                .or_else(|| self.client.get(target).map(|r| &r.state))
        } else {
            None
        };

        let sources = InitSources {
            mount_defaults: &mount_defaults,
            inherited: &inherited,
            client_state,
            explicit: params,
        };
        let instance = Instance::build(config, target.clone(), &sources, &self.request)?;
        instance.config().run_guard(&instance, &self.request)?;

        let on_client = self.client.get(target).map(|r| r.state.clone());
        match self.slots.get_mut(target) {
            Some(slot) => {
                slot.instance = instance;
            }
            None => {
                let fresh = on_client.is_none();
                self.slots.insert(
                    target.clone(),
                    Slot {
                        instance,
                        prev_state: on_client,
                        dom: None,
                        dom_state: None,
                        executed: false,
                        fresh,
                        suppressed: false,
                        displayed: false,
                    },
                );
            }
        }
        Ok(())
    }

    fn mount_defaults(&self, target: &ExecName) -> Result<Map<String, Value>, JembeError> {
        let Some(parent) = target.parent() else {
            return Ok(Map::new());
        };
        let parent_config = self.registry.require(&parent.full_name())?;
        Ok(parent_config
            .children()
            .get(target.name())
            .map(|mount| mount.defaults.clone())
            .unwrap_or_default())
    }

    fn execute_call(&mut self, target: &ExecName, action: &str, args: &ActionArgs, force: bool) {
        let Some(slot) = self.slots.get(target) else {
            tracing::warn!(target = %target, action, "call on absent instance, skipping");
            return;
        };
        let config = Arc::clone(slot.instance.config());

        if let Some(def) = config.action(action) {
            if def.deferred && !force {
                self.deferred.push(Command::Call {
                    target: target.clone(),
                    action: action.to_string(),
                    args: args.clone(),
                });
                return;
            }
        } else if action != DISPLAY_ACTION {
            self.handle_failure(
                target,
                JembeError::BadRequest(format!(
                    "{target} has no action {action:?}"
                )),
            );
            return;
        }

        self.dispatch_event(
            Event::new(system::CALLED, target.clone())
                .with_param("action", Value::String(action.to_string())),
        );

        if let Some(def) = config.action(action) {
            let handler = Arc::clone(&def.handler);
            let mut ctx = ActionCtx::new(target.clone(), &self.request);
            let result = {
                let Some(slot) = self.slots.get_mut(target) else {
                    return;
                };
                slot.executed = true;
                handler(&mut slot.instance, args, &mut ctx)
            };
            let emits = ctx.take_emits();
            match result {
                Ok(outcome) => self.apply_action_outcome(target, outcome),
                Err(err) => {
                    self.handle_failure(target, err);
                    return;
                }
            }
            for event in emits {
                self.dispatch_event(event);
            }
        } else {
            // Built-in display: render the descriptor's template.
            if let Some(slot) = self.slots.get_mut(target) {
                slot.executed = true;
            }
            if let Err(err) = self.render_instance(target) {
                self.handle_failure(target, err);
            }
        }
    }

    fn apply_action_outcome(&mut self, target: &ExecName, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Dom(dom) => self.record_dom(target, dom),
            ActionOutcome::Suppress => {
                if let Some(slot) = self.slots.get_mut(target) {
                    slot.suppressed = true;
                }
            }
            ActionOutcome::Display => {
                let already = self
                    .slots
                    .get(target)
                    .is_some_and(|slot| slot.displayed);
                if !already {
                    self.enqueue(Command::Call {
                        target: target.clone(),
                        action: DISPLAY_ACTION.to_string(),
                        args: ActionArgs::empty(),
                    });
                }
            }
        }
    }

    fn render_instance(&mut self, target: &ExecName) -> Result<(), JembeError> {
        let instance = match self.slots.get(target) {
            Some(slot) => slot.instance.clone(),
            None => return Ok(()),
        };
        let template = instance.config().template().to_string();
        let mut services = ProbeServices {
            registry: self.registry,
            slots: &self.slots,
            request: &self.request,
        };
        let mut ctx = RenderContext::new(&instance, &mut services);
        let dom = self.renderer.render(&template, &mut ctx)?;
        let commands = ctx.take_commands();
        for command in commands {
            self.enqueue(command);
        }
        self.record_dom(target, dom);
        Ok(())
    }

    fn record_dom(&mut self, target: &ExecName, dom: String) {
        let first = {
            let Some(slot) = self.slots.get_mut(target) else {
                return;
            };
            let first = !slot.displayed;
            slot.dom = Some(dom);
            slot.dom_state = Some(slot.instance.state.to_json());
            slot.displayed = true;
            slot.suppressed = false;
            first
        };
        if first {
            self.rendered.push(target.clone());
            self.dispatch_event(Event::new(system::DISPLAY, target.clone()));
        }
    }

    /// Routes an event to every matching listener of every live
    /// instance, in tree order. Returns whether some listener marked it
    /// handled.
    fn dispatch_event(&mut self, mut event: Event) -> bool {
        let owners: Vec<ExecName> = self.slots.keys().cloned().collect();
        let mut follow_ups = Vec::new();
        for owner in owners {
            let listeners: Vec<ListenerDef> = match self.slots.get(&owner) {
                Some(slot) => slot.instance.config().listeners().to_vec(),
                None => continue,
            };
            for listener in listeners {
                if !listener_matches(&listener, &event, &owner) {
                    continue;
                }
                let mut ctx = ActionCtx::new(owner.clone(), &self.request);
                let outcome = {
                    let Some(slot) = self.slots.get_mut(&owner) else {
                        break;
                    };
                    (listener.handler)(&mut slot.instance, &mut event, &mut ctx)
                };
                follow_ups.extend(ctx.take_emits());
                match outcome {
                    Ok(ListenerOutcome::Pass) => {}
                    Ok(ListenerOutcome::Display) => {
                        let already = self
                            .slots
                            .get(&owner)
                            .is_some_and(|slot| slot.displayed);
                        if !already {
                            self.enqueue(Command::Call {
                                target: owner.clone(),
                                action: DISPLAY_ACTION.to_string(),
                                args: ActionArgs::empty(),
                            });
                        }
                    }
                    Ok(ListenerOutcome::Suppress) => {
                        if let Some(slot) = self.slots.get_mut(&owner) {
                            slot.suppressed = true;
                        }
                    }
                    Ok(ListenerOutcome::Dom(dom)) => self.record_dom(&owner, dom),
                    Err(err) => {
                        tracing::error!(
                            owner = %owner,
                            event = %event.name,
                            error = %err,
                            "listener failed"
                        );
                    }
                }
            }
        }
        for follow_up in follow_ups {
            self.dispatch_event(follow_up);
        }
        event.handled
    }

    /// Routes the error through `_exception`; unhandled errors cancel
    /// the target's branch and become the request's failure.
    fn handle_failure(&mut self, target: &ExecName, err: JembeError) {
        let event = Event::new(system::EXCEPTION, target.clone())
            .with_param("code", Value::String(err.code().to_string()))
            .with_param("status", Value::from(err.status()))
            .with_param("message", Value::String(err.to_string()));
        if self.dispatch_event(event) {
            tracing::debug!(target = %target, error = %err, "exception handled by listener");
            return;
        }
        tracing::warn!(target = %target, code = err.code(), error = %err, "unhandled failure");
        self.cancelled.insert(target.clone());
        self.queue.retain(|queued| {
            !matches!(&queued.command, Command::Call { target: t, .. }
                if t == target || target.is_ancestor_of(t))
        });
        self.deferred.retain(|command| {
            !matches!(command, Command::Call { target: t, .. }
                if t == target || target.is_ancestor_of(t))
        });
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }
}

fn listener_matches(listener: &ListenerDef, event: &Event, owner: &ExecName) -> bool {
    if !listener.accepts_name(&event.name) {
        return false;
    }
    let source_ok = listener.sources.is_empty()
        || listener
            .sources
            .iter()
            .any(|pattern| glob_match(Some(pattern), owner, &event.source));
    if !source_ok {
        return false;
    }
    if let Some(to) = event.to.as_deref() {
        if !glob_match(Some(to), &event.source, owner) {
            return false;
        }
    }
    if let Some(relation) = listener.relation {
        if !relation.matches(owner, &event.source) {
            return false;
        }
    }
    true
}

/// Values `inject_into_children` hooks of live ancestors contribute to
/// `target`, merged root-down so nearer ancestors win.
fn inherited_params(
    slots: &BTreeMap<ExecName, Slot>,
    target: &ExecName,
    request: &RequestContext,
) -> Map<String, Value> {
    let mut merged = Map::new();
    let prefixes = target.prefixes();
    for prefix in &prefixes[..prefixes.len().saturating_sub(1)] {
        if let Some(slot) = slots.get(prefix) {
            let contributed = slot
                .instance
                .config()
                .run_inject_into_children(&slot.instance, request);
            merged.extend(contributed);
        }
    }
    merged
}

/// Read-only processor services reachable from templates.
struct ProbeServices<'p> {
    registry: &'p Registry,
    slots: &'p BTreeMap<ExecName, Slot>,
    request: &'p RequestContext,
}

impl RenderServices for ProbeServices<'_> {
    fn is_accessible(&mut self, exec_name: &ExecName, params: &Map<String, Value>) -> bool {
        let Ok(config) = self.registry.require(&exec_name.full_name()) else {
            return false;
        };
        let mount_defaults = match exec_name.parent() {
            Some(parent) => match self.registry.lookup(&parent.full_name()) {
                Some(parent_config) => parent_config
                    .children()
                    .get(exec_name.name())
                    .map(|mount| mount.defaults.clone())
                    .unwrap_or_default(),
                None => Map::new(),
            },
            None => Map::new(),
        };
        let inherited = inherited_params(self.slots, exec_name, self.request);
        let sources = InitSources {
            mount_defaults: &mount_defaults,
            inherited: &inherited,
            client_state: None,
            explicit: params,
        };
        let probe = Instance::build(
            Arc::clone(config),
            exec_name.clone(),
            &sources,
            self.request,
        )
        .and_then(|instance| instance.config().run_guard(&instance, self.request));
        match probe {
            Ok(()) => true,
            Err(err) if err.is_access_denial() => {
                tracing::debug!(exec_name = %exec_name, error = %err, "speculative initialise denied");
                false
            }
            Err(err) => {
                tracing::warn!(exec_name = %exec_name, error = %err, "speculative initialise failed");
                false
            }
        }
    }

    fn url_for(
        &mut self,
        exec_name: &ExecName,
        params: &Map<String, Value>,
    ) -> Result<String, JembeError> {
        url_of(self.registry, exec_name, |prefix, param| {
            if prefix == exec_name {
                if let Some(value) = params.get(param) {
                    return Some(value.clone());
                }
            }
            if let Some(slot) = self.slots.get(prefix) {
                if let Some(value) = slot.instance.state.get(param) {
                    return Some(value.clone());
                }
            }
            self.registry
                .lookup(&prefix.full_name())
                .and_then(|config| config.state_param(param))
                .and_then(|p| p.default.clone())
        })
    }
}
