//! Exploration engine.
//!
//! Depth-first crawl over an app's screens, driven by an explicit frontier
//! stack rather than recursion. One iteration: pick the best unexplored safe
//! element on the current screen, dispatch the tap, wait (bounded) for the
//! fingerprint to move, then capture whatever screen is actually there.
//! Classification is advisory; fingerprints are the ground truth for
//! identity, so a back action that lands somewhere unexpected re-anchors the
//! frontier on the observed screen instead of trusting the plan.
//!
//! Discovered rows are staged while acting and flushed only after a
//! transition (or a stable no-op) is confirmed, so a crash mid-action never
//! persists a state that was never reached.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appscout_classify::{
    Detection, ElementClassifier, ElementRecord, SafetyClass, ScreenKind, StateClassifier,
};
use appscout_core::{
    BudgetChecker, ElementRow, EventSink, ExploreError, ExplorerConfig, ExplorerEvent,
    PersistBatch, PersistenceSink, StateRow, StopReason,
};
use appscout_snapshot::{fingerprint, Fingerprint, ScreenSnapshot};
use appscout_store::{
    ActionDescriptor, GraphSummary, NavigationEdge, NavigationGraph, ScreenStateStore,
    TransitionWait,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::providers::{ActionResult, SnapshotProvider, UiActionExecutor};
use crate::scroll::{self, has_scrollable};
use crate::stuck::StuckTracker;

/// Where the engine currently is in its loop. Exposed for logging and
/// progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CapturingState,
    Classifying,
    SelectingAction,
    Acting,
    AwaitingTransition,
    Backtracking,
}

/// End-of-session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub app_id: String,
    pub stop_reason: StopReason,
    /// True when every reachable safe element was explored.
    pub complete: bool,
    pub states_discovered: u32,
    pub edges_recorded: u32,
    pub actions_executed: u64,
    pub dangerous_skipped: u32,
    pub elapsed_secs: f64,
    pub summary: GraphSummary,
}

/// Everything a finished engine hands back: the report plus the session's
/// graph, store, and the sink with all flushed rows.
pub struct ExplorationResult<S> {
    pub report: SessionReport,
    pub graph: NavigationGraph,
    pub store: ScreenStateStore,
    pub sink: S,
}

/// One frontier level: a discovered screen and its not-yet-tried elements.
struct FrontierEntry {
    hash: String,
    depth: u32,
    pending: VecDeque<ElementRecord>,
}

pub struct ExplorationEngine<'a, P, E, S> {
    app_id: String,
    config: ExplorerConfig,
    provider: &'a mut P,
    executor: &'a mut E,
    sink: S,
    events: EventSink,
    cancel: Arc<AtomicBool>,
    store: ScreenStateStore,
    graph: NavigationGraph,
    classifier: StateClassifier,
    elements: ElementClassifier,
    rng: ChaCha8Rng,
    stuck: StuckTracker,
    pending: PersistBatch,
    frontier: Vec<FrontierEntry>,
    /// Element ids already acted on (or conclusively skipped) per state, so
    /// re-entering a known state never re-tries them.
    explored: HashMap<String, HashSet<u32>>,
    phase: Phase,
    actions: u64,
    stagnant: u32,
    states_discovered: u32,
    edges_recorded: u32,
    dangerous_skipped: u32,
}

impl<'a, P, E, S> ExplorationEngine<'a, P, E, S>
where
    P: SnapshotProvider,
    E: UiActionExecutor,
    S: PersistenceSink,
{
    pub fn new(
        app_id: &str,
        config: ExplorerConfig,
        provider: &'a mut P,
        executor: &'a mut E,
        sink: S,
        events: EventSink,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let classifier = StateClassifier::new(config.calibration.clone());
        let elements = ElementClassifier::new(config.lexicon.clone());
        let stuck = StuckTracker::new(config.stuck_retry_threshold);
        Self {
            app_id: app_id.to_string(),
            config,
            provider,
            executor,
            sink,
            events,
            cancel,
            store: ScreenStateStore::new(),
            graph: NavigationGraph::new(),
            classifier,
            elements,
            rng,
            stuck,
            pending: PersistBatch::default(),
            frontier: Vec::new(),
            explored: HashMap::new(),
            phase: Phase::Idle,
            actions: 0,
            stagnant: 0,
            states_discovered: 0,
            edges_recorded: 0,
            dangerous_skipped: 0,
        }
    }

    /// Run the session to completion (or budget/cancellation) and hand
    /// everything back.
    pub fn run(mut self) -> Result<ExplorationResult<S>, ExploreError> {
        log::info!("exploring {}", self.app_id);
        let checker = BudgetChecker::new(self.config.budget);

        self.set_phase(Phase::CapturingState);
        let stop_reason = match self.observe() {
            Some((snapshot, fp)) => {
                self.capture_state(&snapshot, &fp, 0);
                self.run_loop(&checker)?
            }
            None => {
                log::warn!("initial snapshot unreadable; nothing to explore");
                StopReason::Stagnated
            }
        };
        self.set_phase(Phase::Idle);

        // Final flush always runs so the completeness flag lands even when
        // nothing else is staged.
        self.pending.session_complete = stop_reason.is_complete();
        self.sink.upsert_batch(&self.pending)?;
        self.pending.clear();

        let summary = self.graph.summary();
        self.events.emit(ExplorerEvent::SessionComplete {
            summary,
            stop_reason,
            complete: stop_reason.is_complete(),
        });
        log::info!(
            "session over: {:?}, {} states, {} edges, {} actions",
            stop_reason,
            self.states_discovered,
            self.edges_recorded,
            self.actions
        );

        let report = SessionReport {
            app_id: self.app_id.clone(),
            stop_reason,
            complete: stop_reason.is_complete(),
            states_discovered: self.states_discovered,
            edges_recorded: self.edges_recorded,
            actions_executed: self.actions,
            dangerous_skipped: self.dangerous_skipped,
            elapsed_secs: checker.elapsed_secs(),
            summary,
        };
        Ok(ExplorationResult {
            report,
            graph: self.graph,
            store: self.store,
            sink: self.sink,
        })
    }

    fn run_loop(&mut self, checker: &BudgetChecker) -> Result<StopReason, ExploreError> {
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(StopReason::Cancelled);
            }
            if let Some(reason) = checker.check(self.actions, self.stagnant) {
                return Ok(reason);
            }
            if self.frontier.is_empty() {
                return Ok(StopReason::Complete);
            }
            if !checker.depth_allowed(self.frontier.len() as u32) {
                log::debug!("depth budget reached, backtracking");
                self.backtrack()?;
                continue;
            }

            self.set_phase(Phase::SelectingAction);
            let Some((from_hash, from_depth, record)) = self.select_element() else {
                // Current screen exhausted.
                self.backtrack()?;
                continue;
            };

            self.explored
                .entry(from_hash.clone())
                .or_default()
                .insert(record.id);

            self.set_phase(Phase::Acting);
            if let ActionResult::Rejected(reason) = self.executor.tap(record.id) {
                log::debug!("tap #{} rejected: {reason}", record.id);
                self.stuck.mark_rejected(&from_hash, record.id);
                continue;
            }
            self.actions += 1;
            self.store.mark_visited(&from_hash);
            // Staged now, flushed only once the outcome is confirmed.
            self.pending
                .elements
                .push(ElementRow::from_record(&from_hash, &record));

            self.set_phase(Phase::AwaitingTransition);
            let wait = {
                let provider = &mut *self.provider;
                self.store.wait_for_transition(
                    &from_hash,
                    &self.config.transition,
                    self.cancel.as_ref(),
                    || provider.snapshot().map(|s| fingerprint(&s)),
                )
            };

            match wait {
                TransitionWait::Cancelled => return Ok(StopReason::Cancelled),
                TransitionWait::TimedOut => {
                    self.stagnant += 1;
                    let exhausted = self.stuck.record_timeout(&from_hash, record.id);
                    if !exhausted {
                        // Eligible for another try later in this screen's
                        // queue.
                        if let Some(set) = self.explored.get_mut(&from_hash) {
                            set.remove(&record.id);
                        }
                        if let Some(entry) = self.frontier.last_mut() {
                            if entry.hash == from_hash {
                                entry.pending.push_back(record);
                            }
                        }
                    }
                    // A stable no-op is a confirmed outcome.
                    self.flush_pending()?;
                }
                TransitionWait::Changed(_) => {
                    self.set_phase(Phase::CapturingState);
                    let Some((snapshot, fp)) = self.observe() else {
                        self.stagnant += 1;
                        continue;
                    };
                    if fp.hash == from_hash {
                        // Flickered and settled back before full capture.
                        self.stagnant += 1;
                        continue;
                    }
                    let created = self.capture_state(&snapshot, &fp, from_depth + 1);
                    if created {
                        self.stagnant = 0;
                    } else {
                        self.stagnant += 1;
                    }
                    self.record_edge(
                        &from_hash,
                        &fp.hash,
                        ActionDescriptor::tap(record.id, record.text.clone()),
                    )?;
                    self.flush_pending()?;
                    if !created {
                        self.adopt_known(&snapshot, &fp, from_depth + 1);
                    }
                }
            }
        }
    }

    /// Pop candidates off the current screen until one is actionable.
    /// Dangerous elements are recorded and skipped; non-productive pairs are
    /// dropped silently. `None` means the screen is a dead end.
    fn select_element(&mut self) -> Option<(String, u32, ElementRecord)> {
        loop {
            let idx = self.frontier.len().checked_sub(1)?;
            let hash = self.frontier[idx].hash.clone();
            let depth = self.frontier[idx].depth;
            let record = self.frontier[idx].pending.pop_front()?;

            if record.classification == SafetyClass::Dangerous {
                self.dangerous_skipped += 1;
                self.explored
                    .entry(hash.clone())
                    .or_default()
                    .insert(record.id);
                let label = record
                    .text
                    .clone()
                    .unwrap_or_else(|| format!("#{}", record.id));
                log::info!("skipping dangerous element {label:?}");
                self.events.emit(ExplorerEvent::DangerousElementSkipped {
                    element_label: label,
                    reason: record.indicators.join(","),
                });
                // Persisted for audit even though it is never tapped.
                self.pending
                    .elements
                    .push(ElementRow::from_record(&hash, &record));
                continue;
            }
            if self.stuck.is_non_productive(&hash, record.id) {
                continue;
            }
            return Some((hash, depth, record));
        }
    }

    /// Dedup-capture the observed screen. On a new state, stages its row and
    /// pushes a frontier entry; loading screens get an empty entry so the
    /// engine backs off instead of poking a half-rendered tree.
    fn capture_state(&mut self, snapshot: &ScreenSnapshot, fp: &Fingerprint, depth: u32) -> bool {
        self.set_phase(Phase::Classifying);
        let detection = self.classifier.classify(snapshot);
        let outcome = self.store.capture(fp, &self.app_id, &detection, depth);
        self.graph.register_state(&fp.hash);
        if !outcome.created {
            return false;
        }

        self.states_discovered += 1;
        self.emit_new_state(fp, &detection);
        self.pending.states.push(StateRow {
            fingerprint: fp.hash.clone(),
            package_id: self.app_id.clone(),
            kind: detection.primary,
            confidence: detection.confidence,
            visited: false,
        });

        if detection.primary == ScreenKind::Loading {
            log::debug!("loading screen {fp}; deferring interaction");
            self.frontier.push(FrontierEntry {
                hash: fp.hash.clone(),
                depth,
                pending: VecDeque::new(),
            });
            return true;
        }
        self.push_frontier_entry(snapshot, fp, depth);
        true
    }

    fn emit_new_state(&self, fp: &Fingerprint, detection: &Detection) {
        self.events.emit(ExplorerEvent::NewStateDiscovered {
            fingerprint: fp.hash.clone(),
            kind: detection.primary,
            confidence: detection.confidence,
        });
    }

    /// Build the element queue for a screen (running scroll discovery when
    /// it carries a scroll container) and push it onto the frontier.
    fn push_frontier_entry(&mut self, snapshot: &ScreenSnapshot, fp: &Fingerprint, depth: u32) {
        let mut records = self.elements.classify_all(snapshot);

        if has_scrollable(snapshot) && self.config.scroll.max_attempts > 0 {
            let outcome = scroll::discover(
                &mut *self.provider,
                &mut *self.executor,
                &self.config.scroll,
                snapshot,
                self.cancel.as_ref(),
            );
            if let Some(extended) = outcome.final_snapshot {
                let visible: HashSet<u32> = records.iter().map(|r| r.id).collect();
                let revealed: Vec<ElementRecord> = self
                    .elements
                    .classify_all(&extended)
                    .into_iter()
                    .filter(|r| !visible.contains(&r.id))
                    .collect();
                if !revealed.is_empty() {
                    log::info!("scroll revealed {} elements on {fp}", revealed.len());
                }
                records.extend(revealed);
            }
        }

        if let Some(done) = self.explored.get(&fp.hash) {
            records.retain(|r| !done.contains(&r.id));
        }
        shuffle_priority_ties(&mut records, &mut self.rng);

        self.frontier.push(FrontierEntry {
            hash: fp.hash.clone(),
            depth,
            pending: records.into(),
        });
    }

    /// Re-anchor on a known state the app just moved to: rewind the frontier
    /// to it if it is on the stack, otherwise re-enter it with whatever
    /// elements remain untried.
    fn adopt_known(&mut self, snapshot: &ScreenSnapshot, fp: &Fingerprint, depth: u32) {
        if let Some(pos) = self.frontier.iter().position(|e| e.hash == fp.hash) {
            self.frontier.truncate(pos + 1);
        } else {
            self.push_frontier_entry(snapshot, fp, depth);
        }
    }

    /// Finish the current screen and physically navigate back. The screen
    /// actually reached wins over the one the stack predicted — including
    /// when the back press is rejected and the device stays where it was;
    /// the frontier must re-anchor on the observed screen either way, or
    /// later taps would be dispatched against the wrong physical screen.
    fn backtrack(&mut self) -> Result<(), ExploreError> {
        self.set_phase(Phase::Backtracking);
        let Some(done) = self.frontier.pop() else {
            return Ok(());
        };
        self.store.mark_visited(&done.hash);
        if self.frontier.is_empty() {
            return Ok(());
        }

        let went_back = match self.executor.back() {
            ActionResult::Rejected(reason) => {
                log::debug!("back rejected: {reason}");
                self.stagnant += 1;
                false
            }
            ActionResult::Accepted => {
                self.actions += 1;
                true
            }
        };

        match self.observe() {
            None => self.stagnant += 1,
            Some((snapshot, fp)) => {
                let depth = self.frontier.len() as u32;
                let created = self.capture_state(&snapshot, &fp, depth);
                if went_back {
                    self.record_edge(&done.hash, &fp.hash, ActionDescriptor::back())?;
                }
                if created {
                    self.stagnant = 0;
                } else {
                    self.adopt_known(&snapshot, &fp, depth);
                }
                self.flush_pending()?;
            }
        }
        Ok(())
    }

    fn record_edge(
        &mut self,
        from: &str,
        to: &str,
        action: ActionDescriptor,
    ) -> Result<(), ExploreError> {
        if self.graph.add_edge(from, to, action.clone())? {
            self.edges_recorded += 1;
            self.events.emit(ExplorerEvent::EdgeRecorded {
                from: from.to_string(),
                to: to.to_string(),
                action: action.to_string(),
            });
            self.pending.edges.push(NavigationEdge {
                from: from.to_string(),
                to: to.to_string(),
                action,
            });
        }
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<(), ExploreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.sink.upsert_batch(&self.pending)?;
        self.pending.clear();
        Ok(())
    }

    /// Snapshot with bounded retries over transient unreadability.
    fn observe(&mut self) -> Option<(ScreenSnapshot, Fingerprint)> {
        for attempt in 0..=self.config.observation_retries {
            if let Some(snapshot) = self.provider.snapshot() {
                let fp = fingerprint(&snapshot);
                return Some((snapshot, fp));
            }
            log::debug!("snapshot unreadable (attempt {attempt})");
            std::thread::sleep(Duration::from_millis(self.config.transition.poll_interval_ms));
        }
        None
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            log::trace!("phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

/// Shuffle runs of equal priority so exploration order within a band is
/// unbiased but reproducible under the session seed.
fn shuffle_priority_ties(records: &mut [ElementRecord], rng: &mut ChaCha8Rng) {
    let mut start = 0;
    while start < records.len() {
        let priority = records[start].priority;
        let mut end = start + 1;
        while end < records.len() && records[end].priority == priority {
            end += 1;
        }
        records[start..end].shuffle(rng);
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appscout_snapshot::NodeRole;

    fn record(id: u32, priority: i32) -> ElementRecord {
        ElementRecord {
            id,
            role: NodeRole::Button,
            text: None,
            bounds: appscout_snapshot::Bounds::default(),
            classification: SafetyClass::Safe,
            confidence: 0.7,
            indicators: Vec::new(),
            priority,
        }
    }

    #[test]
    fn test_shuffle_preserves_priority_bands() {
        let mut records = vec![
            record(1, 50),
            record(2, 50),
            record(3, 50),
            record(4, 10),
            record(5, 10),
            record(6, 0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        shuffle_priority_ties(&mut records, &mut rng);

        let priorities: Vec<i32> = records.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![50, 50, 50, 10, 10, 0]);
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let base = vec![record(1, 50), record(2, 50), record(3, 50), record(4, 50)];
        let mut a = base.clone();
        let mut b = base;
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        shuffle_priority_ties(&mut a, &mut rng_a);
        shuffle_priority_ties(&mut b, &mut rng_b);
        let ids_a: Vec<u32> = a.iter().map(|r| r.id).collect();
        let ids_b: Vec<u32> = b.iter().map(|r| r.id).collect();
        assert_eq!(ids_a, ids_b);
    }
}
