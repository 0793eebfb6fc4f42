//! # Workflow Runner
//!
//! Executes one run of the medal workflow: walks the DAG in topological
//! order, drives every step through its [`StepStateMachine`], resolves fan-in
//! with each step's [`JoinCondition`], and produces a [`RunReport`].
//!
//! ## Skipping and failure propagation
//!
//! - A step that a Route step did not select is skipped, whatever its join
//!   condition says.
//! - Any other step asks its join condition: run, skip, or become
//!   `upstream_failed`.
//! - The first failing step decides the run outcome. Steps after it are still
//!   visited so every step ends in a terminal state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medal_workflow::config::ConfigManager;
//! use medal_workflow::orchestration::WorkflowRunner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let runner = WorkflowRunner::from_config_manager(&manager).await?;
//!
//! let report = runner.run().await?;
//! println!("{} finished: {:?}", report.run_id, report.outcome);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::aggregator::Aggregator;
use super::clock::{Clock, SystemClock};
use super::dag::{StepKind, StepNode, WorkflowDag};
use super::freshness::{FreshnessChecker, FreshnessPolicy, SensorState};
use super::handoff::HandOff;
use super::join::JoinDecision;
use super::joiner::Joiner;
use super::router;
use super::selector::{RandomSelector, SelectionSource};
use crate::config::{ConfigManager, WorkflowConfig};
use crate::database::{DatabaseConnection, MedalStore, PgMedalStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::events::{EventPublisher, WorkflowEvent};
use crate::logging::{log_error, log_run_operation, log_step_operation};
use crate::models::{AggregateRecord, BranchId};
use crate::state_machine::{StepEvent, StepState, StepStateMachine, StepTransition};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    /// A provisioning or aggregation step failed
    StepFailed { step: String, reason: String },
    /// The freshness check never saw a recent record
    FreshnessTimedOut {
        attempts: u32,
        waited: Duration,
        window: Duration,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Final state of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step_id: String,
    pub state: StepState,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub transitions: Vec<StepTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow: String,
    /// Labels from `workflow.tags`
    pub tags: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Value the Selector emitted
    pub selection: Option<String>,
    /// Branch the Router picked, `None` when the selection named no category
    pub branch: Option<BranchId>,
    /// Steps in execution order
    pub steps: Vec<StepReport>,
    /// Record inserted by the selected aggregator
    pub record: Option<AggregateRecord>,
    /// Terminal state of the freshness sensor, when it ran
    pub freshness: Option<SensorState>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn step(&self, step_id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.step_id == step_id)
    }

    pub fn state_of(&self, step_id: &str) -> Option<StepState> {
        self.step(step_id).map(|step| step.state)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Turn a failed outcome into the matching [`WorkflowError`]
    pub fn into_result(self) -> WorkflowResult<RunReport> {
        let error = match &self.outcome {
            RunOutcome::Succeeded => None,
            RunOutcome::StepFailed { step, reason } => {
                Some(WorkflowError::step_failed(step.clone(), reason))
            }
            RunOutcome::FreshnessTimedOut {
                attempts,
                waited,
                window,
            } => Some(WorkflowError::FreshnessTimeout {
                attempts: *attempts,
                waited: *waited,
                window: *window,
            }),
        };
        match error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

pub struct WorkflowRunner {
    config: WorkflowConfig,
    dag: WorkflowDag,
    store: Arc<dyn MedalStore>,
    selector: Arc<dyn SelectionSource>,
    clock: Arc<dyn Clock>,
    publisher: EventPublisher,
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("workflow", &self.dag.name())
            .field("steps", &self.dag.steps().len())
            .finish()
    }
}

impl WorkflowRunner {
    /// Validate `config` and build the medal workflow over `store`.
    /// Defaults to a random selector and the system clock.
    pub fn new(config: WorkflowConfig, store: Arc<dyn MedalStore>) -> WorkflowResult<Self> {
        config.validate()?;
        let dag = WorkflowDag::medal_workflow(config.workflow.name.clone())?;
        dag.topological_order()?;
        let publisher = EventPublisher::new(config.events.capacity);

        Ok(Self {
            config,
            dag,
            store,
            selector: Arc::new(RandomSelector::new()),
            clock: Arc::new(SystemClock),
            publisher,
        })
    }

    /// Connect to PostgreSQL using the managed configuration
    pub async fn from_config_manager(manager: &ConfigManager) -> WorkflowResult<Self> {
        let config = manager.config().clone();
        config.validate()?;

        let connection = DatabaseConnection::connect(&config.database).await?;
        let store = PgMedalStore::new(connection.pool().clone(), &config.output, &config.source);

        info!(
            environment = %manager.environment(),
            workflow = %config.workflow.name,
            "Workflow runner connected"
        );
        Self::new(config, Arc::new(store))
    }

    pub fn with_selector(mut self, selector: Arc<dyn SelectionSource>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn dag(&self) -> &WorkflowDag {
        &self.dag
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Execute one run. Step failures end up in the report's outcome;
    /// `Err` is reserved for failures of the runner itself.
    #[instrument(skip(self), fields(workflow = %self.dag.name()))]
    pub async fn run(&self) -> WorkflowResult<RunReport> {
        let mut run = RunContext::new(self.clock.now());
        let run_id = run.run_id.to_string();
        let workflow = self.dag.name().to_string();
        let tags = self.config.workflow.tags.clone();

        log_run_operation("run", &run_id, &workflow, "started", None);
        debug!(run_id = %run_id, tags = ?tags, "Run tags");
        self.publish(WorkflowEvent::RunStarted {
            run_id: run.run_id,
            workflow: workflow.clone(),
            tags: tags.clone(),
        })
        .await;

        for node in self.dag.topological_order()? {
            self.visit(node, &mut run).await?;
        }

        let outcome = run.failure.take().unwrap_or(RunOutcome::Succeeded);
        let finished_at = self.clock.now();

        let steps = self
            .dag
            .topological_order()?
            .into_iter()
            .filter_map(|node| run.machines.remove(&node.id))
            .map(|machine| StepReport {
                step_id: machine.step_id().to_string(),
                state: machine.current_state(),
                output: machine.output().cloned(),
                error: machine
                    .transitions()
                    .iter()
                    .rev()
                    .find_map(|transition| transition.error_message.clone()),
                transitions: machine.transitions().to_vec(),
            })
            .collect();

        let report = RunReport {
            run_id: run.run_id,
            workflow: workflow.clone(),
            tags,
            started_at: run.started_at,
            finished_at,
            selection: run.selection,
            branch: run.branch,
            steps,
            record: run.record,
            freshness: run.freshness,
            outcome,
        };

        let outcome = report.outcome.clone();
        if report.is_success() {
            log_run_operation("run", &run_id, &workflow, "completed", None);
            self.publish(WorkflowEvent::RunCompleted {
                run_id: report.run_id,
                outcome,
            })
            .await;
        } else {
            let details = serde_json::to_string(&outcome)?;
            log_run_operation("run", &run_id, &workflow, "failed", Some(&details));
            self.publish(WorkflowEvent::RunFailed {
                run_id: report.run_id,
                outcome,
            })
            .await;
        }

        Ok(report)
    }

    async fn visit(&self, node: &StepNode, run: &mut RunContext) -> WorkflowResult<()> {
        let mut machine = StepStateMachine::new(node.id.clone());
        let run_id = run.run_id.to_string();

        match self.decide(node, run)? {
            JoinDecision::Run => {}
            JoinDecision::Skip => {
                machine.transition(StepEvent::Skip, self.clock.now())?;
                log_step_operation("step", &run_id, &node.id, "skipped", None);
                self.publish(WorkflowEvent::StepSkipped {
                    run_id: run.run_id,
                    step: node.id.clone(),
                })
                .await;
                run.machines.insert(node.id.clone(), machine);
                return Ok(());
            }
            JoinDecision::UpstreamFailed => {
                machine.transition(StepEvent::UpstreamFail, self.clock.now())?;
                log_step_operation("step", &run_id, &node.id, "upstream_failed", None);
                self.publish(WorkflowEvent::StepUpstreamFailed {
                    run_id: run.run_id,
                    step: node.id.clone(),
                })
                .await;
                run.machines.insert(node.id.clone(), machine);
                return Ok(());
            }
            JoinDecision::Wait => {
                return Err(WorkflowError::Internal(format!(
                    "Step {} visited before its predecessors finished",
                    node.id
                )));
            }
        }

        machine.transition(StepEvent::Start, self.clock.now())?;
        log_step_operation("step", &run_id, &node.id, "running", None);
        self.publish(WorkflowEvent::StepStarted {
            run_id: run.run_id,
            step: node.id.clone(),
        })
        .await;

        match self.execute(node, run).await {
            Ok(output) => {
                let event = match output.clone() {
                    Some(value) => StepEvent::succeed_with_output(value),
                    None => StepEvent::Succeed(None),
                };
                machine.transition(event, self.clock.now())?;
                log_step_operation("step", &run_id, &node.id, "success", None);
                self.publish(WorkflowEvent::StepSucceeded {
                    run_id: run.run_id,
                    step: node.id.clone(),
                    output,
                })
                .await;
            }
            Err(error) => {
                let reason = error.to_string();
                machine.transition(StepEvent::fail_with_error(reason.clone()), self.clock.now())?;
                log_error("workflow_runner", &node.id, &reason, Some(&run_id));
                self.publish(WorkflowEvent::StepFailed {
                    run_id: run.run_id,
                    step: node.id.clone(),
                    error: reason,
                })
                .await;
                run.record_failure(&node.id, error);
            }
        }

        run.machines.insert(node.id.clone(), machine);
        Ok(())
    }

    /// Branch selection first, then the step's join condition
    fn decide(&self, node: &StepNode, run: &RunContext) -> WorkflowResult<JoinDecision> {
        let upstream = self.dag.upstream_of(&node.id);
        let mut states = Vec::with_capacity(upstream.len());

        for parent in upstream {
            let state = run.state_of(parent);
            if state == StepState::Success {
                if let Some(choice) = run.branch_choices.get(parent) {
                    if choice.as_deref() != Some(node.id.as_str()) {
                        debug!(step = %node.id, router = %parent, "Branch not selected");
                        return Ok(JoinDecision::Skip);
                    }
                }
            }
            states.push(state);
        }

        Ok(node.join_condition.evaluate(&states))
    }

    async fn execute(&self, node: &StepNode, run: &mut RunContext) -> WorkflowResult<Option<Value>> {
        match node.kind {
            StepKind::CreateSchema => {
                self.store.create_schema().await?;
                Ok(None)
            }
            StepKind::CreateTable => {
                self.store.create_table().await?;
                Ok(None)
            }
            StepKind::Select => {
                let selection = self.selector.emit();
                info!(step = %node.id, selection = %selection, "Selection emitted");
                let value = Value::String(selection.clone());
                run.handoff.push_return(&node.id, value.clone());
                run.selection = Some(selection);
                Ok(Some(value))
            }
            StepKind::Route => {
                let selection = self
                    .dag
                    .upstream_of(&node.id)
                    .iter()
                    .find_map(|parent| run.handoff.pull_return(parent))
                    .unwrap_or(Value::Null);

                let downstream = self.dag.downstream_of(&node.id);
                let branch = router::route_value(&selection)
                    .filter(|branch| downstream.iter().any(|id| id == branch.as_str()));

                run.branch_choices.insert(
                    node.id.clone(),
                    branch.map(|branch| branch.as_str().to_string()),
                );
                run.branch = branch;

                match branch {
                    Some(branch) => {
                        info!(step = %node.id, branch = %branch, "Branch selected");
                        self.publish(WorkflowEvent::BranchSelected {
                            run_id: run.run_id,
                            branch,
                        })
                        .await;
                    }
                    None => {
                        warn!(step = %node.id, selection = %selection, "No branch matches the selection");
                        self.publish(WorkflowEvent::NoBranchSelected {
                            run_id: run.run_id,
                            selection,
                        })
                        .await;
                    }
                }
                Ok(Some(json!(branch)))
            }
            StepKind::Aggregate(category) => {
                let record = Aggregator::new(category)
                    .execute(self.store.as_ref(), self.clock.as_ref())
                    .await?;
                let output = serde_json::to_value(&record)?;
                run.record = Some(record);
                Ok(Some(output))
            }
            StepKind::Join => {
                Joiner::from_config(&self.config.join)
                    .run(self.clock.as_ref())
                    .await;
                Ok(None)
            }
            StepKind::CheckFreshness => {
                let policy = FreshnessPolicy::from_config(&self.config.freshness);
                let state = FreshnessChecker::new(policy)
                    .with_publisher(self.publisher.clone())
                    .run(self.store.as_ref(), self.clock.as_ref())
                    .await?;
                run.freshness = Some(state.clone());

                match state {
                    SensorState::TimedOut {
                        attempts, elapsed, ..
                    } => Err(WorkflowError::FreshnessTimeout {
                        attempts,
                        waited: elapsed,
                        window: policy.window,
                    }),
                    state => Ok(Some(serde_json::to_value(&state)?)),
                }
            }
        }
    }

    async fn publish(&self, event: WorkflowEvent) {
        let name = event.name();
        if let Err(e) = self.publisher.publish(event).await {
            warn!(event = name, error = %e, "Failed to publish lifecycle event");
        }
    }
}

/// Mutable state of one run
struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    machines: HashMap<String, StepStateMachine>,
    handoff: HandOff,
    /// Route step id -> the downstream step it selected
    branch_choices: HashMap<String, Option<String>>,
    selection: Option<String>,
    branch: Option<BranchId>,
    record: Option<AggregateRecord>,
    freshness: Option<SensorState>,
    failure: Option<RunOutcome>,
}

impl RunContext {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            machines: HashMap::new(),
            handoff: HandOff::new(),
            branch_choices: HashMap::new(),
            selection: None,
            branch: None,
            record: None,
            freshness: None,
            failure: None,
        }
    }

    fn state_of(&self, step_id: &str) -> StepState {
        self.machines
            .get(step_id)
            .map(StepStateMachine::current_state)
            .unwrap_or_default()
    }

    /// Keep the first failure; later ones are consequences
    fn record_failure(&mut self, step_id: &str, error: WorkflowError) {
        if self.failure.is_some() {
            return;
        }
        self.failure = Some(match error {
            WorkflowError::FreshnessTimeout {
                attempts,
                waited,
                window,
            } => RunOutcome::FreshnessTimedOut {
                attempts,
                waited,
                window,
            },
            other => RunOutcome::StepFailed {
                step: step_id.to_string(),
                reason: other.to_string(),
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::steps;
    use crate::database::InMemoryMedalStore;
    use crate::models::Category;
    use crate::orchestration::clock::ManualClock;
    use crate::orchestration::selector::FixedSelection;

    fn runner_with(selection: &str, store: Arc<InMemoryMedalStore>, clock: &ManualClock) -> WorkflowRunner {
        WorkflowRunner::new(WorkflowConfig::default(), store)
            .unwrap()
            .with_selector(Arc::new(FixedSelection::new(selection)))
            .with_clock(Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_gold_run_succeeds() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(
            InMemoryMedalStore::new().with_source_counts([(Category::Gold, 9)]),
        );

        let report = runner_with("Gold", store.clone(), &clock).run().await.unwrap();

        assert!(report.is_success(), "{:?}", report.outcome);
        assert_eq!(report.selection.as_deref(), Some("Gold"));
        assert_eq!(report.branch.map(|b| b.category()), Some(Category::Gold));
        assert_eq!(report.state_of(steps::CALC_GOLD), Some(StepState::Success));
        assert_eq!(report.state_of(steps::CALC_BRONZE), Some(StepState::Skipped));
        assert_eq!(report.state_of(steps::CALC_SILVER), Some(StepState::Skipped));
        assert_eq!(report.record.as_ref().map(|r| r.count), Some(9));
        assert!(report.freshness.as_ref().is_some_and(SensorState::is_satisfied));
        assert_eq!(store.records().len(), 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(15)]);
    }

    #[tokio::test]
    async fn test_report_lists_steps_in_execution_order() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(InMemoryMedalStore::new());

        let report = runner_with("Bronze", store, &clock).run().await.unwrap();
        let ids: Vec<&str> = report.steps.iter().map(|s| s.step_id.as_str()).collect();

        assert_eq!(ids.first(), Some(&steps::CREATE_SCHEMA));
        assert_eq!(ids.last(), Some(&steps::CHECK_CORRECTNESS));
        assert_eq!(ids.len(), 9);
        assert!(report.steps.iter().all(|s| s.state.is_terminal()));
    }

    #[tokio::test]
    async fn test_ddl_failure_fails_every_later_step() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(
            InMemoryMedalStore::new().failing_ddl("permission denied"),
        );

        let report = runner_with("Gold", store, &clock).run().await.unwrap();

        assert_eq!(report.state_of(steps::CREATE_SCHEMA), Some(StepState::Failed));
        for step in [
            steps::CREATE_TABLE,
            steps::PICK_MEDAL,
            steps::PICK_MEDAL_TASK,
            steps::GENERATE_DELAY,
            steps::CHECK_CORRECTNESS,
        ] {
            assert_eq!(report.state_of(step), Some(StepState::UpstreamFailed), "{step}");
        }
        assert!(matches!(
            report.outcome,
            RunOutcome::StepFailed { ref step, .. } if step == steps::CREATE_SCHEMA
        ));
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_into_result_maps_outcomes() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(InMemoryMedalStore::new());

        let err = runner_with("Platinum", store, &clock)
            .run()
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(err.is_freshness_timeout());
    }

    #[test]
    fn test_new_builds_the_medal_workflow_from_config() {
        let mut config = WorkflowConfig::default();
        config.workflow.name = "nightly_medals".to_string();

        let runner = WorkflowRunner::new(config, Arc::new(InMemoryMedalStore::new())).unwrap();

        assert_eq!(runner.config().workflow.name, "nightly_medals");
        assert_eq!(runner.dag().name(), "nightly_medals");
        assert_eq!(runner.dag().steps().len(), 9);
        assert_eq!(runner.event_publisher().subscriber_count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = WorkflowConfig::default();
        config.output.table = "games; DROP TABLE".to_string();

        let store = Arc::new(InMemoryMedalStore::new());
        assert!(WorkflowRunner::new(config, store).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range_timings() {
        let mut window = WorkflowConfig::default();
        window.freshness.window_seconds = 10_000_000_000_000;
        assert!(WorkflowRunner::new(window, Arc::new(InMemoryMedalStore::new())).is_err());

        let mut poke = WorkflowConfig::default();
        poke.freshness.poke_interval_seconds = u64::MAX;
        assert!(WorkflowRunner::new(poke, Arc::new(InMemoryMedalStore::new())).is_err());

        let mut pause = WorkflowConfig::default();
        pause.join.pause_seconds = u64::MAX;
        assert!(WorkflowRunner::new(pause, Arc::new(InMemoryMedalStore::new())).is_err());
    }

    #[tokio::test]
    async fn test_record_is_stamped_by_the_runner_clock() {
        // far from the host's wall clock, so any other time source would be stale
        let start = Utc::now() - chrono::Duration::days(365);
        let clock = ManualClock::new(start);
        let store = Arc::new(InMemoryMedalStore::new());

        let report = runner_with("Silver", store.clone(), &clock).run().await.unwrap();

        assert!(report.is_success(), "{:?}", report.outcome);
        assert_eq!(store.records()[0].created_at, start);
        assert!(matches!(
            report.freshness,
            Some(SensorState::Satisfied { observed, .. }) if observed == start
        ));
    }

    #[tokio::test]
    async fn test_report_and_start_event_carry_tags() {
        let clock = ManualClock::new(Utc::now());
        let mut config = WorkflowConfig::default();
        config.workflow.tags = vec!["medals".to_string(), "nightly".to_string()];

        let runner = WorkflowRunner::new(config, Arc::new(InMemoryMedalStore::new()))
            .unwrap()
            .with_selector(Arc::new(FixedSelection::new("Bronze")))
            .with_clock(Arc::new(clock.clone()));
        let mut receiver = runner.event_publisher().subscribe();
        let report = runner.run().await.unwrap();

        assert_eq!(report.tags, vec!["medals", "nightly"]);
        match receiver.try_recv().unwrap().event {
            WorkflowEvent::RunStarted { run_id, tags, .. } => {
                assert_eq!(run_id, report.run_id);
                assert_eq!(tags, vec!["medals", "nightly"]);
            }
            other => panic!("expected run start, got {other:?}"),
        }
    }
}
