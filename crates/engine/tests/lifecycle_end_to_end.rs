use std::sync::{Arc, Mutex, Weak};

use cogwork_engine::{
    ActionBehavior, ActionCatalog, ActionDefinition, ApplicationHandle, ActionContext, ActionDescriptor, ActionState, DisposeOrder, EngineConfig, FailurePolicy, FnFactory,
    ParameterKind, ParameterSpec, ResourceHandle, ResourceRegistry, RunContext, RunReport, WorkflowDocument, WorkflowRun,
};
use cogwork_types::{ActionError, AskKind, AskResult, HostCallbacks, MessageLevel, Value};

struct Spreadsheet;

impl ApplicationHandle for Spreadsheet {
    fn shutdown(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Default)]
struct Journal {
    events: Mutex<Vec<String>>,
    /// Observed without keeping the handle alive.
    handles: Mutex<Vec<Weak<dyn ApplicationHandle>>>,
}

impl Journal {
    fn record(&self, phase: &str, context: &ActionContext<'_>) {
        self.events.lock().unwrap().push(format!("{phase}:{}", context.name()));
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, phase: &str, action: &str) -> usize {
        let wanted = format!("{phase}:{action}");
        self.events().iter().filter(|event| **event == wanted).count()
    }
}

/// Records every phase; `set_cell` writes `value` into the variable named by `cell`.
struct Recorded {
    journal: Arc<Journal>,
}

impl ActionBehavior for Recorded {
    fn init(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        self.journal.record("init", context);
        if let Some(handle) = context.resource() {
            self.journal.handles.lock().unwrap().push(Arc::downgrade(handle));
        }
        Ok(())
    }

    fn execute(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        self.journal.record("do", context);
        if context.descriptor().parameter("cell").is_some() {
            let cell = context.text_param("cell")?;
            let value = context.param("value")?;
            context.variables_mut().set(cell, value);
        }
        Ok(())
    }

    fn cleanup(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        self.journal.record("cleanup", context);
        Ok(())
    }

    fn dispose(&mut self, context: &mut ActionContext<'_>) -> Result<(), ActionError> {
        self.journal.record("dispose", context);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHost {
    warnings: Mutex<Vec<String>>,
}

impl HostCallbacks for RecordingHost {
    fn message(&self, text: &str, level: MessageLevel) {
        if level == MessageLevel::Warning {
            self.warnings.lock().unwrap().push(text.to_string());
        }
    }

    fn ask(&self, _question: &str, _title: &str, _kind: AskKind) -> AskResult {
        AskResult::Cancel
    }
}

struct Harness {
    journal: Arc<Journal>,
    registry: Arc<ResourceRegistry>,
    host: Arc<RecordingHost>,
    catalog: ActionCatalog,
}

impl Harness {
    fn new() -> Self {
        cogwork_util::init_test_tracing();
        let journal = Arc::new(Journal::default());
        let registry = Arc::new(ResourceRegistry::new());
        registry
            .register(Arc::new(FnFactory::new("sheet", || -> Result<ResourceHandle, String> {
                Ok(Arc::new(Spreadsheet) as ResourceHandle)
            })))
            .unwrap();

        let mut catalog = ActionCatalog::new();
        let open_journal = journal.clone();
        catalog
            .register(ActionDescriptor::new("open_workbook").with_family("sheet"), move || {
                Box::new(Recorded {
                    journal: open_journal.clone(),
                })
            })
            .unwrap();
        let set_journal = journal.clone();
        catalog
            .register(
                ActionDescriptor::new("set_cell")
                    .with_family("sheet")
                    .with_parameter(ParameterSpec::new("cell", ParameterKind::VariableName).required())
                    .with_parameter(ParameterSpec::new("value", ParameterKind::Any).required()),
                move || {
                    Box::new(Recorded {
                        journal: set_journal.clone(),
                    })
                },
            )
            .unwrap();

        Self {
            journal,
            registry,
            host: Arc::new(RecordingHost::default()),
            catalog,
        }
    }

    fn run(&self, yaml: &str, config: EngineConfig) -> (WorkflowRun, RunReport) {
        let document: WorkflowDocument = yaml.parse().expect("workflow parses");
        let context = RunContext::new(self.registry.clone(), self.host.clone());
        let mut run = WorkflowRun::from_document(&document, &self.catalog, context, config).expect("actions instantiate");
        let report = run.execute();
        (run, report)
    }
}

const THREE_STEPS: &str = r#"
workflow: fill-sheet
variables:
  base: 40
actions:
  - kind: open_workbook
    name: Open
  - kind: set_cell
    name: Broken
    parameters:
      cell: B1
      value: "{1/0}"
  - kind: set_cell
    name: Answer
    parameters:
      cell: A1
      value: "{base + 2}"
"#;

fn keep_resources() -> EngineConfig {
    EngineConfig {
        quit_resources_on_finish: false,
        ..EngineConfig::default()
    }
}

#[test]
fn later_actions_share_the_handle_constructed_by_earlier_ones() {
    let harness = Harness::new();
    let yaml = r#"
actions:
  - kind: open_workbook
    name: Open
  - kind: set_cell
    name: Write
    parameters:
      cell: "{'result'}"
      value: "{2 * 21}"
"#;
    let (run, report) = harness.run(yaml, keep_resources());

    assert!(report.succeeded(), "report: {report:?}");
    assert_eq!(run.context().variables.get("result"), Some(&Value::Integer(42)));

    let handles = harness.journal.handles.lock().unwrap();
    assert_eq!(handles.len(), 2);
    assert!(Weak::ptr_eq(&handles[0], &handles[1]));
    assert_eq!(harness.registry.constructions("sheet"), 1);
    assert!(harness.registry.is_live("sheet"));
}

#[test]
fn evaluation_failure_fails_the_action_skips_cleanup_and_still_disposes() {
    let harness = Harness::new();
    let (run, report) = harness.run(THREE_STEPS, EngineConfig::default());

    let broken = &report.actions[1];
    assert_eq!(broken.state, ActionState::Failed);
    let message = broken.error.as_deref().expect("error recorded");
    assert!(message.starts_with("Interpolation evaluation error in 'Broken'"), "message: {message}");
    assert!(message.contains("division by zero"));

    assert_eq!(harness.journal.count("do", "Broken"), 1);
    assert_eq!(harness.journal.count("cleanup", "Broken"), 0);
    assert_eq!(harness.journal.count("dispose", "Broken"), 1);
    assert!(!run.context().variables.contains("B1"));

    let warnings = harness.host.warnings.lock().unwrap();
    assert!(warnings.iter().any(|warning| warning.contains("division by zero")));
}

#[test]
fn halt_policy_skips_remaining_actions_but_disposes_all() {
    let harness = Harness::new();
    let (run, report) = harness.run(THREE_STEPS, EngineConfig::default());

    assert!(!report.succeeded());
    let answer = &report.actions[2];
    assert!(answer.skipped());
    assert_eq!(answer.state, ActionState::Created);
    assert_eq!(harness.journal.count("init", "Answer"), 0);
    assert_eq!(harness.journal.count("dispose", "Answer"), 1);
    assert!(!run.context().variables.contains("A1"));

    assert_eq!(
        harness.journal.events().iter().filter(|event| event.starts_with("dispose:")).cloned().collect::<Vec<_>>(),
        vec!["dispose:Answer", "dispose:Broken", "dispose:Open"]
    );
    assert!(!harness.registry.is_live("sheet"));
}

#[test]
fn continue_policy_runs_every_action_in_forward_dispose_order() {
    let harness = Harness::new();
    let config = EngineConfig {
        failure_policy: FailurePolicy::Continue,
        dispose_order: DisposeOrder::Forward,
        ..keep_resources()
    };
    let (run, report) = harness.run(THREE_STEPS, config);

    assert_eq!(report.failed_actions().count(), 1);
    assert_eq!(report.actions[2].state, ActionState::Cleaned);
    assert_eq!(run.context().variables.get("A1"), Some(&Value::Integer(42)));

    assert_eq!(
        harness.journal.events().iter().filter(|event| event.starts_with("dispose:")).cloned().collect::<Vec<_>>(),
        vec!["dispose:Open", "dispose:Broken", "dispose:Answer"]
    );
    assert!(harness.registry.is_live("sheet"));
}

#[test]
fn missing_required_parameter_fails_init_before_do() {
    let harness = Harness::new();
    let yaml = r#"
actions:
  - kind: set_cell
    name: Incomplete
    parameters:
      cell: C3
"#;
    let (_, report) = harness.run(yaml, EngineConfig::default());

    let incomplete = &report.actions[0];
    assert_eq!(incomplete.state, ActionState::Failed);
    assert!(incomplete.error.as_deref().unwrap_or_default().contains("missing required parameter 'value'"));
    assert_eq!(harness.journal.count("init", "Incomplete"), 0);
    assert_eq!(harness.journal.count("do", "Incomplete"), 0);
    assert_eq!(harness.journal.count("dispose", "Incomplete"), 1);
    assert_eq!(harness.registry.constructions("sheet"), 0);
}

#[test]
fn workflow_files_load_from_disk() {
    let harness = Harness::new();
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("fill.yaml");
    std::fs::write(&path, THREE_STEPS).unwrap();

    let document = WorkflowDocument::from_path(&path).unwrap();
    assert_eq!(document.name(), "fill-sheet");

    let context = RunContext::new(harness.registry.clone(), harness.host.clone());
    let run = WorkflowRun::from_document(&document, &harness.catalog, context, EngineConfig::default()).unwrap();
    assert_eq!(run.pending(), 3);
    assert_eq!(run.context().variables.get("base"), Some(&Value::Integer(40)));
}

#[test]
fn finishing_run_leaves_handles_held_by_another_run_live() {
    let harness = Harness::new();

    let mut first_run = RunContext::new(harness.registry.clone(), harness.host.clone());
    let mut holder = harness.catalog.instantiate(&ActionDefinition::new("open_workbook").named("Holder")).unwrap();
    holder.run(&mut first_run).unwrap();
    let held = holder.resource().cloned().expect("holder attached");

    let yaml = r#"
actions:
  - kind: open_workbook
    name: Reopen
"#;
    let (_, report) = harness.run(yaml, EngineConfig::default());
    assert!(report.succeeded(), "report: {report:?}");

    assert!(harness.registry.is_live("sheet"));
    assert!(Arc::ptr_eq(&held, &harness.registry.instance("sheet").unwrap()));
    assert_eq!(harness.registry.constructions("sheet"), 1);

    drop(held);
    holder.dispose(&mut first_run);
    assert!(holder.resource().is_none());
    let (_, report) = harness.run(yaml, EngineConfig::default());
    assert!(report.succeeded());
    assert!(!harness.registry.is_live("sheet"));
    assert_eq!(harness.registry.constructions("sheet"), 1);
}
