use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::ArgMatches;
use mockall::predicate::eq;
use mockall::{Sequence, mock};
use pli::{BootstrapError, Pli};
use pli_console::{Application, Command, CommandService, ConsoleError};
use pli_container::{
    CompilerPass, ContainerAware, ContainerBuilder, ContainerError, ContainerHolder, Extension,
    PassConfig, Service, ServiceContainer, TagAttributes,
};
use pli_core::{ConfigurationSchema, SchemaNode, TreeNode, TreeSchema};
use serde_json::{Value, json};

mock! {
    Node {}

    impl SchemaNode for Node {
        fn normalize(&self, value: Value) -> pli_core::Result<Value>;
        fn merge(&self, left: Value, right: Value) -> pli_core::Result<Value>;
        fn finalize(&self, value: Value) -> pli_core::Result<Value>;
    }
}

mock! {
    Ext {}

    impl Extension for Ext {
        fn set_config_directories(&mut self, directories: Vec<PathBuf>);
        fn build_container(&mut self, container: &mut ContainerBuilder) -> pli_container::Result<()>;
    }
}

mock! {
    Pass {}

    impl CompilerPass for Pass {
        fn name(&self) -> &'static str;
        fn process(&self, container: &mut ContainerBuilder) -> pli_container::Result<()>;
    }
}

/// Hands out its node to the first `build_tree` call.
struct OnceSchema(Mutex<Option<MockNode>>);

impl OnceSchema {
    fn new(node: MockNode) -> Self {
        Self(Mutex::new(Some(node)))
    }
}

impl ConfigurationSchema for OnceSchema {
    fn build_tree(&self) -> Box<dyn SchemaNode> {
        Box::new(
            self.0
                .lock()
                .unwrap()
                .take()
                .expect("build_tree must be called once"),
        )
    }
}

#[derive(Default)]
struct AwareCommand {
    name: &'static str,
    container: ContainerHolder,
}

impl Command for AwareCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, _matches: &ArgMatches, _out: &mut dyn Write) -> pli_console::Result<i32> {
        Ok(0)
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }
}

impl ContainerAware for AwareCommand {
    fn set_container(&self, container: Arc<dyn ServiceContainer>) {
        self.container.set(container);
    }
}

/// A container serving fixed services, recording what it was asked for.
#[derive(Default)]
struct StubContainer {
    services: Vec<(String, Service)>,
    /// Ids reported as tagged without a service behind them.
    dangling: Vec<String>,
    tag_queries: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl StubContainer {
    fn with(mut self, id: &str, service: Service) -> Self {
        self.services.push((id.to_string(), service));
        self
    }

    fn with_dangling(mut self, id: &str) -> Self {
        self.dangling.push(id.to_string());
        self
    }
}

impl ServiceContainer for StubContainer {
    fn get_parameter(&self, name: &str) -> pli_container::Result<Value> {
        Err(ContainerError::ParameterNotFound {
            name: name.to_string(),
        })
    }

    fn has(&self, id: &str) -> bool {
        self.services.iter().any(|(known, _)| known == id)
    }

    fn get(&self, id: &str) -> pli_container::Result<Service> {
        self.fetched.lock().unwrap().push(id.to_string());
        self.services
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, service)| Arc::clone(service))
            .ok_or_else(|| ContainerError::ServiceNotFound { id: id.to_string() })
    }

    fn find_tagged_service_ids(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)> {
        self.tag_queries.lock().unwrap().push(tag.to_string());
        self.services
            .iter()
            .map(|(id, _)| id.clone())
            .chain(self.dangling.iter().cloned())
            .map(|id| (id, Vec::new()))
            .collect()
    }
}

fn command_service(command: Arc<dyn Command>) -> Service {
    Arc::new(CommandService::from_arc(command))
}

fn params(entries: &[(&str, &str)]) -> Vec<(String, Value)> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect()
}

// ---------------------------------------------------------------------------
// Configuration loading
// ---------------------------------------------------------------------------

#[test]
fn load_configuration_runs_normalize_merge_finalize_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), "foo: bar").unwrap();

    let mut node = MockNode::new();
    let mut seq = Sequence::new();
    node.expect_normalize()
        .with(eq(json!({"foo": "bar"})))
        .times(1)
        .in_sequence(&mut seq)
        .returning(Ok);
    node.expect_merge()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, right| Ok(right));
    node.expect_finalize()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(json!({"foo": "bar"})));

    let pli = Pli::new(dir.path());
    let config = pli
        .load_configuration(&OnceSchema::new(node), ["config.yml"])
        .unwrap();
    assert_eq!(config["foo"], "bar");
}

#[test]
fn load_configuration_without_files_only_finalizes() {
    let dir = tempfile::tempdir().unwrap();

    let mut node = MockNode::new();
    node.expect_normalize().never();
    node.expect_merge().never();
    node.expect_finalize()
        .with(eq(json!({})))
        .times(1)
        .returning(|_| Ok(json!({})));

    let config = Pli::new(dir.path())
        .load_configuration(&OnceSchema::new(node), ["config.yml"])
        .unwrap();
    assert_eq!(config, json!({}));
}

#[test]
fn load_configuration_keeps_file_order_and_skips_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.yml"), "source: b").unwrap();
    fs::write(dir.path().join("a.json"), r#"{"source": "a"}"#).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    let mut node = MockNode::new();
    node.expect_normalize().times(2).returning(move |value| {
        recorded.lock().unwrap().push(value.clone());
        Ok(value)
    });
    node.expect_merge().times(2).returning(|_, right| Ok(right));
    node.expect_finalize().times(1).returning(Ok);

    let config = Pli::new(dir.path())
        .load_configuration(&OnceSchema::new(node), ["b.yml", "missing.yml", "a.json"])
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!({"source": "b"}), json!({"source": "a"})]
    );
    assert_eq!(config, json!({"source": "a"}));
}

#[test]
fn load_configuration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), "name: demo\nplugins: [a]\n").unwrap();
    fs::write(dir.path().join("config.local.yml"), "plugins: [b]\n").unwrap();

    let schema = TreeSchema::new(
        TreeNode::mapping("app")
            .child(TreeNode::string("name"))
            .child(TreeNode::string("greeting").default_value(json!("Hello")))
            .child(TreeNode::sequence("plugins", TreeNode::string("plugin"))),
    );
    let pli = Pli::new(dir.path());
    let files = ["config.yml", "config.local.yml"];

    let first = pli.load_configuration(&schema, files).unwrap();
    let second = pli.load_configuration(&schema, files).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        json!({"name": "demo", "greeting": "Hello", "plugins": ["a", "b"]})
    );
}

#[test]
fn load_configuration_propagates_schema_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), "unknown: 1").unwrap();

    let schema = TreeSchema::new(TreeNode::mapping("app").child(TreeNode::string("name")));
    let err = Pli::new(dir.path())
        .load_configuration(&schema, ["config.yml"])
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Schema(_)));
}

#[test]
fn load_configuration_reports_parse_errors_with_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), "foo: [unclosed").unwrap();

    let schema = TreeSchema::new(TreeNode::mapping("app").allow_extra_keys());
    let err = Pli::new(dir.path())
        .load_configuration(&schema, ["config.yml"])
        .unwrap_err();
    assert!(
        matches!(err, BootstrapError::Yaml { ref path, .. } if path.ends_with("config.yml"))
    );
}

// ---------------------------------------------------------------------------
// Container assembly
// ---------------------------------------------------------------------------

#[test]
fn build_container_applies_parameters_extension_and_passes() {
    let dir = tempfile::tempdir().unwrap();

    let mut extension = MockExt::new();
    extension
        .expect_set_config_directories()
        .with(eq(vec![dir.path().to_path_buf()]))
        .times(1)
        .return_const(());
    extension.expect_build_container().times(1).returning(|_| Ok(()));

    let mut pass = MockPass::new();
    pass.expect_name().return_const("mock-pass");
    pass.expect_process().times(1).returning(|_| Ok(()));

    let builder = Pli::new(dir.path())
        .build_container(
            &mut extension,
            params(&[("foo", "bar"), ("%DIR%", "default")]),
            params(&[("%DIR%", "foobar")]),
            vec![Box::new(pass)],
        )
        .unwrap();

    assert_eq!(builder.parameter("%DIR%").unwrap(), &json!("foobar"));
    assert_eq!(builder.parameter("foo").unwrap(), &json!("bar"));
    assert_eq!(
        builder.pass_config().len(),
        PassConfig::builtin_passes().len() + 1
    );
    assert_eq!(
        builder.pass_config().passes().last().map(|p| p.name()),
        Some("mock-pass")
    );

    let container = builder.compile().unwrap();
    assert_eq!(container.parameter("%DIR%").unwrap(), &json!("foobar"));
}

#[test]
fn build_container_runs_caller_passes_after_extension_passes() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut extension = MockExt::new();
    extension.expect_set_config_directories().return_const(());
    let extension_order = Arc::clone(&order);
    extension.expect_build_container().returning(move |container| {
        let order = Arc::clone(&extension_order);
        container.add_compiler_pass(
            Box::new(pli_container::FnPass::new(
                "extension",
                move |_: &mut ContainerBuilder| {
                    order.lock().unwrap().push("extension");
                    Ok(())
                },
            )),
            pli_container::PassType::AfterRemoving,
        );
        Ok(())
    });

    let caller_order = Arc::clone(&order);
    let caller = pli_container::FnPass::new("caller", move |_: &mut ContainerBuilder| {
        caller_order.lock().unwrap().push("caller");
        Ok(())
    });

    let builder = Pli::new("/nonexistent")
        .build_container(&mut extension, Vec::new(), Vec::new(), vec![Box::new(caller)])
        .unwrap();
    builder.compile().unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["extension", "caller"]);
}

#[test]
fn build_container_propagates_extension_failure() {
    let mut extension = MockExt::new();
    extension.expect_set_config_directories().return_const(());
    extension
        .expect_build_container()
        .times(1)
        .returning(|_| Err(ContainerError::extension("broken wiring")));

    let err = Pli::new("/nonexistent")
        .build_container(&mut extension, Vec::new(), Vec::new(), Vec::new())
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Container(ContainerError::Extension(_))));
    assert_eq!(err.to_string(), "extension failed: broken wiring");
}

// ---------------------------------------------------------------------------
// Application building
// ---------------------------------------------------------------------------

#[test]
fn get_application_injects_container_and_adds_commands() {
    let command = Arc::new(AwareCommand {
        name: "cmd1",
        ..AwareCommand::default()
    });
    let stub = Arc::new(StubContainer::default().with("cmd1", command_service(command.clone())));
    let container: Arc<dyn ServiceContainer> = stub.clone();

    let application = Pli::new("/nonexistent")
        .with_application("tool", "2.0.0")
        .get_application(Arc::clone(&container))
        .unwrap();

    assert_eq!(application.name(), "tool");
    assert_eq!(application.version(), "2.0.0");
    assert!(application.has("cmd1"));
    assert_eq!(*stub.tag_queries.lock().unwrap(), vec!["command"]);
    assert_eq!(*stub.fetched.lock().unwrap(), vec!["cmd1"]);

    let injected = command.container.get().expect("container injected");
    assert!(Arc::ptr_eq(&injected, &container));
}

#[test]
fn get_application_rejects_tagged_non_commands() {
    let stub = StubContainer::default().with("cmd1", Arc::new("not a command"));
    let err = Pli::new("/nonexistent")
        .get_application(Arc::new(stub))
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Container(ContainerError::ServiceTypeMismatch { ref id, .. }) if id == "cmd1"
    ));
}

#[test]
fn get_application_rejects_duplicate_command_names() {
    let first: Arc<dyn Command> = Arc::new(AwareCommand {
        name: "same",
        ..AwareCommand::default()
    });
    let second: Arc<dyn Command> = Arc::new(AwareCommand {
        name: "same",
        ..AwareCommand::default()
    });
    let stub = StubContainer::default()
        .with("a", command_service(first))
        .with("b", command_service(second));

    let err = Pli::new("/nonexistent")
        .get_application(Arc::new(stub))
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Console(ConsoleError::DuplicateCommand { ref name }) if name == "same"
    ));
}

#[test]
fn get_application_propagates_fetch_failure() {
    let stub: Arc<StubContainer> = Arc::new(StubContainer::default().with_dangling("cmd1"));
    let container: Arc<dyn ServiceContainer> = stub.clone();
    let pli = Pli::new("/nonexistent");

    let err = pli.get_application(Arc::clone(&container)).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Container(ContainerError::ServiceNotFound { ref id }) if id == "cmd1"
    ));

    let mut application = Application::new("tool", "1.0.0");
    assert!(pli.add_commands(&mut application, &container).is_err());
    assert!(application.is_empty());
    assert_eq!(*stub.fetched.lock().unwrap(), vec!["cmd1", "cmd1"]);
}
