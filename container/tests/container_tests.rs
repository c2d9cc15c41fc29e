use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pli_container::{
    Alias, ContainerBuilder, ContainerError, Definition, FnPass, PassType,
    ServiceContainer,
};
use serde_json::json;

struct Logger {
    level: String,
}

struct Mailer {
    logger: Arc<Logger>,
}

fn mailer_builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("log.level", json!("debug"));
    builder.set_definition(
        "logger.stderr",
        Definition::new(|ctx| {
            Ok(Logger {
                level: ctx.argument(0)?.as_str().unwrap_or("info").to_string(),
            })
        })
        .with_argument(json!("%log.level%"))
        .private(),
    );
    builder.set_alias("logger", Alias::new("logger.stderr").private());
    builder.set_definition(
        "mailer",
        Definition::new(|ctx| {
            Ok(Mailer {
                logger: ctx.reference_as::<Logger>(0)?,
            })
        })
        .with_reference("logger"),
    );
    builder.set_alias("mail", Alias::new("mailer"));
    builder
}

#[test]
fn test_compile_and_resolve_graph() {
    let container = mailer_builder().compile().unwrap();

    let mailer = container.get_as::<Mailer>("mail").unwrap();
    assert_eq!(mailer.logger.level, "debug");

    // the private logger survives because the mailer needs it
    let logger = container.get_as::<Logger>("logger.stderr").unwrap();
    assert!(Arc::ptr_eq(&logger, &mailer.logger));

    assert!(!container.has("logger"));
    assert!(container.has("mail"));
}

#[test]
fn test_alias_and_id_share_instance() {
    let container = mailer_builder().compile().unwrap();
    let by_alias = container.get("mail").unwrap();
    let by_id = container.get("mailer").unwrap();
    assert!(Arc::ptr_eq(&by_alias, &by_id));
}

#[test]
fn test_passes_run_in_phase_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut builder = ContainerBuilder::new();

    for (name, pass_type) in [
        ("after", PassType::AfterRemoving),
        ("before", PassType::BeforeOptimization),
        ("remove", PassType::BeforeRemoving),
    ] {
        let order = Arc::clone(&order);
        builder.add_compiler_pass(
            Box::new(FnPass::new(name, move |_: &mut ContainerBuilder| {
                order.lock().unwrap().push(name);
                Ok(())
            })),
            pass_type,
        );
    }

    builder.compile().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["before", "remove", "after"]);
}

#[test]
fn test_late_pass_sees_resolved_and_trimmed_container() {
    let mut builder = mailer_builder();
    builder.set_definition("unused", Definition::new(|_| Ok(())).private());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    builder.add_compiler_pass(
        Box::new(FnPass::new("inspect", move |c: &mut ContainerBuilder| {
            sink.lock()
                .unwrap()
                .extend(c.definitions().map(|(id, _)| id.to_string()));
            Ok(())
        })),
        PassType::AfterRemoving,
    );

    builder.compile().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["logger.stderr", "mailer"]);
}

#[test]
fn test_pass_error_aborts_compile() {
    let mut builder = ContainerBuilder::new();
    builder.add_compiler_pass(
        Box::new(FnPass::new("reject", |_: &mut ContainerBuilder| {
            Err(ContainerError::pass("reject", "nope"))
        })),
        PassType::BeforeOptimization,
    );

    let err = builder.compile().unwrap_err();
    assert_eq!(err.to_string(), "compiler pass reject failed: nope");
}

#[test]
fn test_circular_alias_is_rejected() {
    let mut builder = ContainerBuilder::new();
    builder.set_alias("a", Alias::new("b"));
    builder.set_alias("b", Alias::new("a"));

    let err = builder.compile().unwrap_err();
    assert!(matches!(err, ContainerError::CircularAlias { .. }));
}

#[test]
fn test_tagged_services_with_attributes() {
    let mut builder = ContainerBuilder::new();
    let mut attributes = pli_container::TagAttributes::new();
    attributes.insert("alias".to_string(), json!("hi"));
    builder.set_definition(
        "cmd.greet",
        Definition::new(|_| Ok(())).with_tag_attributes("command", attributes.clone()),
    );
    builder.set_definition("cmd.about", Definition::new(|_| Ok(())).with_tag("command"));

    let container: Arc<dyn ServiceContainer> = Arc::new(builder.compile().unwrap());
    let tagged = container.find_tagged_service_ids("command");

    assert_eq!(tagged.len(), 2);
    assert_eq!(tagged[0].0, "cmd.about");
    assert_eq!(tagged[1], ("cmd.greet".to_string(), vec![attributes]));
    assert!(container.find_tagged_service_ids("listener").is_empty());
}

#[test]
fn test_builtin_pass_names_are_unique() {
    let builder = ContainerBuilder::new();
    let mut names: Vec<&str> = builder
        .pass_config()
        .passes()
        .into_iter()
        .map(|pass| pass.name())
        .collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn test_concurrent_creation_is_not_a_cycle() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let mut builder = ContainerBuilder::new();
    builder.set_definition(
        "slow",
        Definition::new(move |_| {
            thread::sleep(Duration::from_millis(200));
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        }),
    );
    let container = builder.compile().unwrap();

    let (first, second) = thread::scope(|scope| {
        let a = scope.spawn(|| container.get("slow"));
        thread::sleep(Duration::from_millis(50));
        let b = scope.spawn(|| container.get("slow"));
        (a.join().unwrap(), b.join().unwrap())
    });

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(created.load(Ordering::SeqCst) >= 1);
    assert!(container.initialized("slow"));
}

#[test]
fn test_cycle_is_still_detected_per_thread() {
    let mut builder = ContainerBuilder::new();
    builder.set_definition(
        "a",
        Definition::new(|ctx| ctx.container().get("b").map(|_| ())),
    );
    builder.set_definition(
        "b",
        Definition::new(|ctx| ctx.container().get("a").map(|_| ())),
    );
    let container = builder.compile().unwrap();

    let err = thread::scope(|scope| scope.spawn(|| container.get("a")).join().unwrap())
        .unwrap_err();
    assert!(matches!(err, ContainerError::CircularReference { path } if path == "a -> b -> a"));
}
