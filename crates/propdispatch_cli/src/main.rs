//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `propdispatch_core` linkage.
//! - Walk one demo receiver through provisional and forced dispatch.
//! - Keep output deterministic for quick local sanity checks.

use propdispatch_core::{
    DispatchEngine, EngineConfig, InMemoryTesterRegistry, ModuleState, ModuleTable,
    PropertyTester, PropertyValue, Receiver, ReceiverType, StaticTypeHierarchy,
    TesterRegistration, TypeName,
};
use std::any::Any;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

const DEMO_MODULE: &str = "demo.resources";
const DEMO_NAMESPACE: &str = "resources";

struct DemoFile {
    name: &'static str,
    type_name: TypeName,
}

impl Receiver for DemoFile {
    fn receiver_type(&self) -> ReceiverType {
        ReceiverType::instance(self.type_name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ExtensionTester;

impl PropertyTester for ExtensionTester {
    fn test(
        &self,
        receiver: &dyn Receiver,
        _property: &str,
        args: &[PropertyValue],
        _expected: Option<&PropertyValue>,
    ) -> bool {
        let Some(file) = receiver.as_any().downcast_ref::<DemoFile>() else {
            return false;
        };
        args.first()
            .and_then(PropertyValue::as_str)
            .is_some_and(|extension| file.name.ends_with(extension))
    }
}

fn main() -> ExitCode {
    println!("propdispatch_core ping={}", propdispatch_core::ping());
    println!("propdispatch_core version={}", propdispatch_core::core_version());

    match run_demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo() -> Result<(), Box<dyn Error>> {
    let resource = TypeName::new("Resource")?;
    let file_type = TypeName::new("File")?;

    let mut hierarchy = StaticTypeHierarchy::new();
    hierarchy.declare(resource.clone(), Vec::new())?;
    hierarchy.declare(file_type.clone(), vec![resource.clone()])?;

    let registry = Arc::new(InMemoryTesterRegistry::new());
    registry.register(TesterRegistration::from_declaration(
        "resources.extension",
        DEMO_MODULE,
        resource,
        DEMO_NAMESPACE,
        "extension",
        "ExtensionTester",
    ))?;

    let modules = Arc::new(ModuleTable::new());
    modules.declare_module(DEMO_MODULE, ModuleState::Resolved)?;
    modules.register_factory("ExtensionTester", || {
        Ok(Arc::new(ExtensionTester) as Arc<dyn PropertyTester>)
    })?;

    let engine = DispatchEngine::new(
        &EngineConfig::default(),
        registry,
        Arc::new(hierarchy),
        modules.clone(),
    )?;

    let file = DemoFile {
        name: "notes.md",
        type_name: file_type,
    };
    let args = [PropertyValue::from(".md")];

    for force_activation in [false, true] {
        let result = engine.test(
            &file,
            DEMO_NAMESPACE,
            "extension",
            &args,
            None,
            force_activation,
        )?;
        println!(
            "dispatch receiver={} property={}.extension force={} result={:?} module_state={:?}",
            file.receiver_type(),
            DEMO_NAMESPACE,
            force_activation,
            result,
            modules.module_state(DEMO_MODULE)
        );
    }

    let stats = engine.cache_stats();
    println!(
        "cache hits={} misses={} stale={} evictions={}",
        stats.hits, stats.misses, stats.stale, stats.evictions
    );
    Ok(())
}
