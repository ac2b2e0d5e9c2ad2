mod cli;

use std::process::ExitCode;

use anvil_core::kernel::constants::ENGINE_NAME;
use anvil_core::module_system::ModuleSystemError;
use anvil_core::sandbox::SandboxError;
use anvil_core::{Error, ModuleId, ModuleManager, ModuleSystemConfig, Result};
use clap::Parser;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{CliArgs, Commands, EnvCommand, ModulesCommand};

fn init_logging() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

async fn load_config(args: &CliArgs) -> Result<ModuleSystemConfig> {
    let mut config = match &args.config {
        Some(path) => ModuleSystemConfig::load(path).await?,
        None => ModuleSystemConfig::default(),
    }
    .with_env_overrides();
    for path in &args.module_paths {
        config.add_module_path(path);
    }
    Ok(config)
}

fn module_id(raw: &str) -> Result<ModuleId> {
    Ok(ModuleId::new(raw)?)
}

async fn run(args: CliArgs) -> Result<ExitCode> {
    let config = load_config(&args).await?;
    let manager = ModuleManager::builder()
        .config(config)
        .process_modules(vec![core_sample::process_module()])
        .load_process_modules(args.load_process_modules())
        .permissive(args.permissive())
        .build()
        .await?;
    info!("{} engine module {} ready", ENGINE_NAME, manager.engine_module().version());

    match args.command {
        Commands::Modules { command } => match command {
            ModulesCommand::List {} => {
                for module in manager.registry().iter() {
                    println!("{} {} ({})", module.id(), module.version(), module.code().location());
                }
            }
            ModulesCommand::Show { id } => {
                let module = manager
                    .registry()
                    .get(&module_id(&id)?)
                    .ok_or_else(|| Error::Other(format!("no module '{}' is registered", id)))?;
                let metadata = module.metadata();
                println!("id: {}", metadata.id);
                println!("version: {}", metadata.version);
                println!("name: {}", metadata.display_name());
                if let Some(description) = &metadata.description {
                    println!("description: {}", description);
                }
                println!("location: {}", module.code().location());
                for dependency in &metadata.dependencies {
                    println!("depends on: {}", dependency);
                }
                for permission in &metadata.required_permissions {
                    println!("requires permission: {}", permission);
                }
                for (key, value) in &metadata.extensions {
                    println!("{}: {:?}", key, value);
                }
            }
        },
        Commands::Env { command } => match command {
            EnvCommand::Build { ids } => {
                let ids = ids.iter().map(|id| module_id(id)).collect::<Result<Vec<_>>>()?;
                let environment = manager.resolve_environment(&ids, false)?;
                println!(
                    "environment {} ({}, {} modules)",
                    environment.id(),
                    environment.enforcement_mode(),
                    environment.len()
                );
                for module in environment.modules() {
                    println!("  {}", module);
                }
                for (module, dependency) in environment.missing_dependencies() {
                    println!("  missing: {} requires {}", module, dependency);
                }
            }
        },
        Commands::Check { module, capability } => {
            let id = module_id(&module)?;
            let environment = manager.resolve_environment(&[id.clone()], false)?;
            match environment.check_access(&id, &capability) {
                Ok(()) => println!("allowed: {} -> {}", module, capability),
                Err(ModuleSystemError::Sandbox(SandboxError::Denied { .. })) => {
                    println!("denied: {} -> {}", module, capability);
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
