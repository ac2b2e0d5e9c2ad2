use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Anvil: module discovery and sandboxed environments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file (JSON, YAML or TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Additional module search path; may be repeated
    #[arg(long = "module-path", value_name = "DIR")]
    pub module_paths: Vec<PathBuf>,

    /// Also load modules linked into this binary
    #[arg(long)]
    pub load_process_modules: bool,

    /// Log sandbox violations instead of denying them
    #[arg(long)]
    pub permissive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl CliArgs {
    /// Flags only ever switch a toggle on; absent flags leave the
    /// decision to the environment and the configuration.
    pub fn load_process_modules(&self) -> Option<bool> {
        self.load_process_modules.then_some(true)
    }

    pub fn permissive(&self) -> Option<bool> {
        self.permissive.then_some(true)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect registered modules
    Modules {
        #[command(subcommand)]
        command: ModulesCommand,
    },
    /// Work with environments
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
    /// Check whether a module may access a capability
    Check {
        /// Module id
        module: String,
        /// Fully qualified class or package, e.g. `anvil::world::Block`
        capability: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModulesCommand {
    /// List every registered module version
    List {},
    /// Show the metadata of the newest version of a module
    Show {
        /// Module id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Resolve the given modules and build a secondary environment
    Build {
        /// Module ids to include
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
