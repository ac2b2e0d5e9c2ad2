//! A module unit compiled into the `anvil` binary.
//!
//! It is offered to the process scan and only shows up in the registry when
//! process-module loading is enabled.
use anvil_core::ProcessModule;

/// Descriptor of this unit
pub const DESCRIPTOR: &str = include_str!("../resources/module.json");

/// Name the unit is registered under
pub const UNIT_NAME: &str = "core-sample";

/// Engine API this unit's code calls into
const USES: &[&str] = &[
    "anvil::api::Context",
    "anvil::world::Block",
    "anvil::world::block::BlockFamily",
    "std::collections::HashMap",
];

/// The unit handed to `ModuleManagerBuilder::process_modules`
pub fn process_module() -> ProcessModule {
    ProcessModule::new(UNIT_NAME, DESCRIPTOR)
        .namespace("core_sample")
        .uses(USES)
}
