#![cfg(test)]

pub mod bootstrap_tests;
pub mod common;
pub mod sandbox_tests;
