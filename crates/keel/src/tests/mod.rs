//! Cross-module suites for the service orchestrator.

pub(crate) mod support;
