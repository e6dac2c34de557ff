//! Observability for Larkit: subscriber setup and trace export.

pub mod tracing_setup;
