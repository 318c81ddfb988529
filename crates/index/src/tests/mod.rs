//! Cross-module scenarios for the index crate.

pub(crate) mod support;
