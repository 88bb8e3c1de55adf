//! Shared helpers for unit tests.
