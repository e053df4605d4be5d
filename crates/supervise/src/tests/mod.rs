//! Test suites for the supervisor.

mod support;
