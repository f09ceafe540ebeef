//! Integration tests for the analyzer
//!
//! `pipeline_tests` drives the real crawler against wiremock servers;
//! `dispatcher_tests` exercises the worker pool with scripted analyzers.

mod dispatcher_tests;
mod pipeline_tests;
