//! Integration tests for the feed pipeline
//!
//! These tests use wiremock to stand in for the upstream listing API and
//! exercise the full fetch/retry/accumulate cycle end-to-end.

mod feed_tests;
