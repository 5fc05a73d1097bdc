//! Integration tests for gdrelay-dify against a wiremock dataset API

mod common;
