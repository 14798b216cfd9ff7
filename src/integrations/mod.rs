//! External integrations module.
//!
//! Provides the client for the TestRail REST API.

pub mod testrail;

pub use testrail::{
    basic_auth_token, compose_api_prefix, ApiDispatch, ApiErrorDetail, HttpMethod,
    TestRailClient, TestRailError, TestRailResult, API_PREFIX,
};
