//! Core request plumbing for the Code Engine SDK
//!
//! This library provides:
//! - Authenticators that turn an API key into IAM tokens and request headers
//! - A request builder resolving path templates, headers and bodies
//! - A base service executing requests and mapping responses to typed results
//! - Service configuration loaded from environment variables

pub mod auth;
pub mod config;
pub mod error;
pub mod request;
pub mod service;

pub use auth::{
    Authenticator, BearerTokenAuthenticator, IamAuthenticator, IamToken, NoAuthAuthenticator,
};
pub use config::{AuthType, ServiceConfig};
pub use error::{AuthError, Error, Result};
pub use request::RequestBuilder;
pub use service::{BaseService, DetailedResponse, Operation};
