//! Client side of shelter.
//!
//! This crate provides the network transport and the offline resource cache
//! (worker lifecycle, fetch strategies, registration) used by the server.

pub mod fetch;
pub mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use fetch::{FetchClient, FetchConfig, Method, Network, Request, RequestMode, Response, StatusCode, request_key};

pub use worker::{
    CacheStrategy, ExtendableEvent, FetchDispatch, FetchOutcome, OfflineCache, Passthrough, Registration,
    RegistrationStatus, ResponseSource, Worker, WorkerState, WorkerStatus,
};
