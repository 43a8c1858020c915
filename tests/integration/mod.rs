//! Integration tests driving client sessions against an in-memory share

mod enumeration;
mod failures;
mod races;
mod reconcile;
mod session_flows;
mod support;
