//! Remote ledger boundary: the query trait and its wire model.
//!
//! The gateway only ever sees `Arc<dyn LedgerQuery>`; a gRPC client, the
//! fixture ledger, and test doubles are interchangeable behind it.

pub mod client;
pub mod fixture;
pub mod model;

pub use client::{LedgerError, LedgerQuery};
pub use fixture::{FixtureData, FixtureLedger};
pub use model::{
    Environment, LedgerResponse, ListEnvironmentsRequest, ListEnvironmentsResponse,
    ListProvidersRequest, ListProvidersResponse, Metadata, PageRequest, PageResponse, Provider,
    ShowEnvironmentRequest, ShowEnvironmentResponse, ShowProviderRequest, ShowProviderResponse,
};

#[cfg(test)]
pub use client::MockLedgerQuery;
