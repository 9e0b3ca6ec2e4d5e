// Tests module
// Failover: retry, backoff, deadline and cancellation behaviour of the engine
// Chunked: strict ordering and partial progress of chunk sequences
// Client: operator signing and defaults through the facade

pub mod support;
