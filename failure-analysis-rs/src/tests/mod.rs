//! Service-level tests
//!
//! Handler tests drive the Axum router with a mocked analyzer. Provider tests
//! use WireMock to stand in for the OpenAI-compatible completions API.
