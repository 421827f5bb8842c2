// Test modules for neura-ai crate
//
// Test organization follows the template pattern where each source file
// has a corresponding test file that focuses on business logic verification.

// Test helper utilities
pub mod helpers;

pub mod node;

// NOTE: HTTP tests against a mock server live in tests/http_client_integration_tests.rs
