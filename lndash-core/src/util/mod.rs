/// Scripted node client and fixtures for tests
#[cfg(any(test, feature = "test_utils"))]
pub mod mocks;
/// gRPC compatible error status
pub mod status;
