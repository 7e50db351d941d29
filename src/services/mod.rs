//! Service layer behind the HTTP routes.

/// OpenAPI documentation generation.
pub mod documentation;
/// WebSocket connection and message handling service.
pub mod websocket_service;
