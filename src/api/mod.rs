// ============================================================
// API Layer - HTTP Inference Endpoint
// ============================================================
// A thin axum wrapper around the TextRecognizer trait:
//
//   POST /predict   multipart upload, field "image"
//   GET  /health    liveness plus whether a model is loaded
//
//   http_server.rs - router, middleware, bind and serve
//   handlers.rs    - request handlers and shared state
//   errors.rs      - ApiError → JSON error body + status code
//
// The server starts even when no checkpoint could be loaded;
// /predict then answers 503 until it is restarted with a model.

pub mod errors;
pub mod handlers;
pub mod http_server;

pub use handlers::AppState;
pub use http_server::serve;
