pub mod cache;
pub mod request;
pub mod server;
pub mod upstream;

/// Total bytes the cache may hold across all live entries.
pub const MAX_CACHE_SIZE: usize = 1_049_000;
/// Largest single response the cache will store.
pub const MAX_OBJECT_SIZE: usize = 102_400;
/// Upper bound on a client request head (request line plus headers).
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;
/// Cap on the pass-through header block carried to the origin.
pub const MAX_EXTRA_HEADER_BYTES: usize = 8 * 1024;

pub use cache::{object_key, ObjectCache};
pub use request::{parse_request, split_uri, ParsedRequest};
pub use upstream::{build_origin_request, USER_AGENT};
