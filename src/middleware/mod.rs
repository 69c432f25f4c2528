pub mod compression;
pub mod cors;
pub mod forwarded_headers;
pub mod path_normalization;
pub mod pipeline;
pub mod problem_details;
pub mod request_logging;
pub mod response_caching;
pub mod security_headers;

pub use forwarded_headers::ClientInfo;
pub use path_normalization::normalize_paths;
pub use pipeline::apply_pipeline;
pub use problem_details::{ProblemDetailsOptions, ProblemMapping};
pub use response_caching::ResponseCache;
