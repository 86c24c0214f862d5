mod middleware;
mod public;

pub use middleware::RequestContext;
pub use public::{HttpState, build_router, is_anonymous};
