pub mod http;

pub use http::HttpFeed;

pub mod prelude {
    pub use super::HttpFeed;
    pub use mp_core::{ArticleFeed, FeedbackSink, Result, Error};
}
