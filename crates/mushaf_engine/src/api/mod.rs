/* 📖 # Why an API module in mushaf_engine?

The api module exposes the engine over HTTP. ApiService implements the
HttpService trait from mushaf_base, so the same service runs behind RealPal
in production and MockPal in tests.
*/

mod query;
mod service;

pub use query::QueryParams;
pub use service::{ApiService, SiteInfo};
