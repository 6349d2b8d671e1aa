mod client;
mod errors;
mod provider;
mod user_agent;
pub use self::client::{Client, FetchConfig};
pub use self::errors::Error;
pub use self::provider::RenderProvider;
pub use self::user_agent::get_user_agent;
