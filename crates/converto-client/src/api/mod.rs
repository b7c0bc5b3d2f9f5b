//! API endpoint implementations.

mod auth;
mod background;
mod compress;
mod convert;
mod health;
mod tasks;
mod user;

pub use auth::AuthApi;
pub use background::BackgroundApi;
pub use compress::CompressApi;
pub use convert::{ConvertApi, ConvertOutput};
pub use health::HealthApi;
pub use tasks::TasksApi;
pub use user::UserApi;
