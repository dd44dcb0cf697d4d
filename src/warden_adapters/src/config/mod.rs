pub mod settings;

pub use settings::{AuthSettings, DatabaseSettings, EmailSettings, Settings};
