pub mod redaction;

pub use redaction::{mask_partial, sanitize_for_logging};
