//! Template handling: extraction from drafts and per-row token filling

mod extract;
mod fill;

pub use extract::{bind_inline_images, resolve_template};
pub use fill::{escape_json_value, fill};
