//! Display-width aware text helpers shared by the card and tree renderers.

mod width;
mod wrap;

pub use width::{char_width, pad_right, str_width};
pub use wrap::wrap_text;
