//! Helper functions for rendering
//!
//! URL generation, HTML escaping and localized date formatting shared by
//! the generator and the preview server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
