pub mod defaults;
pub mod engine;
pub mod extract;
pub mod schema;

pub use engine::TemplateEngine;
pub use schema::{DocumentTypeResult, Template};
