// Infographic pipeline: request content → generated layout → painted PNG → object store.

pub mod content;
pub mod handlers;
