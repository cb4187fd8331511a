//! Bookshelf application library: the books module and the bootstrap that
//! wires it to the store, the module registry and the HTTP server.

pub mod app;
pub mod modules;

pub use app::Application;
pub use modules::books::{
    models::BookDto,
    service::{BookError, BookService},
};
