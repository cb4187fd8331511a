pub mod books;

use std::sync::Arc;

use bookshelf_kernel::settings::PaginationSettings;
use bookshelf_kernel::ModuleRegistry;

use books::service::BookService;

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    service: Arc<BookService>,
    pagination: PaginationSettings,
) {
    registry.register_custom(books::create_module(service, pagination));
}
