//! CrudService: generic CRUD over a document store, with descriptor-driven validation.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::RecordValidator;
