//! Nodal loads and the load manager that increments them

mod load_manager;
mod nodal_load;

pub use load_manager::LoadManager;
pub use nodal_load::NodalLoad;
