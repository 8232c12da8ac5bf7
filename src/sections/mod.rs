//! Cross-sections for beam elements

mod basic;
mod fibre;
mod fibre_section;

pub use basic::BasicSection;
pub use fibre::Fibre;
pub use fibre_section::{FibreSection, SectionSummary};
