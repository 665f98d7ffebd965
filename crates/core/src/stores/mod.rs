pub mod generator;
pub mod registry;
pub mod rest_index;

pub use generator::RestResponseGenerator;
pub use registry::RestDatasetRegistry;
pub use rest_index::RestSearchIndex;
