pub mod registry;
pub mod vaccinations;

pub use registry::PetRegistryService;
pub use vaccinations::VaccinationService;
