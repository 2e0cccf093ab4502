pub mod scheduling;
pub mod slots;

pub use scheduling::SchedulingService;
pub use slots::SlotSupplyService;
