pub mod availability;
pub mod store;

pub use availability::{compute_slots, AvailabilityService, MinuteInterval};
pub use store::{DoctorServiceStore, SupabaseDoctorServiceStore};
