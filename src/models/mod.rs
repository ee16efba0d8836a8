pub mod enums;
pub mod patient;
pub mod verdict;

pub use enums::*;
pub use patient::{PatientRecord, SymptomFlags, Vitals};
pub use verdict::{ClinicalVerdict, HistoryEntry, TreatmentPlan};
