pub mod augmentation;
pub mod campaign;
pub mod domain;
pub mod grid;
pub mod serialization;
pub mod telemetry;
