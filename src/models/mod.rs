pub mod concept;
pub mod habit;
pub mod suggestion;
pub mod task;
