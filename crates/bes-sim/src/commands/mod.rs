pub mod doctor;
pub mod extract;
pub mod plan;
pub mod run;
