pub mod identity;
pub mod order;
pub mod project;
pub mod report;
pub mod role;
pub mod stats;
pub mod wage;
