pub mod contract;
pub mod inputs;
pub mod portfolio;
