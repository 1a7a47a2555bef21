pub mod contract;
pub mod sales;
