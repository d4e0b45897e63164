pub mod ledger;
pub mod occupancy;
pub mod statement;
