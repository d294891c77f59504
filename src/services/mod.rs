pub mod appeal;
pub mod cache;
pub mod content;
pub mod effects;
pub mod ledger;
pub mod maintenance;
pub mod notice;
pub mod report;
pub mod staff;
pub mod stats;
