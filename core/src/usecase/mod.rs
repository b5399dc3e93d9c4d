pub mod daily_report;
pub mod dashboard;
pub mod fetch;
