pub mod aggregate;
pub mod cost_summary;
pub mod order_service;
pub mod presentation;
pub mod project_service;
pub mod report_service;
pub mod session_service;
pub mod wage_service;
