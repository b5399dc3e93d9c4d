pub mod config;
pub mod error;
pub mod holiday;
pub mod input;
pub mod model;
pub mod navigation;
pub mod query;
pub mod repository;
pub mod service;
pub mod time;
pub mod usecase;

pub use config::{Config, StoreKind};
pub use error::{AppError, ErrorKind, Result, ValidationError};
pub use holiday::{HolidayCalendar, JapaneseHolidays};
pub use input::{expand_key, parse_args, ParsedInput};
pub use model::identity::Identity;
pub use model::role::Role;
pub use navigation::{guard, Access, Route};
pub use repository::{AuthProvider, FileSessionStore, FileStore, LocalAuth, RowStore, SupabaseClient};
pub use service::session_service::SessionService;
pub use time::{parse_report_date, RangeMode, RangeSelector};
pub use usecase::dashboard::{DashboardState, DashboardUseCase, DashboardView};
