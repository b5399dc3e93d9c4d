mod dashboard;
mod records;
mod text;
mod tui;

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use logicore_core::error::{AppError, ValidationError};
use logicore_core::navigation::{guard, landing, nav_links, Access, Route};
use logicore_core::service::session_service::{Registration, SessionService};
use logicore_core::{
    AuthProvider, Config, FileSessionStore, FileStore, Identity, JapaneseHolidays, LocalAuth, RangeMode,
    RangeSelector, Role, RowStore, StoreKind, SupabaseClient,
};

#[derive(Parser)]
#[command(name = "logicore")]
#[command(about = "Work reports, orders and cost summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account (role: worker, staff or sales)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    /// Show the signed-in identity and its menu
    Whoami,
    /// Check where a page path leads for the signed-in identity (e.g. /orders)
    Open { path: String },
    /// Print the hours dashboard
    Dashboard {
        /// Week view instead of month view
        #[arg(long)]
        week: bool,
        /// Periods away from the current one (-1 = previous)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Open the interactive dashboard
    Tui {
        #[arg(long)]
        week: bool,
    },
    /// Daily reports (usage: reports add 配管 date:today project:3 work:8 overtime:1)
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },
    /// Purchase order lines (usage: orders add 角パイプ project:3 quantity:10 unit:本 price:1200)
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Projects (usage: projects add 倉庫増築 no:105 company:山田工業)
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Hourly wages (staff only)
    Wages {
        #[command(subcommand)]
        action: WageAction,
    },
    /// Cost summary of one project
    Cost { project_id: i64 },
}

#[derive(Subcommand)]
enum ReportAction {
    /// List visible reports, all of them unless a window is given
    List {
        #[arg(long)]
        week: bool,
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<i64>,
    },
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    Edit {
        id: i64,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    List {
        #[arg(long)]
        project: Option<i64>,
    },
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    Edit {
        id: i64,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    List,
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    Edit {
        id: i64,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum WageAction {
    List,
    Add { user_id: String, hourly_wage: f64 },
    Set { id: i64, hourly_wage: f64 },
}

/// Collaborators shared by every command.
pub struct Context {
    pub store: Arc<dyn RowStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub calendar: JapaneseHolidays,
}

impl Context {
    fn build(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let sessions = FileSessionStore::new(data_dir.clone());
        let (store, auth): (Arc<dyn RowStore>, Arc<dyn AuthProvider>) = match config.store {
            StoreKind::Rest => {
                let (url, key) = config.backend()?;
                debug!("Using REST store at {}", url);
                let client = Arc::new(SupabaseClient::new(url, key, sessions)?);
                let store: Arc<dyn RowStore> = client.clone();
                let auth: Arc<dyn AuthProvider> = client;
                (store, auth)
            }
            StoreKind::File => {
                debug!("Using file store in {:?}", data_dir);
                let store: Arc<dyn RowStore> = Arc::new(FileStore::new(data_dir)?);
                let auth: Arc<dyn AuthProvider> = Arc::new(LocalAuth::new(sessions, config.local_user.clone()));
                (store, auth)
            }
        };
        Ok(Self {
            store,
            auth,
            calendar: config.holiday_calendar()?,
        })
    }

    pub fn sessions(&self) -> SessionService<Arc<dyn AuthProvider>, Arc<dyn RowStore>> {
        SessionService::new(self.auth.clone(), self.store.clone())
    }

    /// Resolves the session and applies the route guard for `route`.
    pub async fn enter(&self, route: Route) -> Result<Identity> {
        let identity = self.sessions().try_resolve().await?;
        match guard(route, identity.as_ref()) {
            Access::Allow => identity.ok_or_else(|| anyhow::Error::from(AppError::Unauthenticated)),
            Access::Redirect(_) => Err(AppError::Unauthenticated.into()),
            Access::Forbidden => {
                let role = identity.map(|i| i.role).unwrap_or_default();
                Err(AppError::Forbidden {
                    role: role.to_string(),
                    resource: route.path().to_string(),
                }
                .into())
            }
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env("LOGICORE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    print!("パスワード: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Page a path resolves to for `identity`, following a login redirect.
fn destination(path: &str, identity: Option<&Identity>) -> Result<Route> {
    let route = Route::from_path(path).ok_or_else(|| {
        AppError::from(ValidationError::InvalidValue {
            field: "path",
            value: path.to_string(),
        })
    })?;
    match guard(route, identity) {
        Access::Allow => Ok(route),
        Access::Redirect(to) => Ok(to),
        Access::Forbidden => Err(AppError::Forbidden {
            role: identity.map(|i| i.role).unwrap_or_default().to_string(),
            resource: route.path().to_string(),
        }
        .into()),
    }
}

fn mode(week: bool) -> RangeMode {
    if week {
        RangeMode::Week
    } else {
        RangeMode::Month
    }
}

/// Failures print the message meant for the user; the chain goes to the log.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app) => app.user_message(),
        None => format!("エラー: {:#}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let command = cli.command.unwrap_or(Commands::Tui { week: false });
    let log_file = match command {
        Commands::Tui { .. } => Some(config.data_dir()?.join("logicore.log")),
        _ => None,
    };
    init_logging(log_file.as_deref())?;
    let ctx = Context::build(&config)?;

    match command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let outcome = ctx.sessions().login(&email, &password).await?;
            println!(
                "ログインしました: {} ({})",
                outcome.identity.name,
                outcome.identity.role.label()
            );
            match outcome.landing {
                Some(route) => println!("→ {} ({})", route.label(), route.path()),
                None => println!("ロールが設定されていません。管理者に連絡してください。"),
            }
        }
        Commands::Register {
            name,
            email,
            role,
            password,
        } => {
            let password = read_password(password)?;
            let form = Registration {
                name,
                email,
                password,
                role: role.map(|r| Role::parse(Some(r.as_str()))),
            };
            let user = ctx.sessions().register(&form).await?;
            info!("Registered {}", user.id);
            println!("登録しました。ログインしてください。");
        }
        Commands::Logout => {
            ctx.sessions().logout().await?;
            println!("ログアウトしました。");
        }
        Commands::Whoami => match ctx.sessions().try_resolve().await? {
            Some(identity) => {
                println!("{} ({}) {}", identity.name, identity.role.label(), identity.user_id);
                let links: Vec<&str> = nav_links(identity.role).iter().map(|r| r.label()).collect();
                println!("メニュー: {}", links.join(" / "));
                if let Some(route) = landing(identity.role) {
                    println!("ホーム: {}", route.path());
                }
            }
            None => return Err(AppError::Unauthenticated.into()),
        },
        Commands::Open { path } => {
            let identity = ctx.sessions().try_resolve().await?;
            let route = destination(&path, identity.as_ref())?;
            println!("→ {} ({})", route.label(), route.path());
        }
        Commands::Dashboard { week, offset } => {
            let identity = ctx.enter(Route::Dashboard).await?;
            let selector = RangeSelector::with_offset(mode(week), offset);
            dashboard::show(&ctx, identity, selector).await?;
        }
        Commands::Tui { week } => {
            let identity = ctx.enter(Route::Dashboard).await?;
            tui::run(&ctx, identity, RangeSelector::new(mode(week))).await?;
        }
        Commands::Reports { action } => {
            let identity = ctx.enter(Route::DailyReport).await?;
            match action {
                ReportAction::List { week, offset } => {
                    let window = match offset {
                        Some(offset) => Some(dashboard::window(mode(week), offset)?),
                        None if week => Some(dashboard::window(RangeMode::Week, 0)?),
                        None => None,
                    };
                    records::list_reports(&ctx, &identity, window).await?
                }
                ReportAction::Add { args } => records::add_report(&ctx, &identity, &args).await?,
                ReportAction::Edit { id, args } => records::edit_report(&ctx, &identity, id, &args).await?,
            }
        }
        Commands::Orders { action } => {
            ctx.enter(Route::Orders).await?;
            match action {
                OrderAction::List { project } => records::list_orders(&ctx, project).await?,
                OrderAction::Add { args } => records::save_order(&ctx, None, &args).await?,
                OrderAction::Edit { id, args } => records::save_order(&ctx, Some(id), &args).await?,
            }
        }
        Commands::Projects { action } => {
            ctx.enter(Route::ProjectEntry).await?;
            match action {
                ProjectAction::List => records::list_projects(&ctx).await?,
                ProjectAction::Add { args } => records::save_project(&ctx, None, &args).await?,
                ProjectAction::Edit { id, args } => records::save_project(&ctx, Some(id), &args).await?,
            }
        }
        Commands::Wages { action } => {
            let identity = ctx.enter(Route::WageManager).await?;
            match action {
                WageAction::List => records::list_wages(&ctx, &identity).await?,
                WageAction::Add { user_id, hourly_wage } => {
                    records::add_wage(&ctx, &identity, user_id, hourly_wage).await?
                }
                WageAction::Set { id, hourly_wage } => {
                    records::set_wage(&ctx, &identity, id, hourly_wage).await?
                }
            }
        }
        Commands::Cost { project_id } => {
            let identity = ctx.enter(Route::CostSummary).await?;
            records::cost_sheet(&ctx, &identity, project_id).await?;
        }
    }
    Ok(())
}
