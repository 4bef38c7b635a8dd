use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use crossterm::{
    cursor::Show,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use sqlpeek::config::{ConfigOverrides, ConnectionConfig};
use sqlpeek::db::{DEFAULT_TABLES, DatabaseConnection};
use sqlpeek::record;
use sqlpeek::tui::{App, Selection, TerminalGuard, run_app};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlpeek", version)]
#[command(about = "Dump MySQL tables as JSON and pick a table to look at", long_about = None)]
struct Cli {
    /// Database account for sign-in [default: root]
    #[arg(long)]
    user: Option<String>,
    /// Password for the account [default: empty]
    #[arg(long)]
    password: Option<String>,
    /// Hostname of the server the database is hosted on [default: localhost]
    #[arg(long)]
    host: Option<String>,
    /// The database to access [default: empty]
    #[arg(long)]
    database: Option<String>,
    /// Port the database server is on [default: 3306]
    #[arg(long)]
    port: Option<u16>,
    /// Table whose rows are printed as JSON; repeat to dump several
    #[arg(long = "table", value_name = "TABLE", default_values = DEFAULT_TABLES)]
    tables: Vec<String>,
    /// Print the JSON dumps and exit without showing the table list
    #[arg(long)]
    no_ui: bool,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
    /// Configuration file [default: ~/.sqlpeek/config.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            user: self.user.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return Ok(());
    }

    init_logging(cli.verbose);

    let config = ConnectionConfig::load(cli.config.as_deref(), &cli.overrides())?;
    debug!(?config, "resolved configuration");

    let tables = dump_tables(&config, &cli.tables, cli.pretty).await?;

    if cli.no_ui {
        return Ok(());
    }

    let selection = run_tui(&config.database, tables)?;
    debug!(?selection, "table picker closed");
    println!("{}", selection.message());

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sqlpeek=debug")
        } else {
            EnvFilter::new("sqlpeek=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Lists the database's tables, prints each requested table as JSON and closes
/// the connection. Returns the table names for the picker.
async fn dump_tables(
    config: &ConnectionConfig,
    tables_to_dump: &[String],
    pretty: bool,
) -> Result<Vec<String>> {
    let mut conn = DatabaseConnection::connect(config).await?;

    let tables = conn.list_tables().await?;
    info!(count = tables.len(), "found tables");

    let stdout = io::stdout();
    for table in tables_to_dump {
        let records = conn.materialize(table).await?;
        let json = if pretty {
            record::serialize_pretty(&records)?
        } else {
            record::serialize(&records)?
        };

        let mut out = stdout.lock();
        out.write_all(&json)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    conn.disconnect().await?;
    Ok(tables)
}

fn run_tui(database: &str, tables: Vec<String>) -> Result<Selection> {
    // Setup terminal
    enable_raw_mode()?;
    let _guard = TerminalGuard::new(restore_terminal);
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    Ok(run_app(&mut terminal, App::new(database, tables))?)
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!(error = %e, "failed to disable raw mode");
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
        warn!(error = %e, "failed to leave alternate screen");
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
