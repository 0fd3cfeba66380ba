//! sheetfeed CLI - read and edit spreadsheets on the feed service

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sheetfeed_client::{
    CellAddress, CellQuery, ReqwestClient, RetryPolicy, RowRecord, SessionConfig,
    SpreadsheetSession,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetfeed")]
#[command(author, version, about = "Read and edit spreadsheets on the feed service")]
struct Cli {
    /// Account email
    #[arg(short, long, env = "SHEETFEED_EMAIL")]
    email: String,

    /// Account password
    #[arg(short, long, env = "SHEETFEED_PASSWORD", hide_env_values = true)]
    password: String,

    /// Trace-log every response body, pretty-printed
    #[arg(long, global = true)]
    raw: bool,

    /// Attempts per request while the service reports transient failures
    #[arg(long, default_value = "61", global = true)]
    attempts: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value = "30", global = true)]
    backoff: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Which worksheet a command works on
#[derive(Args)]
struct Target {
    /// Spreadsheet title
    #[arg(short, long)]
    spreadsheet: String,

    /// Worksheet title
    #[arg(short, long)]
    worksheet: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the spreadsheets visible to the account
    Spreadsheets,

    /// List the worksheets of a spreadsheet
    Worksheets {
        /// Spreadsheet title
        #[arg(short, long)]
        spreadsheet: String,
    },

    /// Print the header row and the number of data rows
    Columns {
        #[command(flatten)]
        target: Target,
    },

    /// Print cell values as tab-separated rows
    Cells {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        min_row: Option<u32>,

        #[arg(long)]
        max_row: Option<u32>,

        #[arg(long)]
        min_col: Option<u32>,

        #[arg(long)]
        max_col: Option<u32>,
    },

    /// Append a row, given as column=value pairs
    Insert {
        #[command(flatten)]
        target: Target,

        /// Create the worksheet with these columns when it is missing
        #[arg(long)]
        create: bool,

        #[arg(required = true, value_parser = parse_pair)]
        values: Vec<(String, String)>,
    },

    /// Set one cell
    Set {
        #[command(flatten)]
        target: Target,

        /// Cell in A1 notation
        cell: String,

        value: String,
    },

    /// Delete the last row matching column=value pairs
    Delete {
        #[command(flatten)]
        target: Target,

        #[arg(required = true, value_parser = parse_pair)]
        matching: Vec<(String, String)>,
    },
}

type Session = SpreadsheetSession<ReqwestClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.raw);

    let config = SessionConfig::default().with_retry(RetryPolicy {
        max_attempts: cli.attempts,
        backoff: Duration::from_secs(cli.backoff),
    });
    let client = ReqwestClient::new().context("Failed to create HTTP client")?;
    let mut session = SpreadsheetSession::new(client, config);

    session
        .authenticate(&cli.email, &cli.password)
        .await
        .context("Failed to log in")?;

    match cli.command {
        Commands::Spreadsheets => list_spreadsheets(&session).await,
        Commands::Worksheets { spreadsheet } => list_worksheets(&mut session, &spreadsheet).await,
        Commands::Columns { target } => show_columns(&mut session, &target).await,
        Commands::Cells {
            target,
            min_row,
            max_row,
            min_col,
            max_col,
        } => {
            let query = CellQuery {
                min_row,
                max_row,
                min_col,
                max_col,
            };
            print_cells(&mut session, &target, query).await
        }
        Commands::Insert {
            target,
            create,
            values,
        } => insert_row(&mut session, &target, create, values).await,
        Commands::Set {
            target,
            cell,
            value,
        } => set_cell(&mut session, &target, &cell, &value).await,
        Commands::Delete { target, matching } => delete_row(&mut session, &target, matching).await,
    }
}

fn init_tracing(raw: bool) {
    let default = if raw {
        "warn,sheetfeed_client=trace"
    } else {
        "warn,sheetfeed_client=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected column=value, got '{s}'")),
    }
}

async fn select(session: &mut Session, target: &Target, columns: Option<&[&str]>) -> Result<()> {
    session
        .select_spreadsheet(&target.spreadsheet)
        .await
        .with_context(|| format!("Failed to open spreadsheet '{}'", target.spreadsheet))?;
    session
        .select_worksheet(&target.worksheet, columns)
        .await
        .with_context(|| format!("Failed to open worksheet '{}'", target.worksheet))?;
    Ok(())
}

async fn list_spreadsheets(session: &Session) -> Result<()> {
    for sheet in session.list_spreadsheets().await? {
        let updated = sheet.updated.map(|t| t.to_rfc3339()).unwrap_or_default();
        println!("{}\t{}\t{}", sheet.id, sheet.title, updated);
    }
    Ok(())
}

async fn list_worksheets(session: &mut Session, spreadsheet: &str) -> Result<()> {
    session
        .select_spreadsheet(spreadsheet)
        .await
        .with_context(|| format!("Failed to open spreadsheet '{spreadsheet}'"))?;

    for ws in session.list_worksheets().await? {
        println!(
            "{}\t{}\t{} rows x {} columns",
            ws.id,
            ws.title,
            ws.data_rows(),
            ws.columns
        );
    }
    Ok(())
}

async fn show_columns(session: &mut Session, target: &Target) -> Result<()> {
    select(session, target, None).await?;

    let columns = session.column_names().await?;
    for (col, name) in columns.iter() {
        let letters = sheetfeed_core::column_to_letters(col)?;
        println!("{letters}\t{name}");
    }
    println!("{} data rows", session.row_count().await?);
    Ok(())
}

async fn print_cells(session: &mut Session, target: &Target, query: CellQuery) -> Result<()> {
    select(session, target, None).await?;

    let grid = session.cell_rows(query).await?;
    if grid.is_empty() {
        eprintln!("Warning: No cells in range");
        return Ok(());
    }

    let first_col = query
        .min_col
        .or_else(|| grid.values().filter_map(|row| row.keys().next()).min().copied())
        .unwrap_or(1);
    let last_col = grid
        .values()
        .filter_map(|row| row.keys().next_back())
        .max()
        .copied()
        .unwrap_or(first_col);

    for row in grid.values() {
        let line: Vec<&str> = (first_col..=last_col)
            .map(|col| row.get(&col).map(String::as_str).unwrap_or(""))
            .collect();
        println!("{}", line.join("\t"));
    }
    Ok(())
}

async fn insert_row(
    session: &mut Session,
    target: &Target,
    create: bool,
    values: Vec<(String, String)>,
) -> Result<()> {
    let columns: Vec<&str> = values.iter().map(|(column, _)| column.as_str()).collect();
    select(session, target, create.then_some(columns.as_slice())).await?;

    let record: RowRecord = values.into_iter().collect();
    session
        .insert_row(&record)
        .await
        .context("Failed to insert row")?;
    eprintln!("Inserted 1 row into '{}'", target.worksheet);
    Ok(())
}

async fn set_cell(session: &mut Session, target: &Target, cell: &str, value: &str) -> Result<()> {
    let address =
        CellAddress::parse(cell).with_context(|| format!("Invalid cell address '{cell}'"))?;
    select(session, target, None).await?;

    session
        .update_cell(address.row, address.col, value)
        .await
        .with_context(|| format!("Failed to set {address}"))?;
    eprintln!("Set {address} in '{}'", target.worksheet);
    Ok(())
}

async fn delete_row(
    session: &mut Session,
    target: &Target,
    matching: Vec<(String, String)>,
) -> Result<()> {
    select(session, target, None).await?;

    let record: RowRecord = matching.into_iter().collect();
    if let Err(err) = session.delete_row(&record).await {
        if matches!(
            err,
            sheetfeed_client::SheetsError::Core(sheetfeed_core::Error::NoEntry)
        ) {
            bail!("No row in '{}' matches", target.worksheet);
        }
        return Err(err).context("Failed to delete row");
    }
    eprintln!("Deleted 1 row from '{}'", target.worksheet);
    Ok(())
}
