//! tally-cli: command-line client for the Tally personal finance API
//!
//! Thin blocking HTTP client over the REST endpoints. Every subcommand prints a
//! human-readable rendering by default, or the raw response body with `--json`.
//!
//! # Subcommands
//! - `status`                                       : liveness + store diagnostic
//! - `add <amount> <type> <category> [--date] [--notes]`
//! - `list [-n <limit>]`                            : recent transactions
//! - `summary [--month YYYY-MM]`
//! - `budget --month --category --limit`            : add a budget
//! - `budgets [--month]`
//! - `chat <message> [--month] [--session]`

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
const DEFAULT_LIMIT: u32 = 20;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "tally-cli", version, about = "Tally personal finance assistant CLI")]
struct Cli {
    /// Tally HTTP server URL (overrides TALLY_HTTP_URL env var)
    #[arg(long, env = "TALLY_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show server and store status
    Status,

    /// Record a transaction
    Add {
        amount: f64,

        /// "expense" or "income"
        kind: String,

        category: String,

        /// Calendar date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List recorded transactions
    List {
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Income, expense and category totals for a month (or all time)
    Summary {
        #[arg(long)]
        month: Option<String>,
    },

    /// Set a monthly spending limit for a category
    Budget {
        #[arg(long)]
        month: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        limit: f64,
    },

    /// List budgets
    Budgets {
        #[arg(long)]
        month: Option<String>,
    },

    /// Ask the finance assistant a question
    Chat {
        message: String,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TransactionItem {
    pub id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub date: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BudgetItem {
    pub id: String,
    pub month: String,
    pub category: String,
    pub limit: f64,
}

#[derive(Debug, Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

/// Category maps arrive as JSON objects and render in key order.
#[derive(Debug, Deserialize)]
pub struct SummaryBody {
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    pub categories: serde_json::Map<String, Value>,
    pub budgets: serde_json::Map<String, Value>,
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_transaction(t: &TransactionItem) -> String {
    let sign = if t.kind == "income" { '+' } else { '-' };
    let mut line = format!("{}  {}{:>10.2}  {}", t.date, sign, t.amount, t.category);
    if let Some(notes) = t.notes.as_deref().filter(|n| !n.is_empty()) {
        line.push_str(&format!("  ({})", notes));
    }
    line
}

pub fn render_summary(s: &SummaryBody, month: Option<&str>) -> String {
    let mut out = vec![
        format!("Period:   {}", month.unwrap_or("all time")),
        format!("Income:   {:.2}", s.income),
        format!("Expense:  {:.2}", s.expense),
        format!("Net:      {:.2}", s.net),
    ];

    if !s.categories.is_empty() {
        out.push("Spending by category:".to_string());
        for (category, spent) in &s.categories {
            let spent = spent.as_f64().unwrap_or(0.0);
            match s.budgets.get(category).and_then(Value::as_f64) {
                Some(limit) => out.push(format!("  {:<16} {:>10.2} / {:.2}", category, spent, limit)),
                None => out.push(format!("  {:<16} {:>10.2}", category, spent)),
            }
        }
    }

    let unspent: Vec<_> = s
        .budgets
        .iter()
        .filter(|(c, _)| !s.categories.contains_key(*c))
        .collect();
    if !unspent.is_empty() {
        out.push("Budgets with no spending:".to_string());
        for (category, limit) in unspent {
            out.push(format!("  {:<16} {:>10.2}", category, limit.as_f64().unwrap_or(0.0)));
        }
    }

    out.join("\n")
}

pub fn render_budget(b: &BudgetItem) -> String {
    format!("{}  {:<16} {:>10.2}", b.month, b.category, b.limit)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Send a request and return the JSON body, exiting with the server's error
/// message on a non-success status.
fn call(request: reqwest::blocking::RequestBuilder, url: &str) -> anyhow::Result<Value> {
    let resp = match request.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("tally-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("no details");
        eprintln!("tally-cli: server returned {}: {}", status, message);
        std::process::exit(1);
    }
    Ok(body)
}

fn get(server: &str, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
    let url = format!("{}{}", server, path);
    call(client()?.get(&url).query(query), &url)
}

fn post(server: &str, path: &str, body: &Value) -> anyhow::Result<Value> {
    let url = format!("{}{}", server, path);
    call(client()?.post(&url).json(body), &url)
}

fn month_query(month: &Option<String>) -> Vec<(&'static str, String)> {
    month.iter().map(|m| ("month", m.clone())).collect()
}

fn print_json(body: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

fn do_status(server: &str, json_output: bool) -> anyhow::Result<()> {
    let root = get(server, "/", &[])?;
    let diag = get(server, "/test", &[])?;
    if json_output {
        return print_json(&json!({ "root": root, "test": diag }));
    }
    println!("Server:       {}", root["message"].as_str().unwrap_or("?"));
    println!("Store:        {}", diag["store_backend"].as_str().unwrap_or("?"));
    println!("Database:     {}", diag["database"].as_str().unwrap_or("?"));
    println!("Connection:   {}", diag["connection_status"].as_str().unwrap_or("?"));
    let collections: Vec<&str> = diag["collections"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    println!("Collections:  {}", collections.join(", "));
    Ok(())
}

fn run(server: &str, json_output: bool, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Status => do_status(server, json_output),

        Commands::Add { amount, kind, category, date, notes } => {
            let date = date.unwrap_or_else(today);
            let mut payload = json!({
                "amount": amount,
                "type": kind,
                "category": category,
                "date": date,
            });
            if let Some(n) = notes {
                payload["notes"] = json!(n);
            }
            let body = post(server, "/api/transactions", &payload)?;
            if json_output {
                return print_json(&body);
            }
            println!("Recorded transaction {}", body["id"].as_str().unwrap_or("?"));
            Ok(())
        }

        Commands::List { limit } => {
            let body = get(server, "/api/transactions", &[("limit", limit.to_string())])?;
            if json_output {
                return print_json(&body);
            }
            let list: Items<TransactionItem> = serde_json::from_value(body)?;
            if list.items.is_empty() {
                eprintln!("No transactions recorded");
            }
            for t in &list.items {
                println!("{}", render_transaction(t));
            }
            Ok(())
        }

        Commands::Summary { month } => {
            let body = get(server, "/api/summary", &month_query(&month))?;
            if json_output {
                return print_json(&body);
            }
            let summary: SummaryBody = serde_json::from_value(body)?;
            println!("{}", render_summary(&summary, month.as_deref()));
            Ok(())
        }

        Commands::Budget { month, category, limit } => {
            let payload = json!({ "month": month, "category": category, "limit": limit });
            let body = post(server, "/api/budgets", &payload)?;
            if json_output {
                return print_json(&body);
            }
            println!("Stored budget {}", body["id"].as_str().unwrap_or("?"));
            Ok(())
        }

        Commands::Budgets { month } => {
            let body = get(server, "/api/budgets", &month_query(&month))?;
            if json_output {
                return print_json(&body);
            }
            let list: Items<BudgetItem> = serde_json::from_value(body)?;
            if list.items.is_empty() {
                eprintln!("No budgets set");
            }
            for b in &list.items {
                println!("{}", render_budget(b));
            }
            Ok(())
        }

        Commands::Chat { message, month, session } => {
            let mut payload = json!({ "message": message });
            if let Some(m) = month {
                payload["month"] = json!(m);
            }
            if let Some(s) = session {
                payload["session_id"] = json!(s);
            }
            let body = post(server, "/api/chat", &payload)?;
            if json_output {
                return print_json(&body);
            }
            println!("{}", body["reply"].as_str().unwrap_or(""));
            Ok(())
        }
    }
}

/// Today's date in UTC as YYYY-MM-DD.
fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    if let Err(e) = run(&server, cli.json, cli.command) {
        eprintln!("tally-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
