use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::error::Error;

#[derive(Parser)]
#[command(name = "global-search-cli")]
#[command(about = "Global Search CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search orders
    Search {
        /// Free-text term
        #[arg(value_name = "TERM", default_value = "")]
        term: String,

        /// Match the term exactly instead of fuzzily
        #[arg(short = 'x', long)]
        exact: bool,

        /// Categorical filter, FIELD=VALUE (repeatable)
        #[arg(short, long, value_name = "FIELD=VALUE")]
        filter: Vec<String>,

        /// Date range filter, FIELD=START..END with yyyy-MM-dd dates (repeatable)
        #[arg(short, long, value_name = "FIELD=START..END")]
        date: Vec<String>,

        /// Only records owned by this user
        #[arg(short, long)]
        owner: Option<String>,

        /// Caller may see federally restricted records
        #[arg(long)]
        federal_access: bool,

        /// Allowed sensitivity levels; enables the sensitivity check
        #[arg(short, long)]
        levels: Option<String>,
    },

    /// Show the field catalog
    Catalog,

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Search {
            term,
            exact,
            filter,
            date,
            owner,
            federal_access,
            levels,
        } => {
            let mut filters: Map<String, Value> = Map::new();
            for entry in &filter {
                let (field, value) = split_pair(entry, '=')?;
                let values = filters.entry(field).or_insert_with(|| json!([]));
                if let Value::Array(values) = values {
                    values.push(json!(value));
                }
            }

            let mut dates: Map<String, Value> = Map::new();
            for entry in &date {
                let (field, range) = split_pair(entry, '=')?;
                let (start, end) = range
                    .split_once("..")
                    .ok_or_else(|| format!("expected START..END in '{}'", entry))?;
                dates.insert(field, json!({ "startDate": start, "endDate": end }));
            }

            let mut request = client
                .post(format!("{}/v1/search", cli.endpoint))
                .header(
                    "X-Federal-Access",
                    if federal_access { "Yes" } else { "No" },
                )
                .json(&json!({
                    "term": term,
                    "matchType": if exact { "exact" } else { "fuzzy" },
                    "filters": filters,
                    "dates": dates,
                    "owner": owner,
                }));
            if let Some(levels) = levels {
                request = request
                    .header("X-Sensitivity-Check", "true")
                    .header("X-Sensitivity-Levels", levels);
            }

            let response = request.send().await?;
            let body: Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Catalog => {
            let response = client
                .get(format!("{}/v1/catalog", cli.endpoint))
                .send()
                .await?;

            let body: Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn split_pair(entry: &str, sep: char) -> Result<(String, String), String> {
    entry
        .split_once(sep)
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected FIELD{}VALUE, got '{}'", sep, entry))
}
