use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "Client for the ad ledger services", long_about = None)]
struct Cli {
    /// Orchestrator base URL
    #[arg(long, default_value = "http://localhost:8081")]
    manager_url: String,

    /// Counter service base URL
    #[arg(long, default_value = "http://localhost:8080")]
    visits_url: String,

    /// Probe sender base URL
    #[arg(long, default_value = "http://localhost:8082")]
    sender_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Tracing {
    /// Mark storage operations traced
    #[arg(long)]
    classic_tracing: bool,

    /// Trace with spans propagated across services
    #[arg(long)]
    otel_tracing: bool,
}

impl Tracing {
    fn query(&self) -> [(&'static str, String); 2] {
        [
            ("classic_tracing", self.classic_tracing.to_string()),
            ("otel_tracing", self.otel_tracing.to_string()),
        ]
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an advertisement
    CreateAd {
        advertiser: String,
        site: String,
        /// day, week, month or year
        active_to: String,
        #[command(flatten)]
        tracing: Tracing,
    },
    /// List advertisements of an advertiser with their bump counts
    QueryBumps {
        advertiser: String,
        #[command(flatten)]
        tracing: Tracing,
    },
    /// Give an advertisement a fresh rate
    ResetupAd {
        advertiser: String,
        site: String,
        ad_id: i64,
        #[command(flatten)]
        tracing: Tracing,
    },
    /// Count one visit on a rate
    BumpUp { rate_id: i64 },
    /// Run the propagation probe through sender and receiver
    Probe {
        /// Call without a client span
        #[arg(long)]
        plain: bool,
        #[arg(long)]
        classic_tracing: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let request = match cli.command {
        Commands::CreateAd {
            advertiser,
            site,
            active_to,
            tracing,
        } => client
            .post(format!("{}/create_ad", cli.manager_url))
            .query(&[
                ("advertiser", advertiser),
                ("site", site),
                ("active_to", active_to),
            ])
            .query(&tracing.query()),
        Commands::QueryBumps {
            advertiser,
            tracing,
        } => client
            .get(format!("{}/query_bumps/{}", cli.manager_url, advertiser))
            .query(&tracing.query()),
        Commands::ResetupAd {
            advertiser,
            site,
            ad_id,
            tracing,
        } => client
            .post(format!("{}/resetup_ad", cli.manager_url))
            .query(&[
                ("advertiser", advertiser),
                ("site", site),
                ("ad_id", ad_id.to_string()),
            ])
            .query(&tracing.query()),
        Commands::BumpUp { rate_id } => {
            client.post(format!("{}/bump_up/{}", cli.visits_url, rate_id))
        }
        Commands::Probe {
            plain,
            classic_tracing,
        } => {
            let endpoint = if plain { "poke" } else { "parent_span" };
            client
                .get(format!("{}/{}", cli.sender_url, endpoint))
                .query(&[("classic_tracing", classic_tracing)])
        }
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
