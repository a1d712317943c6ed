use clap::{Parser, Subcommand};
use mealforge::config::PlannerConfig;
use mealforge::food::FoodTable;
use mealforge::pools::resolve_pools;
use mealforge::workspace::Workspace;
use std::process;
use tracing_subscriber::EnvFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Meal candidate generator and GA search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value = "data/config.json")]
    config: String,

    #[arg(global = true, short, long, default_value = "data/foods.csv")]
    foods: String,

    #[arg(global = true, short, long)]
    workspace: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print resolved component pools and resolution warnings
    Pools,
    /// Count raw and constraint-satisfying combinations
    Count(cmd::count::CountArgs),
    /// Generate one batch and run it through the filter pipeline
    Generate(cmd::generate::GenerateArgs),
    /// Run the genetic search
    Evolve(cmd::evolve::EvolveArgs),
}

/// Everything a subcommand needs, loaded once.
pub struct Context {
    pub config: PlannerConfig,
    pub foods: FoodTable,
    pub workspace: Option<Workspace>,
}

fn fatal(what: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}:", what);
    eprintln!("   {}", err);
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::load_from_file(&cli.config)
        .unwrap_or_else(|e| fatal("FAILED TO LOAD CONFIG", e));
    let foods =
        FoodTable::load_csv(&cli.foods).unwrap_or_else(|e| fatal("FAILED TO LOAD FOODS", e));
    let workspace = cli.workspace.as_ref().map(|path| {
        Workspace::load_from_file(path).unwrap_or_else(|e| fatal("FAILED TO LOAD WORKSPACE", e))
    });

    let ctx = Context {
        config,
        foods,
        workspace,
    };
    let resolution = resolve_pools(&ctx.config.component_pools, &ctx.foods);

    let outcome = match cli.command {
        Commands::Pools => {
            cmd::pools::run(&resolution);
            Ok(())
        }
        Commands::Count(args) => cmd::count::run(args, &ctx, &resolution.pools),
        Commands::Generate(args) => cmd::generate::run(args, &ctx, &resolution.pools),
        Commands::Evolve(args) => cmd::evolve::run(args, &ctx, &resolution.pools),
    };
    if let Err(e) = outcome {
        fatal("ERROR", e);
    }
}
