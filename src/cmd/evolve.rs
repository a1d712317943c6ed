use crate::reports;
use crate::Context;
use clap::Args;
use mealforge::error::MfResult;
use mealforge::ga::{EpochSummary, GeneticEngine, Member, ProgressCallback};
use mealforge::pools::ResolvedPools;

#[derive(Args, Debug, Clone)]
pub struct EvolveArgs {
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Overrides `genetic.epochs_per_run`
    #[arg(short, long)]
    pub epochs: Option<usize>,

    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, summary: &EpochSummary, best: Option<&Member>) -> bool {
        println!("{}", summary);
        if let Some(m) = best {
            println!("     best: {}", m);
        }
        true
    }
}

pub fn run(args: EvolveArgs, ctx: &Context, pools: &ResolvedPools) -> MfResult<()> {
    let mut config = ctx.config.clone();
    if let Some(epochs) = args.epochs {
        config.genetic.epochs_per_run = epochs;
    }

    let mut engine = GeneticEngine::new(&config, pools, &ctx.foods, ctx.workspace.as_ref())?;
    println!("\n🧬 === GENETIC SEARCH === 🧬");
    print!("{}", engine.config().summary());

    let mut rng = if let Some(s) = args.seed {
        fastrand::Rng::with_seed(s)
    } else {
        fastrand::Rng::new()
    };

    let result = engine.run(&mut rng, ConsoleProgress);

    reports::print_epochs(&result.epochs);
    reports::print_members(&result.members, args.top);
    if result.converged {
        println!("\n🏁 Converged after {} epochs", result.epochs.len());
    } else {
        println!("\n🏁 Finished {} epochs", result.epochs.len());
    }
    Ok(())
}
