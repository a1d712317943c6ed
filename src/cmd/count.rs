use crate::Context;
use clap::Args;
use mealforge::error::MfResult;
use mealforge::generator::CandidateGenerator;
use mealforge::pools::ResolvedPools;

#[derive(Args, Debug, Clone)]
pub struct CountArgs {
    #[arg(short, long)]
    pub meal_type: String,

    #[arg(short, long)]
    pub template: Option<String>,
}

pub fn run(args: CountArgs, ctx: &Context, pools: &ResolvedPools) -> MfResult<()> {
    let generator = CandidateGenerator::new(&ctx.config, pools);
    let count = generator.count_total_combinations(&args.meal_type, args.template.as_deref())?;
    println!("\n🔢 Combinations for '{}'", args.meal_type);
    println!("   raw:   {}", count.raw);
    println!("   valid: {}", count.valid);
    Ok(())
}
