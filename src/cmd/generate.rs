use crate::reports;
use crate::Context;
use clap::Args;
use mealforge::error::MfResult;
use mealforge::filters::{FilterMode, PipelineParams};
use mealforge::generator::CandidateGenerator;
use mealforge::pools::ResolvedPools;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(short, long)]
    pub meal_type: String,

    #[arg(short, long)]
    pub template: Option<String>,

    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,

    #[arg(long, default_value_t = 0)]
    pub cursor: u64,

    /// Record every violation instead of stopping at the first failing stage
    #[arg(long, default_value_t = false)]
    pub collect_all: bool,

    /// Print survivors as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: GenerateArgs, ctx: &Context, pools: &ResolvedPools) -> MfResult<()> {
    let generator = CandidateGenerator::new(&ctx.config, pools);
    let template = ctx
        .config
        .generation_template(&args.meal_type, args.template.as_deref())?;
    let (candidates, next_cursor) = generator.generate_batch(
        &args.meal_type,
        args.count,
        args.cursor,
        Some(template.name.as_str()),
    )?;

    let mode = args.collect_all.then_some(FilterMode::CollectAll);
    let pipeline = PipelineParams::builder()
        .config(&ctx.config)
        .pools(pools)
        .foods(&ctx.foods)
        .template(&template)
        .workspace(ctx.workspace.as_ref())
        .mode(mode)
        .build()
        .build_pipeline()?;

    let generated = candidates.len();
    let report = pipeline.run(candidates);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "\n🍽️  === {} / {} ({} mode) === 🍽️",
        template.meal_type,
        template.name,
        pipeline.mode()
    );
    reports::print_candidates(&report.passed, args.cursor);
    reports::print_filter_stats(&report.stats);
    println!(
        "\n✅ {} of {} candidates passed, {} rejected",
        report.passed.len(),
        generated,
        report.rejected.len()
    );
    println!("➡️  Next cursor: {}", next_cursor);
    Ok(())
}
