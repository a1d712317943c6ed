use crate::reports;
use mealforge::pools::PoolResolution;

pub fn run(resolution: &PoolResolution) {
    println!(
        "\n📦 === COMPONENT POOLS ({} resolved) === 📦",
        resolution.pools.len()
    );
    reports::print_pools(resolution);
}
