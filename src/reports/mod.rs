use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use mealforge::candidate::Candidate;
use mealforge::filters::FilterStats;
use mealforge::ga::{EpochSummary, Member};
use mealforge::pools::PoolResolution;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right(table: &mut Table, columns: std::ops::RangeInclusive<usize>) {
    for i in columns {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

pub fn print_pools(resolution: &PoolResolution) {
    let mut table = new_table();
    table.set_header(header(&["Pool", "Codes", "Members"]));
    for (name, codes) in resolution.pools.iter() {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(codes.len()),
            Cell::new(codes.join(", ")),
        ]);
    }
    align_right(&mut table, 1..=1);
    println!("\n{}", table);

    if !resolution.warnings.is_empty() {
        println!("\n⚠️  {} warning(s):", resolution.warnings.len());
        for w in &resolution.warnings {
            println!("   - {}", w);
        }
    }
}

pub fn print_candidates(candidates: &[Candidate], cursor: u64) {
    let mut table = new_table();
    table.set_header(header(&["#", "Items", "Notes"]));
    for (i, c) in candidates.iter().enumerate() {
        let mut notes: Vec<String> = c.rejection_reasons().to_vec();
        notes.extend(c.soft_nutrient_violations.iter().map(|v| {
            format!(
                "soft:{} {:.1} vs {:.1} ({})",
                v.nutrient, v.value, v.target, v.direction
            )
        }));
        notes.extend(c.leftover_under_use.iter().map(|u| u.warning()));
        let color = if c.is_clean() { Color::Green } else { Color::Red };
        table.add_row(vec![
            Cell::new(cursor + i as u64),
            Cell::new(c.describe()).fg(color),
            Cell::new(notes.join("\n")),
        ]);
    }
    align_right(&mut table, 0..=0);
    println!("\n{}", table);
}

pub fn print_filter_stats(stats: &[FilterStats]) {
    if stats.is_empty() {
        println!("\n(no filter stages configured)");
        return;
    }
    let mut table = new_table();
    table.set_header(header(&["Stage", "In", "Passed", "Rejected", "Pass %", "Reasons"]));
    for s in stats {
        let reasons = s
            .by_reason
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&s.stage).add_attribute(Attribute::Bold),
            Cell::new(s.input),
            Cell::new(s.passed).fg(Color::Green),
            Cell::new(s.rejected).fg(Color::Red),
            Cell::new(format!("{:.1}", s.pass_rate())),
            Cell::new(reasons),
        ]);
    }
    align_right(&mut table, 1..=4);
    println!("\n{}", table);
}

pub fn print_epochs(epochs: &[EpochSummary]) {
    let mut table = new_table();
    table.set_header(header(&[
        "Epoch", "Bred", "Immig", "Grad", "Culled", "Best", "Median", "Worst", "Turnover",
    ]));
    for e in epochs {
        let d = &e.diversity;
        table.add_row(vec![
            Cell::new(e.epoch),
            Cell::new(e.bred),
            Cell::new(e.immigrants),
            Cell::new(e.graduated),
            Cell::new(e.culled),
            Cell::new(format!("{:.3}", d.best_score)).fg(Color::Cyan),
            Cell::new(format!("{:.3}", d.median_score)),
            Cell::new(format!("{:.3}", d.worst_score)),
            Cell::new(format!("{:.0}%", d.elite_turnover * 100.0)),
        ]);
    }
    align_right(&mut table, 0..=8);
    println!("\n{}", table);
}

pub fn print_members(members: &[Member], top: usize) {
    let mut table = new_table();
    table.set_header(header(&["Id", "Fitness", "Tier", "Origin", "Born", "Meal"]));
    for m in members.iter().take(top) {
        let fitness = m
            .fitness()
            .map_or("-".to_string(), |f| format!("{:.3}", f.aggregate));
        table.add_row(vec![
            Cell::new(&m.id).add_attribute(Attribute::Bold),
            Cell::new(fitness).fg(Color::Cyan),
            Cell::new(m.tier),
            Cell::new(m.origin),
            Cell::new(m.birth_epoch),
            Cell::new(m.description()),
        ]);
    }
    align_right(&mut table, 1..=1);
    println!("\n{}", table);
}
