use anyhow::Result;

use crate::config::QuillConfig;
use crate::journal::analytics;
use crate::journal::types::GroupBy;

/// Print journal statistics to the terminal.
pub fn stats(config: &QuillConfig, group_by: GroupBy) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let stats = analytics::get_statistics(&conn, group_by)?;
    let health = crate::db::check_database_health(&conn, Some(&db_path))?;

    println!("Journal Statistics");
    println!("{}", "=".repeat(40));
    println!("  Live entries:        {}", stats.total_entries);
    println!("  All entries:         {}", health.entry_count);
    println!("  Tags:                {}", health.tag_count);
    println!("  Relationships:       {}", stats.total_relationships);
    println!(
        "  Avg rels per entry:  {:.2}",
        stats.avg_relationships_per_entry
    );
    println!();

    println!("By Type:");
    let mut by_type: Vec<_> = stats.by_type.iter().collect();
    by_type.sort_by(|a, b| b.1.cmp(a.1));
    for (entry_type, count) in by_type {
        println!("  {entry_type:<24} {count}");
    }
    println!();

    println!("Activity per {}:", group_by.as_str());
    for bucket in stats.by_period.iter().take(12) {
        println!("  {:<10} {}", bucket.period, bucket.count);
    }
    if let Some(growth) = stats.period_growth_pct {
        println!("  growth vs previous {}: {growth:+.1}%", group_by.as_str());
    }
    println!();

    println!("Causal links:");
    for relation_type in crate::journal::types::RelationType::CAUSAL {
        let count = stats
            .causal_counts
            .get(relation_type.as_str())
            .copied()
            .unwrap_or(0);
        println!("  {:<12} {count}", relation_type.as_str());
    }
    println!();
    println!("Database size:         {} bytes", health.db_size_bytes);

    Ok(())
}
