// Colored terminal output for keyword rankings and cluster summaries.
//
// All terminal formatting lives here; main.rs delegates display calls.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::topics::frequency::{KeywordFrequency, GLOBAL_GROUP};
use crate::topics::kmeans::{ClusterLabel, Clustering};

use super::truncate_chars;

/// Words shown per cluster in the summary line.
const SUMMARY_WORDS: usize = 8;

/// Display a keyword ranking table, one section per group.
pub fn display_keywords(table: &[KeywordFrequency]) {
    if table.is_empty() {
        println!("No keywords found. Are the cleaned posts empty?");
        return;
    }

    for (group, rows) in group_rows(table) {
        let title = if group == GLOBAL_GROUP {
            "Top keywords".to_string()
        } else {
            format!("Cluster {group}")
        };
        println!("\n{}", format!("=== {title} ===").bold());
        println!(
            "  {:>4}  {:<24} {:>6}",
            "Rank".dimmed(),
            "Word".dimmed(),
            "Count".dimmed(),
        );
        println!("  {}", "-".repeat(38).dimmed());

        let max = rows.first().map(|r| r.count).unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            println!(
                "  {:>4}. {:<24} {:>6}  {}",
                i + 1,
                truncate_chars(&row.word, 24),
                row.count,
                bar(row.count, max).cyan(),
            );
        }
    }
    println!();
}

/// Display cluster sizes alongside each cluster's leading keywords.
pub fn display_cluster_summary(clustering: &Clustering, cluster_keywords: &[KeywordFrequency]) {
    let total = clustering.assignments.len();
    println!(
        "\n{}",
        format!("=== Clusters ({} records, k = {}) ===", total, clustering.k()).bold()
    );

    let by_group = group_rows(cluster_keywords);
    for (i, size) in clustering.sizes().into_iter().enumerate() {
        let label = ClusterLabel(i).to_string();
        let share = if total == 0 {
            0.0
        } else {
            size as f64 / total as f64 * 100.0
        };
        let words: Vec<&str> = by_group
            .get(label.as_str())
            .map(|rows| rows.iter().take(SUMMARY_WORDS).map(|r| r.word.as_str()).collect())
            .unwrap_or_default();

        println!(
            "  {:<4} {:>6} {:>6}  {}",
            label.bold(),
            size,
            format!("{share:.1}%").dimmed(),
            truncate_chars(&words.join(", "), 72),
        );
    }

    if !clustering.converged {
        println!(
            "  {} k-means stopped after {} iterations without converging",
            "Warning:".yellow(),
            clustering.iterations
        );
    }
    println!();
}

fn group_rows(table: &[KeywordFrequency]) -> BTreeMap<&str, Vec<&KeywordFrequency>> {
    let mut groups: BTreeMap<&str, Vec<&KeywordFrequency>> = BTreeMap::new();
    for row in table {
        groups.entry(row.group.as_str()).or_default().push(row);
    }
    groups
}

/// Proportional bar, at most 20 cells wide.
fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let cells = (count * 20).div_ceil(max);
    "#".repeat(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(10, 10).len(), 20);
        assert_eq!(bar(5, 10).len(), 10);
        assert_eq!(bar(1, 100).len(), 1);
        assert_eq!(bar(3, 0), "");
    }

    #[test]
    fn test_group_rows_keeps_table_order_within_group() {
        let row = |g: &str, w: &str| KeywordFrequency {
            group: g.to_string(),
            word: w.to_string(),
            count: 1,
        };
        let table = vec![row("C2", "humo"), row("C1", "robo"), row("C2", "fuego")];
        let groups = group_rows(&table);
        let c2: Vec<&str> = groups["C2"].iter().map(|r| r.word.as_str()).collect();
        assert_eq!(c2, vec!["humo", "fuego"]);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["C1", "C2"]);
    }
}
