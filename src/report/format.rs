//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline code stays free of presentation concerns.

use crate::data::DatasetStats;
use crate::domain::{AnimalObservation, BatchConfig, PricedObservation};
use crate::io::MetadataRecord;

/// Summary of a generated dataset: sampling settings, shares, and price range.
pub fn format_dataset_summary(stats: &DatasetStats, config: &BatchConfig) -> String {
    let mut out = String::new();

    out.push_str("=== herdval - synthetic valuation dataset ===\n");
    out.push_str(&format!(
        "Requested: n={} | seed={} | parallel={}\n",
        config.count, config.seed, config.parallel
    ));
    out.push_str(&format!(
        "Generated: n={} | skipped={}\n",
        stats.n_entries,
        config.count.saturating_sub(stats.n_entries)
    ));
    out.push_str(&format!(
        "Healthy: {} ({:.1}%, target {:.1}%)\n",
        stats.n_healthy,
        pct(stats.n_healthy, stats.n_entries),
        config.healthy_probability * 100.0
    ));
    out.push_str(&format!(
        "Male: {} ({:.1}%)\n",
        stats.n_male,
        pct(stats.n_male, stats.n_entries)
    ));
    out.push_str(&format!(
        "Price: min={} | mean={:.1} | max={}\n",
        stats.price_min, stats.price_mean, stats.price_max
    ));

    out
}

/// Table of the first `limit` entries.
pub fn format_entries(entries: &[PricedObservation], limit: usize) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<6} {:<6} {:>5} {:>8} {:<32}", "#", "sex", "age", "price", "health").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<6} {:-<5} {:-<8} {:-<32}", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, e) in entries.iter().take(limit).enumerate() {
        let health: Vec<&str> = e.input.health.iter().collect();
        out.push_str(
            format!(
                "{:<6} {:<6} {:>5} {:>8} {:<32}",
                i + 1,
                format!("{:?}", e.input.sex),
                e.input.age.to_string(),
                e.price,
                truncate(&health.join(","), 32),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if entries.len() > limit {
        out.push_str(&format!("... {} more\n", entries.len() - limit));
    }

    out
}

/// Human-readable view of one normalized observation.
pub fn format_observation(observation: &AnimalObservation, record: &MetadataRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("Animal: {}\n", observation.animal_id));
    out.push_str(&format!("Captured: {}\n", observation.timestamp.to_rfc3339()));
    out.push_str(&format!(
        "Breed: {} ({:.2})\n",
        observation.breed.label(),
        observation.breed_confidence.value()
    ));
    out.push_str(&format!("Age: {}\n", observation.age));
    out.push_str(&format!("Sex: {:?}\n", observation.sex));

    let conditions: Vec<&str> = observation.conditions.iter().collect();
    out.push_str(&format!(
        "Health: {:?} [{}]\n",
        record.health_status,
        conditions.join(", ")
    ));
    for finding in &observation.findings {
        out.push_str(&format!("  - {} ({:.2})\n", finding.label, finding.confidence.value()));
    }
    if let Some(price) = record.price {
        out.push_str(&format!("Price: {price}\n"));
    }
    if !record.degraded.is_empty() {
        out.push_str(&format!("Degraded: {}\n", record.degraded.join(", ")));
    }
    out
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Age, AgeBucket, ConditionSet, Sex, ValuationInput};

    fn entry(sex: Sex, years: u8, labels: &[&str], price: i64) -> PricedObservation {
        PricedObservation {
            input: ValuationInput {
                sex,
                age: Age::Bucket(AgeBucket::new(years).unwrap()),
                health: ConditionSet::from_labels(labels.iter().copied()),
            },
            price,
        }
    }

    #[test]
    fn entries_table_truncates_to_limit() {
        let entries = vec![
            entry(Sex::Male, 2, &["healthy"], 4600),
            entry(Sex::Female, 9, &["lumpy", "Skin"], 1800),
            entry(Sex::Female, 4, &["healthy"], 3700),
        ];
        let table = format_entries(&entries, 2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].contains("Male"));
        assert!(lines[3].contains("Skin,lumpy"));
        assert_eq!(lines[4], "... 1 more");
    }

    #[test]
    fn summary_reports_shares() {
        let stats = DatasetStats {
            n_entries: 10,
            n_healthy: 7,
            n_male: 4,
            price_min: 1000,
            price_max: 5000,
            price_mean: 3000.0,
        };
        let config = BatchConfig {
            count: 10,
            ..BatchConfig::default()
        };
        let text = format_dataset_summary(&stats, &config);
        assert!(text.contains("Healthy: 7 (70.0%, target 70.0%)"));
        assert!(text.contains("Male: 4 (40.0%)"));
        assert!(text.contains("skipped=0"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Dermatitis", 5), "Derm.");
        assert_eq!(truncate("Skin", 5), "Skin");
    }
}
