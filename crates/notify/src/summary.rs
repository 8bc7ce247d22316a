//! Renders a classified cross-section into digest text.
//!
//! All stored factor values are fractions; this module is the single place
//! that multiplies by 100 for display.

use chrono::{DateTime, Utc};
use factor_pulse_data::FactorRecord;
use std::fmt::Write as _;

/// Telegram rejects messages beyond this length.
const MAX_DIGEST_CHARS: usize = 4096;

const OUTLIERS_SHOWN: usize = 5;
const BREAKOUTS_SHOWN: usize = 3;
const OVERSOLD_SHOWN: usize = 2;

/// Breadth percentage beyond which the market reads as one-sided.
const SENTIMENT_THRESHOLD_PCT: f64 = 60.0;

/// Momentum breakout scan: strong benchmark-relative move on unusual volume.
const BREAKOUT_MOMENTUM: f64 = 0.05;
const BREAKOUT_VOLUME_Z: f64 = 1.5;

/// Oversold bounce scan: stretched below the mean but composite not broken.
const OVERSOLD_Z: f64 = -2.0;
const OVERSOLD_COMPOSITE_FLOOR: f64 = -0.3;

fn pct(fraction: f64) -> f64 {
    fraction * 100.0
}

fn outliers_of<'a>(records: &'a [FactorRecord], side: &str) -> Vec<&'a FactorRecord> {
    let mut out: Vec<&FactorRecord> = records
        .iter()
        .filter(|r| r.outlier_type.as_deref() == Some(side))
        .collect();
    out.sort_by(|a, b| {
        let sa = a.composite_score.unwrap_or(0.0);
        let sb = b.composite_score.unwrap_or(0.0);
        if side == "bottom" {
            sa.partial_cmp(&sb)
        } else {
            sb.partial_cmp(&sa)
        }
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.symbol.cmp(&b.symbol))
    });
    out.truncate(OUTLIERS_SHOWN);
    out
}

fn write_outlier_line(text: &mut String, rank: usize, record: &FactorRecord) {
    let _ = write!(text, "{}. {}", rank, record.symbol);
    if let Some(score) = record.composite_score {
        let _ = write!(text, "  score {score:+.2}");
    }
    if let Some(momentum) = record.momentum_24h {
        let _ = write!(text, "  24h {:+.1}%", pct(momentum));
    }
    text.push('\n');
}

/// Renders the digest: market overview, top/bottom outliers, opportunity
/// scans. Truncated to the transport limit on a char boundary.
#[must_use]
pub fn render_digest(
    records: &[FactorRecord],
    timestamp: DateTime<Utc>,
    degraded_limits: bool,
) -> String {
    let mut text = String::new();
    text.push_str("\u{1F4CA} Crypto Factor Pulse\n");
    let _ = writeln!(text, "As of {}", timestamp.format("%Y-%m-%d %H:%M UTC"));
    text.push('\n');

    let scored: Vec<&FactorRecord> = records
        .iter()
        .filter(|r| r.composite_score.is_some())
        .collect();

    if scored.is_empty() {
        text.push_str("No factor data available this cycle.\n");
        return text;
    }

    let bullish = scored
        .iter()
        .filter(|r| r.composite_score.unwrap_or(0.0) > 0.0)
        .count();
    let bearish = scored
        .iter()
        .filter(|r| r.composite_score.unwrap_or(0.0) < 0.0)
        .count();
    let bullish_pct = 100.0 * bullish as f64 / scored.len() as f64;
    let bearish_pct = 100.0 * bearish as f64 / scored.len() as f64;

    let sentiment = if bullish_pct > SENTIMENT_THRESHOLD_PCT {
        "\u{1F7E2} Bullish"
    } else if bearish_pct > SENTIMENT_THRESHOLD_PCT {
        "\u{1F534} Bearish"
    } else {
        "\u{1F7E1} Neutral"
    };

    let momenta: Vec<f64> = records.iter().filter_map(|r| r.momentum_24h).collect();
    let avg_momentum = if momenta.is_empty() {
        None
    } else {
        Some(momenta.iter().sum::<f64>() / momenta.len() as f64)
    };

    let volume_spikes = records
        .iter()
        .filter(|r| r.volume_anomaly_zscore.unwrap_or(0.0) > 2.0)
        .count();

    let _ = writeln!(text, "Market State: {sentiment}");
    let _ = writeln!(
        text,
        "Bullish: {bullish_pct:.1}% | Bearish: {bearish_pct:.1}%"
    );
    if let Some(avg) = avg_momentum {
        let _ = writeln!(text, "Avg 24h momentum: {:+.1}%", pct(avg));
    }
    let _ = writeln!(text, "High volume anomalies: {volume_spikes}");
    if degraded_limits {
        text.push_str("\u{26A0} Data source rate limited this cycle\n");
    }

    let tops = outliers_of(records, "top");
    if !tops.is_empty() {
        text.push_str("\n\u{1F680} Top Outliers\n");
        for (i, record) in tops.iter().enumerate() {
            write_outlier_line(&mut text, i + 1, record);
        }
    }

    let bottoms = outliers_of(records, "bottom");
    if !bottoms.is_empty() {
        text.push_str("\n\u{1F4C9} Bottom Outliers\n");
        for (i, record) in bottoms.iter().enumerate() {
            write_outlier_line(&mut text, i + 1, record);
        }
    }

    // Breakouts rank by composite descending, oversold bounces by how
    // stretched the z-score is; each section carries its own cap so a flood
    // of one kind never crowds out the other.
    let mut breakouts: Vec<(f64, String)> = Vec::new();
    let mut oversold: Vec<(f64, String)> = Vec::new();
    for record in &scored {
        if let (Some(momentum), Some(vol_z), Some(score)) = (
            record.momentum_24h,
            record.volume_anomaly_zscore,
            record.composite_score,
        ) {
            if momentum > BREAKOUT_MOMENTUM && vol_z > BREAKOUT_VOLUME_Z {
                breakouts.push((
                    score,
                    format!(
                        "BREAKOUT {}: 24h {:+.1}% on {:.1}x volume z",
                        record.symbol,
                        pct(momentum),
                        vol_z
                    ),
                ));
            }
        }
        if let (Some(z), Some(score)) = (record.meanrev_zscore, record.composite_score) {
            if z < OVERSOLD_Z && score > OVERSOLD_COMPOSITE_FLOOR {
                oversold.push((
                    z,
                    format!("OVERSOLD {}: z {:.1}, score {:+.2}", record.symbol, z, score),
                ));
            }
        }
    }
    breakouts.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    breakouts.truncate(BREAKOUTS_SHOWN);
    oversold.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    oversold.truncate(OVERSOLD_SHOWN);

    if !breakouts.is_empty() || !oversold.is_empty() {
        text.push_str("\n\u{1F4A1} Top Opportunities\n");
        for (_, line) in breakouts.iter().chain(&oversold) {
            let _ = writeln!(text, "- {line}");
        }
    }

    truncate_to_limit(text)
}

fn truncate_to_limit(mut text: String) -> String {
    if text.chars().count() > MAX_DIGEST_CHARS {
        text = text.chars().take(MAX_DIGEST_CHARS - 1).collect();
        text.push('\u{2026}');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(symbol: &str, score: Option<f64>) -> FactorRecord {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut r = FactorRecord::empty(symbol, ts, ts);
        r.composite_score = score;
        r
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_momentum_fraction_renders_as_percent_exactly_once() {
        let mut r = record("ETHUSDT", Some(0.8));
        r.momentum_24h = Some(0.05);
        r.is_outlier = true;
        r.outlier_type = Some("top".to_string());
        let text = render_digest(&[r], ts(), false);
        // 0.05 is 5.0%, never 500% or 0.05%.
        assert!(text.contains("+5.0%"), "digest was: {text}");
        assert!(!text.contains("500"));
        assert!(!text.contains("+0.1%"));
    }

    #[test]
    fn test_sentiment_needs_over_sixty_percent() {
        // 6 of 10 bullish is exactly 60%: not enough for a bullish read.
        let mut records: Vec<FactorRecord> = (0..6)
            .map(|i| record(&format!("UP{i}"), Some(0.2)))
            .collect();
        records.extend((0..4).map(|i| record(&format!("DN{i}"), Some(-0.2))));
        let text = render_digest(&records, ts(), false);
        assert!(text.contains("Neutral"));

        records.push(record("UP9", Some(0.3)));
        let text = render_digest(&records, ts(), false);
        assert!(text.contains("Bullish: 63.6%"));
        assert!(text.contains("\u{1F7E2} Bullish"));
    }

    #[test]
    fn test_top_five_outliers_listed_best_first() {
        let mut records: Vec<FactorRecord> = (0..8)
            .map(|i| {
                let mut r = record(&format!("SYM{i}"), Some(f64::from(i) / 10.0));
                r.is_outlier = true;
                r.outlier_type = Some("top".to_string());
                r
            })
            .collect();
        records.reverse();
        let text = render_digest(&records, ts(), false);
        let sym7 = text.find("SYM7").unwrap();
        let sym3 = text.find("SYM3").unwrap();
        assert!(sym7 < sym3);
        // Only five shown.
        assert!(!text.contains("SYM2\n"));
    }

    #[test]
    fn test_breakout_opportunity_listed() {
        let mut r = record("SOLUSDT", Some(0.4));
        r.momentum_24h = Some(0.08);
        r.volume_anomaly_zscore = Some(2.5);
        let text = render_digest(&[r], ts(), false);
        assert!(text.contains("BREAKOUT SOLUSDT"));
    }

    #[test]
    fn test_breakouts_ranked_by_composite_capped_at_three() {
        // Weakest composites come first in record order; ranking must not
        // follow that order.
        let records: Vec<FactorRecord> = (0..5)
            .map(|i| {
                let mut r = record(&format!("BRK{i}"), Some(f64::from(i) / 10.0));
                r.momentum_24h = Some(0.10);
                r.volume_anomaly_zscore = Some(2.0);
                r
            })
            .collect();
        let text = render_digest(&records, ts(), false);
        assert!(text.find("BRK4").unwrap() < text.find("BRK3").unwrap());
        assert!(text.contains("BRK2"));
        assert!(!text.contains("BRK1"));
        assert!(!text.contains("BRK0"));
    }

    #[test]
    fn test_oversold_ranked_most_stretched_capped_at_two() {
        let mut records = Vec::new();
        for (i, z) in [-2.1, -3.0, -2.5].iter().enumerate() {
            let mut r = record(&format!("OSL{i}"), Some(-0.1));
            r.meanrev_zscore = Some(*z);
            records.push(r);
        }
        let text = render_digest(&records, ts(), false);
        // Deepest z first, least-stretched candidate cut by the cap.
        assert!(text.find("OSL1").unwrap() < text.find("OSL2").unwrap());
        assert!(!text.contains("OSL0"));
    }

    #[test]
    fn test_oversold_opportunity_listed() {
        let mut r = record("ADAUSDT", Some(-0.1));
        r.meanrev_zscore = Some(-2.4);
        let text = render_digest(&[r], ts(), false);
        assert!(text.contains("OVERSOLD ADAUSDT"));
    }

    #[test]
    fn test_empty_cross_section() {
        let text = render_digest(&[record("NULL", None)], ts(), false);
        assert!(text.contains("No factor data"));
    }

    #[test]
    fn test_degraded_limits_note() {
        let text = render_digest(&[record("BTCUSDT", Some(0.1))], ts(), true);
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn test_truncated_to_transport_limit() {
        let long = "x".repeat(MAX_DIGEST_CHARS * 2);
        let truncated = truncate_to_limit(long);
        assert_eq!(truncated.chars().count(), MAX_DIGEST_CHARS);
        assert!(truncated.ends_with('\u{2026}'));

        let short = truncate_to_limit("short digest".to_string());
        assert_eq!(short, "short digest");
    }
}
