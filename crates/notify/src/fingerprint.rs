//! Coarsened content hashing for the dedup gate.
//!
//! Two digests that differ only in timestamp or in sub-granularity numeric
//! jitter must hash identically; a changed symbol list or a materially
//! different breadth must not.

use factor_pulse_core::config::DedupConfig;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

fn breadth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Bullish: ([\d.]+)% \| Bearish: ([\d.]+)%").unwrap_or_else(|e| panic!("{e}"))
    })
}

fn momentum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Avg 24h momentum: ([+-][\d.]+)%").unwrap_or_else(|e| panic!("{e}"))
    })
}

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Symbol mentions in outlier and opportunity lines.
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:\d+\. |- (?:BREAKOUT|OVERSOLD) )([A-Z0-9]{3,20})")
            .unwrap_or_else(|e| panic!("{e}"))
    })
}

fn round_to(value: f64, granularity: f64) -> f64 {
    (value / granularity).round() * granularity
}

/// Extracts the material facts of a rendered digest, coarsened per config.
/// The timestamp line never contributes.
fn extract_parts(text: &str, config: &DedupConfig) -> Vec<String> {
    let body: String = text
        .lines()
        .filter(|line| !line.starts_with("As of "))
        .collect::<Vec<_>>()
        .join("\n");

    let mut parts = Vec::new();

    if let Some(line) = body.lines().find(|l| l.starts_with("Market State:")) {
        parts.push(line.to_string());
    }

    if let Some(caps) = breadth_re().captures(&body) {
        for group in [1, 2] {
            if let Some(value) = caps.get(group).and_then(|m| m.as_str().parse::<f64>().ok()) {
                parts.push(format!(
                    "breadth:{:.1}",
                    round_to(value, config.breadth_granularity_pct)
                ));
            }
        }
    }

    if let Some(caps) = momentum_re().captures(&body) {
        if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            parts.push(format!(
                "momentum:{:.1}",
                round_to(value, config.momentum_granularity_pct)
            ));
        }
    }

    for caps in symbol_re().captures_iter(&body) {
        if let Some(symbol) = caps.get(1) {
            parts.push(format!("symbol:{}", symbol.as_str()));
        }
    }

    // The signature is a set of facts, not a layout: the same symbols in a
    // different rank order must hash identically.
    parts.sort();
    parts
}

/// SHA-256 over the coarsened parts, hex-encoded.
#[must_use]
pub fn content_hash(text: &str, config: &DedupConfig) -> String {
    let parts = extract_parts(text, config);
    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}
