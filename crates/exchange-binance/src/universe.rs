//! Daily universe construction from 24h ticker statistics.

use chrono::NaiveDate;
use factor_pulse_core::TickerStats;
use factor_pulse_data::UniverseEntry;
use rust_decimal::Decimal;
use std::collections::HashMap;

const QUOTE_ASSET: &str = "USDT";

// Leveraged tokens and fiat pairs that shadow a real market.
const EXCLUDED_SUFFIXES: &[&str] = &["UPUSDT", "DOWNUSDT", "BULLUSDT", "BEARUSDT"];

fn is_tradable(symbol: &str) -> bool {
    symbol.ends_with(QUOTE_ASSET)
        && !EXCLUDED_SUFFIXES.iter().any(|suffix| symbol.ends_with(suffix))
}

/// Ranks USDT-quoted symbols by 24h quote volume and keeps the top `top_n`.
///
/// Futures listings win over spot for the same symbol (funding and open
/// interest only exist there); spot-only symbols are still eligible.
/// Zero-volume tickers are dropped.
#[must_use]
pub fn build_universe(
    futures_tickers: &[TickerStats],
    spot_tickers: &[TickerStats],
    funding_cadence: &HashMap<String, u32>,
    default_cadence_hours: u32,
    top_n: usize,
    as_of_date: NaiveDate,
) -> Vec<UniverseEntry> {
    let mut by_symbol: HashMap<&str, (&TickerStats, bool)> = HashMap::new();

    for ticker in spot_tickers {
        if is_tradable(&ticker.symbol) && ticker.quote_volume > Decimal::ZERO {
            by_symbol.insert(&ticker.symbol, (ticker, false));
        }
    }
    for ticker in futures_tickers {
        if is_tradable(&ticker.symbol) && ticker.quote_volume > Decimal::ZERO {
            by_symbol.insert(&ticker.symbol, (ticker, true));
        }
    }

    let mut candidates: Vec<(&TickerStats, bool)> = by_symbol.into_values().collect();
    candidates.sort_by(|(a, _), (b, _)| {
        b.quote_volume
            .cmp(&a.quote_volume)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    candidates.truncate(top_n);

    candidates
        .into_iter()
        .map(|(ticker, is_perp)| UniverseEntry {
            symbol: ticker.symbol.clone(),
            exchange: "binance".to_string(),
            contract_type: if is_perp { "perpetual" } else { "spot" }.to_string(),
            quote_asset: QUOTE_ASSET.to_string(),
            quote_volume: ticker.quote_volume,
            funding_cadence_hours: if is_perp {
                Some(
                    funding_cadence
                        .get(&ticker.symbol)
                        .copied()
                        .unwrap_or(default_cadence_hours) as i32,
                )
            } else {
                None
            },
            as_of_date,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, quote_volume: Decimal) -> TickerStats {
        TickerStats {
            symbol: symbol.to_string(),
            last_price: dec!(1),
            quote_volume,
        }
    }

    #[test]
    fn test_ranked_by_quote_volume() {
        let futures = vec![
            ticker("BTCUSDT", dec!(900)),
            ticker("ETHUSDT", dec!(500)),
            ticker("SOLUSDT", dec!(700)),
        ];
        let universe = build_universe(&futures, &[], &HashMap::new(), 8, 2, date());
        let symbols: Vec<&str> = universe.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_futures_listing_wins_over_spot() {
        let spot = vec![ticker("ETHUSDT", dec!(999))];
        let futures = vec![ticker("ETHUSDT", dec!(500))];
        let universe = build_universe(&futures, &spot, &HashMap::new(), 8, 10, date());
        assert_eq!(universe.len(), 1);
        assert_eq!(universe[0].contract_type, "perpetual");
        assert_eq!(universe[0].funding_cadence_hours, Some(8));
    }

    #[test]
    fn test_spot_only_symbol_has_no_cadence() {
        let spot = vec![ticker("NEWUSDT", dec!(100))];
        let universe = build_universe(&[], &spot, &HashMap::new(), 8, 10, date());
        assert_eq!(universe[0].contract_type, "spot");
        assert_eq!(universe[0].funding_cadence_hours, None);
    }

    #[test]
    fn test_non_usdt_and_leveraged_excluded() {
        let futures = vec![
            ticker("BTCUSDC", dec!(900)),
            ticker("ETHUPUSDT", dec!(800)),
            ticker("BTCUSDT", dec!(700)),
        ];
        let universe = build_universe(&futures, &[], &HashMap::new(), 8, 10, date());
        assert_eq!(universe.len(), 1);
        assert_eq!(universe[0].symbol, "BTCUSDT");
    }

    #[test]
    fn test_cadence_override_applies() {
        let futures = vec![ticker("TRXUSDT", dec!(100))];
        let mut cadence = HashMap::new();
        cadence.insert("TRXUSDT".to_string(), 4);
        let universe = build_universe(&futures, &[], &cadence, 8, 10, date());
        assert_eq!(universe[0].funding_cadence_hours, Some(4));
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }
}
