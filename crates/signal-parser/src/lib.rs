//! The signal grammar: turns a classifier answer into a typed [`Signal`].
//!
//! Two fixed-shape productions over a whitespace tokenizer, attempted in
//! order (they are mutually exclusive by construction — the entry production
//! requires `Leverage:`/`TP:`/`SL:` tokens the exit syntax never carries):
//!
//! ```text
//! entry := ASSET ("Long" | "Short") "Leverage:"NUM["x"] "TP:"NUM "SL:"NUM
//! exit  := ASSET "close" ("all" | PCT"%")
//! ```
//!
//! Matching is anchored at the start of the answer; trailing tokens are
//! ignored. Any answer matching neither production, or failing numeric or
//! range validation, degrades to [`Signal::Noise`] — the parser is total and
//! never returns an error to the caller.

use core_types::{Direction, EntrySignal, ExitMode, ExitSignal, Signal};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a classifier answer into a typed signal.
pub fn parse(label: &str) -> Signal {
    let label = label.trim();

    if label == "NOISE" {
        return Signal::Noise;
    }

    if let Some(entry) = parse_entry(label) {
        return Signal::Entry(entry);
    }

    if let Some(exit) = parse_exit(label) {
        return Signal::Exit(exit);
    }

    tracing::warn!(%label, "unparseable classifier answer, treating as noise");
    Signal::Noise
}

/// A bare asset token: ASCII alphanumerics and underscores only.
fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Entry production: `ASSET (Long|Short) Leverage:NUM[x] TP:NUM SL:NUM`.
fn parse_entry(label: &str) -> Option<EntrySignal> {
    let mut tokens = label.split_whitespace();

    let asset = tokens.next().filter(|t| is_word(t))?;
    let direction = match tokens.next()? {
        "Long" => Direction::Long,
        "Short" => Direction::Short,
        _ => return None,
    };
    let leverage = numeric_field(tokens.next()?, "Leverage:", true)?;
    let tp = numeric_field(tokens.next()?, "TP:", false)?;
    let sl = numeric_field(tokens.next()?, "SL:", false)?;

    Some(EntrySignal {
        asset: asset.to_string(),
        direction,
        leverage,
        tp,
        sl,
    })
}

/// Parses a `NAME:<value>` token. Classifiers write the leverage multiplier
/// as `5x`; one trailing `x` is stripped before numeric conversion.
fn numeric_field(token: &str, prefix: &str, strip_x: bool) -> Option<Decimal> {
    let value = token.strip_prefix(prefix)?;
    let value = if strip_x {
        value.strip_suffix('x').unwrap_or(value)
    } else {
        value
    };
    Decimal::from_str(value).ok()
}

/// Exit production: `ASSET close (all|PCT%)`.
fn parse_exit(label: &str) -> Option<ExitSignal> {
    let mut tokens = label.split_whitespace();

    let asset = tokens.next().filter(|t| is_word(t))?;
    if tokens.next()? != "close" {
        return None;
    }
    let value = tokens.collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        return None;
    }

    if value == "all" {
        return Some(ExitSignal {
            asset: asset.to_string(),
            mode: ExitMode::All,
        });
    }

    let percentage = parse_percentage(&value)?;
    if percentage <= Decimal::ZERO || percentage > Decimal::from(100) {
        tracing::warn!(%percentage, "exit percentage outside (0, 100], rejecting signal");
        return None;
    }

    Some(ExitSignal {
        asset: asset.to_string(),
        mode: ExitMode::Percentage(percentage),
    })
}

/// Accepts a decimal literal immediately followed by `%`, anchored at the
/// start of the value; out-of-range values are rejected by the caller, not
/// clamped.
fn parse_percentage(value: &str) -> Option<Decimal> {
    let end = value.find('%')?;
    let literal = &value[..end];

    let mut parts = literal.splitn(2, '.');
    let int_part = parts.next()?;
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(frac_part) = parts.next() {
        if frac_part.is_empty() || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    Decimal::from_str(literal).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn noise_label_is_noise() {
        assert_eq!(parse("NOISE"), Signal::Noise);
    }

    #[test]
    fn parses_entry_signal() {
        let signal = parse("BTC Long Leverage:5x TP:70000 SL:60000");
        assert_eq!(
            signal,
            Signal::Entry(EntrySignal {
                asset: "BTC".to_string(),
                direction: Direction::Long,
                leverage: dec!(5),
                tp: dec!(70000),
                sl: dec!(60000),
            })
        );
    }

    #[test]
    fn parses_short_entry_with_fractional_prices() {
        let signal = parse("DOGE Short Leverage:10 TP:0.11 SL:0.32");
        assert_eq!(
            signal,
            Signal::Entry(EntrySignal {
                asset: "DOGE".to_string(),
                direction: Direction::Short,
                leverage: dec!(10),
                tp: dec!(0.11),
                sl: dec!(0.32),
            })
        );
    }

    #[test]
    fn entry_with_bad_number_is_noise() {
        assert_eq!(parse("BTC Long Leverage:lots TP:70000 SL:60000"), Signal::Noise);
        assert_eq!(parse("BTC Long Leverage:5x TP:seventy SL:60000"), Signal::Noise);
    }

    #[test]
    fn entry_direction_must_be_exact() {
        assert_eq!(parse("BTC long Leverage:5x TP:70000 SL:60000"), Signal::Noise);
    }

    #[test]
    fn parses_exit_all() {
        assert_eq!(
            parse("ETH close all"),
            Signal::Exit(ExitSignal {
                asset: "ETH".to_string(),
                mode: ExitMode::All,
            })
        );
    }

    #[test]
    fn parses_exit_percentage() {
        assert_eq!(
            parse("ETH close 50%"),
            Signal::Exit(ExitSignal {
                asset: "ETH".to_string(),
                mode: ExitMode::Percentage(dec!(50)),
            })
        );
    }

    #[test]
    fn parses_fractional_percentage() {
        assert_eq!(
            parse("SOL close 33.5%"),
            Signal::Exit(ExitSignal {
                asset: "SOL".to_string(),
                mode: ExitMode::Percentage(dec!(33.5)),
            })
        );
    }

    #[test]
    fn out_of_range_percentage_is_rejected_not_clamped() {
        assert_eq!(parse("ETH close 150%"), Signal::Noise);
        assert_eq!(parse("ETH close 0%"), Signal::Noise);
    }

    #[test]
    fn exit_without_percent_sign_is_noise() {
        assert_eq!(parse("ETH close 50"), Signal::Noise);
    }

    #[test]
    fn free_text_is_noise() {
        assert_eq!(parse("gm everyone, big week ahead"), Signal::Noise);
        assert_eq!(parse(""), Signal::Noise);
        assert_eq!(parse("close all"), Signal::Noise);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            parse("  ETH close all\n"),
            Signal::Exit(ExitSignal {
                asset: "ETH".to_string(),
                mode: ExitMode::All,
            })
        );
    }

    #[test]
    fn trailing_tokens_after_entry_are_ignored() {
        // Matching is start-anchored, like the grammar it replaces.
        let signal = parse("BTC Long Leverage:5x TP:70000 SL:60000 (high conviction)");
        assert!(matches!(signal, Signal::Entry(_)));
    }

    #[test]
    fn asset_token_must_be_a_bare_word() {
        assert_eq!(parse("BTC/USDT Long Leverage:5x TP:70000 SL:60000"), Signal::Noise);
    }
}
