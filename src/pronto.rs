//! The Pronto hex text format (C3): raw learned codes plus semantic
//! synthesis of the RC5/RC5X/RC6/RC6A families.
//!
//! Pronto hex is a sequence of 16-bit words written as 4-digit uppercase
//! hex. `word[0]` selects the sub-format: `0000`/`0100` is a raw, captured
//! waveform (everything else is expressed in Pronto clock ticks);
//! `5000`/`5001`/`6000`/`6001` are semantic RC5/RC5X/RC6/RC6A codes that
//! this module synthesises into a biphase RLC from device/command/toggle
//! fields rather than storing captured durations at all.

use crate::error::{IrError, Result};

/// Microseconds per Pronto clock tick.
pub const PRONTO_CLOCK: f64 = 0.241246;

/// RC5/RC5X half-bit cell width, in microseconds.
pub const RC5_HALF_CELL_US: i64 = 889;

/// RC6/RC6A half-bit cell width, in microseconds.
pub const RC6_HALF_CELL_US: i64 = 444;

/// Trailing gap appended after a synthesised RC5/RC6/RC6A frame.
const FRAME_GAP_US: i64 = 100_000;

/// Tick count appended as a trailing silent space when an RLC has an odd
/// number of durations, so encoded Pronto words always come in pairs.
const SIGNAL_FREE: u16 = 10_000;

const FMT_RAW_ONCE: u16 = 0x0000;
const FMT_RAW_LEARNED: u16 = 0x0100;
const FMT_RC5: u16 = 0x5000;
const FMT_RC5X: u16 = 0x5001;
const FMT_RC6: u16 = 0x6000;
const FMT_RC6A: u16 = 0x6001;

fn parse_words(pronto: &str) -> Result<Vec<u16>> {
    pronto
        .split_whitespace()
        .map(|w| u16::from_str_radix(w, 16).map_err(|_| IrError::InvalidPronto(format!("not a hex word: {w}"))))
        .collect()
}

fn format_words(words: &[u16]) -> String {
    words.iter().map(|w| format!("{w:04X}")).collect::<Vec<_>>().join(" ")
}

/// Decode Pronto hex text into `(frequency_hz, raw_rlc)`.
pub fn pronto_to_rlc(pronto: &str) -> Result<(u32, Vec<i64>)> {
    let words = parse_words(pronto)?;
    let format = *words.first().ok_or_else(|| IrError::InvalidPronto("empty code".into()))?;
    match format {
        FMT_RAW_ONCE | FMT_RAW_LEARNED => decode_raw(&words),
        FMT_RC5 => decode_rc5(&words, false),
        FMT_RC5X => decode_rc5(&words, true),
        FMT_RC6 => decode_rc6(&words, false),
        FMT_RC6A => decode_rc6(&words, true),
        other => Err(IrError::InvalidPronto(format!("unknown sub-format {other:04X}"))),
    }
}

fn decode_raw(words: &[u16]) -> Result<(u32, Vec<i64>)> {
    if words.len() < 4 {
        return Err(IrError::InvalidPronto("raw Pronto code missing header words".into()));
    }
    let divisor = words[1] as f64;
    if divisor == 0.0 {
        return Err(IrError::InvalidPronto("zero carrier divisor".into()));
    }
    let frequency_hz = (1_000_000.0 / (divisor * PRONTO_CLOCK)).round() as u32;
    let once_pairs = words[2] as usize;
    let repeat_pairs = words[3] as usize;
    let ticks = &words[4..];
    let expected = (once_pairs + repeat_pairs) * 2;
    if ticks.len() != expected {
        return Err(IrError::InvalidPronto(format!(
            "expected {expected} duration words, found {}",
            ticks.len()
        )));
    }
    let mut rlc = Vec::with_capacity(ticks.len());
    for (i, &tick) in ticks.iter().enumerate() {
        let us = (tick as f64 * PRONTO_CLOCK).round() as i64;
        rlc.push(if i % 2 == 0 { us } else { -us });
    }
    Ok((frequency_hz, rlc))
}

/// Encode a raw RLC into Pronto hex, as a single "once" sequence.
pub fn rlc_to_pronto(frequency_hz: u32, rlc: &[i64]) -> Result<String> {
    if frequency_hz == 0 {
        return Err(IrError::InvalidPronto("frequency must be nonzero".into()));
    }
    let carrier_ticks = (1_000_000.0 / (frequency_hz as f64 * PRONTO_CLOCK)).round() as u16;
    let mut ticks: Vec<u16> = rlc.iter().map(|&d| (d.unsigned_abs() as f64 / PRONTO_CLOCK).round() as u16).collect();
    if ticks.len() % 2 != 0 {
        ticks.push(SIGNAL_FREE);
    }
    let mut words = vec![FMT_RAW_ONCE, carrier_ticks, (ticks.len() / 2) as u16, 0];
    words.extend(ticks);
    Ok(format_words(&words))
}

fn bit_to_levels(bit: u8) -> &'static str {
    if bit == 1 {
        "01"
    } else {
        "10"
    }
}

fn bits_to_levels(value: u64, width: u32) -> String {
    let mut s = String::with_capacity(width as usize * 2);
    for i in (0..width).rev() {
        s.push_str(bit_to_levels(((value >> i) & 1) as u8));
    }
    s
}

/// Double-width toggle cell, producing a single 2-unit mark/space pair
/// rather than two ordinary 1-unit half-cells.
fn toggle_levels(toggle: u8) -> &'static str {
    if toggle == 0 {
        "1100"
    } else {
        "0011"
    }
}

/// Run-length compress a level string (`'1'` = carrier on, `'0'` = off)
/// into a signed microsecond RLC.
fn level_run_encode(levels: &str, half_cell_us: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut run = 0i64;
    let mut current: Option<char> = None;
    for c in levels.chars() {
        match current {
            Some(cur) if cur == c => run += 1,
            Some(cur) => {
                out.push(signed_run(cur, run, half_cell_us));
                current = Some(c);
                run = 1;
            }
            None => {
                current = Some(c);
                run = 1;
            }
        }
    }
    if let Some(cur) = current {
        out.push(signed_run(cur, run, half_cell_us));
    }
    out
}

fn signed_run(level: char, run: i64, half_cell_us: i64) -> i64 {
    let magnitude = run * half_cell_us;
    if level == '1' {
        magnitude
    } else {
        -magnitude
    }
}

fn decode_rc5(words: &[u16], extended: bool) -> Result<(u32, Vec<i64>)> {
    if words.len() < 4 {
        return Err(IrError::InvalidPronto("RC5 Pronto code missing data words".into()));
    }
    let toggle = (words[1] & 1) as u8;
    let device = (words[2] & 0x1F) as u64;
    let command = words[3] as u64 & if extended { 0x7F } else { 0x3F };
    let (freq, rlc) = rc5_to_rlc(toggle, device, command, extended);
    Ok((freq, rlc))
}

/// Synthesise an RC5 (or RC5X, if `extended`) biphase RLC from semantic
/// fields. The two leading start bits are always `1`; RC5X carries a
/// seventh command bit (`S2`, inverted) after a 4-unit gap.
pub fn rc5_to_rlc(toggle: u8, device: u64, command: u64, extended: bool) -> (u32, Vec<i64>) {
    let mut levels = String::new();
    levels.push_str(&bits_to_levels(0b11, 2));
    levels.push_str(bit_to_levels(toggle & 1));
    levels.push_str(&bits_to_levels(device, 5));
    levels.push_str(&bits_to_levels(command & 0x3F, 6));
    let mut rlc = level_run_encode(&levels, RC5_HALF_CELL_US);
    if extended {
        let s2 = ((command >> 6) & 1) as u8 ^ 1;
        rlc.push(-4 * RC5_HALF_CELL_US);
        rlc.extend(level_run_encode(bit_to_levels(s2), RC5_HALF_CELL_US));
    }
    rlc.push(-FRAME_GAP_US);
    (36_000, rlc)
}

fn decode_rc6(words: &[u16], extended_a: bool) -> Result<(u32, Vec<i64>)> {
    let min_len = if extended_a { 4 } else { 3 };
    if words.len() <= min_len {
        return Err(IrError::InvalidPronto("RC6 Pronto code missing data words".into()));
    }
    if extended_a {
        let toggle = (words[1] & 1) as u8;
        let customer = words[2] as u64;
        let device = words[3] as u64 & 0x7F;
        let command = words[4] as u64 & 0x7F;
        Ok(rc6a_to_rlc(toggle, customer, device, command))
    } else {
        let toggle = (words[1] & 1) as u8;
        let device = words[2] as u64 & 0x7F;
        let command = words[3] as u64 & 0x7F;
        Ok(rc6_to_rlc(toggle, device, command))
    }
}

/// Synthesise a plain RC6 (mode 0) biphase RLC.
pub fn rc6_to_rlc(toggle: u8, device: u64, command: u64) -> (u32, Vec<i64>) {
    let mut levels = String::new();
    levels.push_str("111111");
    levels.push_str("00");
    levels.push_str(bit_to_levels(1)); // start bit
    levels.push_str(&bits_to_levels(0, 3)); // mode 0
    levels.push_str(toggle_levels(toggle & 1));
    levels.push_str(&bits_to_levels(device, 7));
    levels.push_str(&bits_to_levels(command, 7));
    let mut rlc = level_run_encode(&levels, RC6_HALF_CELL_US);
    rlc.push(-FRAME_GAP_US);
    (36_000, rlc)
}

/// Synthesise an RC6A (mode 6, extended customer code) biphase RLC.
pub fn rc6a_to_rlc(toggle: u8, customer: u64, device: u64, command: u64) -> (u32, Vec<i64>) {
    let mut levels = String::new();
    levels.push_str("111111");
    levels.push_str("00");
    levels.push_str(bit_to_levels(1));
    levels.push_str(&bits_to_levels(0b110, 3)); // mode 6 = RC6A
    levels.push_str(toggle_levels(toggle & 1));
    if customer > 127 {
        levels.push_str(bit_to_levels(1));
        levels.push_str(&bits_to_levels(customer, 14));
    } else {
        levels.push_str(bit_to_levels(0));
        levels.push_str(&bits_to_levels(customer, 6));
    }
    levels.push_str(&bits_to_levels(device, 7));
    levels.push_str(&bits_to_levels(command, 7));
    let mut rlc = level_run_encode(&levels, RC6_HALF_CELL_US);
    rlc.push(-FRAME_GAP_US);
    (36_000, rlc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trips_through_pronto_text() {
        let rlc = vec![8800i64, -4400, 550, -550, 550, -23100];
        let pronto = rlc_to_pronto(38123, &rlc).unwrap();
        let (freq, decoded) = pronto_to_rlc(&pronto).unwrap();
        assert_eq!(freq, 38123);
        for (a, b) in decoded.iter().zip(rlc.iter()) {
            assert!((a - b).abs() <= 2, "{a} vs {b}");
        }
    }

    #[test]
    fn odd_length_rlc_is_padded_with_signal_free_silence() {
        let rlc = vec![8800i64, -4400, 550];
        let pronto = rlc_to_pronto(38123, &rlc).unwrap();
        let words = parse_words(&pronto).unwrap();
        let once_pairs = words[2] as usize;
        assert_eq!(once_pairs, 2);
        assert_eq!(words.len(), 4 + once_pairs * 2);
        assert_eq!(*words.last().unwrap(), SIGNAL_FREE);
    }

    #[test]
    fn rc5_pronto_decodes_device_and_command() {
        let (toggle, device, command) = (0u8, 0u64, 10u64);
        let (freq, rlc) = rc5_to_rlc(toggle, device, command, false);
        assert_eq!(freq, 36_000);
        // Two start bits (1,1) open the frame as a mark.
        assert!(rlc[0] > 0);
        let words = vec![FMT_RC5, 0, device as u16, command as u16];
        let (_, redecoded) = decode_rc5(&words, false).unwrap();
        assert_eq!(redecoded, rlc);
    }

    #[test]
    fn rc6_toggle_is_double_width() {
        let (_, rlc0) = rc6_to_rlc(0, 1, 1);
        let (_, rlc1) = rc6_to_rlc(1, 1, 1);
        assert_ne!(rlc0, rlc1);
        // The toggle cell compresses to one magnitude-2*unit duration pair
        // somewhere in the stream.
        assert!(rlc0.iter().any(|&d| d.abs() == 2 * RC6_HALF_CELL_US));
    }

    #[test]
    fn rc6a_widens_customer_code_above_127() {
        let (_, narrow) = rc6a_to_rlc(0, 42, 1, 1);
        let (_, wide) = rc6a_to_rlc(0, 200, 1, 1);
        assert_ne!(narrow.len(), wide.len());
    }

    #[test]
    fn level_run_encode_merges_runs() {
        assert_eq!(level_run_encode("1100", 444), vec![888, -888]);
        assert_eq!(level_run_encode("0101", 889), vec![-889, 889, -889, 889]);
    }

    #[test]
    fn rejects_unknown_format_word() {
        assert!(pronto_to_rlc("ABCD 0000 0000 0000").is_err());
    }
}
