use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Last two values of the trailing SMA over `closes`: `(previous, current)`.
///
/// `None` unless both values cover a full window.
pub fn sma_tail(closes: &[f64], period: usize) -> Option<(f64, f64)> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    // Only the last period + 1 points influence the two values we need
    let start = closes.len() - period - 1;
    let mut sma = SimpleMovingAverage::new(period).ok()?;
    let mut previous = None;
    let mut current = None;

    for &close in &closes[start..] {
        previous = current;
        current = Some(sma.next(close));
    }

    Some((previous?, current?))
}

/// RSI over the last `period` price changes, using simple averages of the
/// gains and losses.
///
/// 100 when the window has gains and no losses, 50 when it is flat.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain > 0.0 { 100.0 } else { 50.0 });
    }

    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_tail() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (prev, cur) = sma_tail(&closes, 2).unwrap();
        assert!((prev - 3.5).abs() < 1e-9);
        assert!((cur - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_sma_tail_needs_two_full_windows() {
        assert!(sma_tail(&[1.0, 2.0, 3.0], 3).is_none());
        assert!(sma_tail(&[1.0, 2.0, 3.0, 4.0], 3).is_some());
        assert!(sma_tail(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn test_rsi_mixed_window() {
        // Changes over the last 3: -1, -1, +4
        let value = rsi(&[10.0, 10.0, 10.0, 9.0, 8.0, 12.0], 3).unwrap();
        assert!((value - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_rsi_edges() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 2), Some(100.0));
        assert_eq!(rsi(&[5.0, 5.0, 5.0], 2), Some(50.0));
        assert_eq!(rsi(&[3.0, 2.0, 1.0], 2), Some(0.0));
        assert!(rsi(&[1.0, 2.0], 2).is_none());
    }
}
