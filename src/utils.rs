pub fn indent_lines(msg: &str, indentation: usize) -> String {
    #[allow(clippy::format_collect)]
    msg.lines()
        .map(|line| format!("{}{line}\n", " ".repeat(indentation)))
        .collect::<String>()
}

/// Saturating `(new - old) * factor`, used for the Metropolis delta so that a
/// pathological instance with an enormous objective can't overflow an `i64`.
pub fn amplified_delta(new_fo: i64, old_fo: i64, factor: i64) -> i64 {
    new_fo.saturating_sub(old_fo).saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_lines_adds_prefix_to_every_line() {
        assert_eq!(indent_lines("a\nb\n", 2), "  a\n  b\n");
    }

    #[test]
    fn amplified_delta_saturates_instead_of_overflowing() {
        assert_eq!(amplified_delta(i64::MAX, i64::MIN, 4), i64::MAX);
    }

    #[test]
    fn amplified_delta_is_negative_for_an_improvement() {
        assert_eq!(amplified_delta(5, 10, 4), -20);
    }
}
