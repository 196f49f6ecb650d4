//! IEEE-754 double arithmetic under an explicit rounding mode.
//!
//! Programs switch the rounding mode with CFROUND. Instead of touching the
//! host FPU control word, every operation is computed round-to-nearest and
//! then nudged one ulp when the exact error says the directed result lies
//! on the other side. The error terms are exact: TwoSum for addition and
//! an FMA residual for the rest.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RoundingMode {
    #[default]
    Nearest,
    Down,
    Up,
    TowardZero,
}

impl RoundingMode {
    pub(crate) fn from_bits(bits: u64) -> Self {
        match bits % 4 {
            0 => Self::Nearest,
            1 => Self::Down,
            2 => Self::Up,
            _ => Self::TowardZero,
        }
    }
}

fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    f64::from_bits(if x > 0.0 { bits + 1 } else { bits - 1 })
}

fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// `err` has the sign of `exact - rounded`.
fn adjust(rounded: f64, err: f64, mode: RoundingMode) -> f64 {
    if rounded.is_infinite() {
        // Overflow only reaches infinity when rounding away from zero.
        let toward_zero = match mode {
            RoundingMode::TowardZero => true,
            RoundingMode::Down => rounded > 0.0,
            RoundingMode::Up => rounded < 0.0,
            RoundingMode::Nearest => false,
        };
        return if toward_zero {
            f64::MAX.copysign(rounded)
        } else {
            rounded
        };
    }
    if err == 0.0 {
        return rounded;
    }
    match mode {
        RoundingMode::Nearest => rounded,
        RoundingMode::Down if err < 0.0 => next_down(rounded),
        RoundingMode::Up if err > 0.0 => next_up(rounded),
        RoundingMode::TowardZero if rounded > 0.0 && err < 0.0 => next_down(rounded),
        RoundingMode::TowardZero if rounded < 0.0 && err > 0.0 => next_up(rounded),
        _ => rounded,
    }
}

pub(crate) fn add(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let sum = a + b;
    if mode == RoundingMode::Nearest {
        return sum;
    }
    if sum == 0.0 {
        // x + (-x) is -0 only when rounding down.
        return if mode == RoundingMode::Down && (a.is_sign_negative() || b.is_sign_negative()) {
            -0.0
        } else {
            sum
        };
    }
    let bb = sum - a;
    let err = (a - (sum - bb)) + (b - bb);
    adjust(sum, err, mode)
}

pub(crate) fn sub(a: f64, b: f64, mode: RoundingMode) -> f64 {
    add(a, -b, mode)
}

pub(crate) fn mul(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let product = a * b;
    if mode == RoundingMode::Nearest {
        return product;
    }
    adjust(product, a.mul_add(b, -product), mode)
}

pub(crate) fn div(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let quotient = a / b;
    if mode == RoundingMode::Nearest {
        return quotient;
    }
    let residual = (-quotient).mul_add(b, a);
    adjust(quotient, if b < 0.0 { -residual } else { residual }, mode)
}

pub(crate) fn sqrt(a: f64, mode: RoundingMode) -> f64 {
    let root = a.sqrt();
    if mode == RoundingMode::Nearest {
        return root;
    }
    adjust(root, (-root).mul_add(root, a), mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoundingMode::*;

    #[test]
    fn test_mode_from_bits() {
        assert_eq!(RoundingMode::from_bits(0), Nearest);
        assert_eq!(RoundingMode::from_bits(5), Down);
        assert_eq!(RoundingMode::from_bits(6), Up);
        assert_eq!(RoundingMode::from_bits(u64::MAX), TowardZero);
    }

    #[test]
    fn test_inexact_addition_brackets_exact_sum() {
        let (a, b) = (1.0, f64::EPSILON / 4.0);
        assert_eq!(add(a, b, Nearest), 1.0);
        assert_eq!(add(a, b, Down), 1.0);
        assert_eq!(add(a, b, Up), next_up(1.0));
        assert_eq!(add(a, b, TowardZero), 1.0);
        assert_eq!(add(-a, -b, Down), next_down(-1.0));
        assert_eq!(add(-a, -b, TowardZero), -1.0);
        assert_eq!(sub(a, b, Down), next_down(1.0));
    }

    #[test]
    fn test_exact_results_are_untouched() {
        for mode in [Nearest, Down, Up, TowardZero] {
            assert_eq!(add(1.5, 2.25, mode), 3.75);
            assert_eq!(mul(3.0, -0.5, mode), -1.5);
            assert_eq!(div(1.0, 4.0, mode), 0.25);
            assert_eq!(sqrt(16.0, mode), 4.0);
        }
    }

    #[test]
    fn test_signed_zero_sum() {
        assert!(add(1.0, -1.0, Down).is_sign_negative());
        assert!(add(1.0, -1.0, Up).is_sign_positive());
        assert!(add(-0.0, -0.0, Nearest).is_sign_negative());
    }

    #[test]
    fn test_directed_division_and_root() {
        let third = 1.0 / 3.0;
        assert_eq!(div(1.0, 3.0, Up), next_up(div(1.0, 3.0, Down)));
        assert_eq!(div(1.0, -3.0, TowardZero), -div(1.0, 3.0, TowardZero));
        assert_eq!(sqrt(2.0, Up), next_up(sqrt(2.0, Down)));
        assert_eq!(mul(third, 3.0, Up), next_up(mul(third, 3.0, Down)));
    }

    #[test]
    fn test_overflow_saturates_toward_zero() {
        assert_eq!(mul(f64::MAX, 2.0, TowardZero), f64::MAX);
        assert_eq!(mul(f64::MAX, 2.0, Down), f64::MAX);
        assert_eq!(mul(f64::MAX, 2.0, Up), f64::INFINITY);
        assert_eq!(mul(-f64::MAX, 2.0, Up), -f64::MAX);
    }
}
