// Tropical semiring: (R ∪ {+inf}, min, +).

/// Weight of a transition, final state or path.
pub type Weight = f64;

/// Identity of ⊕ and annihilator of ⊗: an impossible path.
pub const ZERO: Weight = f64::INFINITY;

/// Identity of ⊗: a free step.
pub const ONE: Weight = 0.0;

/// Default tolerance for weight comparisons.
pub const DELTA: Weight = 1e-6;

/// ⊕: choose the better of two alternatives.
#[inline]
pub fn plus(a: Weight, b: Weight) -> Weight {
    a.min(b)
}

/// ⊗: extend a path by one step.
#[inline]
pub fn times(a: Weight, b: Weight) -> Weight {
    a + b
}

/// Left residual: the `x` with `b ⊗ x = a`. Undefined when `b` is [`ZERO`].
#[inline]
pub fn divide(a: Weight, b: Weight) -> Weight {
    if b == ZERO {
        return ZERO;
    }
    a - b
}

#[inline]
pub fn is_zero(w: Weight) -> bool {
    w == ZERO
}

/// Equality up to `delta`. Two infinite weights are equal.
pub fn approx_eq(a: Weight, b: Weight, delta: Weight) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= delta
}

/// Order weights so that the better (smaller) weight sorts first; NaN sorts last.
pub fn compare(a: Weight, b: Weight) -> std::cmp::Ordering {
    a.total_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities() {
        assert_eq!(plus(3.5, ZERO), 3.5);
        assert_eq!(times(3.5, ONE), 3.5);
        assert_eq!(times(3.5, ZERO), ZERO);
    }

    #[test]
    fn plus_is_min() {
        assert_eq!(plus(1.0, 2.0), 1.0);
        assert_eq!(plus(-4.0, 2.0), -4.0);
    }

    #[test]
    fn divide_undoes_times() {
        let w = times(1.25, 0.5);
        assert!(approx_eq(divide(w, 0.5), 1.25, DELTA));
        assert_eq!(divide(1.0, ZERO), ZERO);
    }

    #[test]
    fn approximate_equality() {
        assert!(approx_eq(1.0 + 0.3 + 0.7, 2.0, DELTA));
        assert!(approx_eq(ZERO, ZERO, DELTA));
        assert!(!approx_eq(1.0, 1.1, DELTA));
        assert!(!approx_eq(ZERO, 1e300, DELTA));
    }
}
