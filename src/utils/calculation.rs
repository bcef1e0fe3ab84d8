/// Performs ceiling division of two `usize` values
pub fn div_ceil(a: usize, b: usize) -> usize {
    // Handle division by zero
    assert!(b != 0, "Division by zero");

    // If division is exact, return the result
    if a % b == 0 {
        return a / b;
    }

    // Otherwise, add 1 to the integer division result
    a / b + 1
}

/// Rounds `n` down to the previous multiple of `m` (0 if `n < m`).
pub fn floor_to_multiple(n: usize, m: usize) -> usize {
    if m == 0 {
        return n;
    }
    (n / m) * m
}
