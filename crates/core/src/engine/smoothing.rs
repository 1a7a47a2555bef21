/// Exponentially weighted moving average with `alpha = 2 / (span + 1)`.
///
/// Folds left to right starting from the first value. Returns 0 for an empty slice.
pub fn ewm(values: &[f64], span: u32) -> f64 {
    let Some((&first, rest)) = values.split_first() else {
        return 0.0;
    };

    let alpha = 2.0 / (f64::from(span) + 1.0);
    rest.iter()
        .fold(first, |acc, &v| alpha * v + (1.0 - alpha) * acc)
}
