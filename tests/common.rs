pub fn is_equal_ish(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() < tolerance
}

/// Compares two arrays with the given error tolerance, naming the offending value on failure.
pub fn check(expected: &[f32], actual: &[f32], tolerance: f32, id: &str) {
    assert_eq!(expected.len(), actual.len(), "{}: length differs", id);
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        assert!(
            is_equal_ish(*e, *a, tolerance),
            "{}: value {} differs, expected {} found {}",
            id,
            i,
            e,
            a
        );
    }
}
