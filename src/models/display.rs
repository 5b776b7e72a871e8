use std::fmt;

/// Rendering rule for nullable fields at the presentation boundary:
/// a missing value is printed as `-`.
pub struct OrUnset<'a, T>(pub &'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrUnset<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("-"),
        }
    }
}
