pub mod change;
pub mod display;
pub mod matches;
pub mod scorer;
pub mod standing;
