#[cfg(feature = "facebook")]
pub mod facebook;
