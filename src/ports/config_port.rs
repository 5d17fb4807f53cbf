//! Configuration access port trait.

/// Read access to sectioned `key = value` settings.
///
/// Numbers are read as strings and parsed by the validators so a malformed
/// value is reported instead of silently replaced by a default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
    /// Section names present in the source.
    fn sections(&self) -> Vec<String>;
}
