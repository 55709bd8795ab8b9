use lasso::{Spur, ThreadedRodeo};
use std::sync::OnceLock;

/// Interned string key for names, spell names and labels.
pub type IStr = Spur;

/// Global string interner shared by the writer workers and report builders.
static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

/// Cached empty string Spur to avoid repeated lookups.
static EMPTY_ISTR: OnceLock<Spur> = OnceLock::new();

/// Get the global interner (initializes on first call).
pub fn interner() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::default)
}

/// Intern a string, returning a key.
pub fn intern(s: &str) -> IStr {
    interner().get_or_intern(s)
}

/// Returns the IStr for an empty string. Use this instead of IStr::default()
/// since Spur::default() collides with the first interned string.
#[inline]
pub fn empty_istr() -> IStr {
    *EMPTY_ISTR.get_or_init(|| interner().get_or_intern(""))
}

/// Resolve an interned key back to a string.
pub fn resolve(key: IStr) -> &'static str {
    interner().resolve(&key)
}

/// Compare two interned names ignoring ASCII case ("Orc" == "orc").
#[inline]
pub fn eq_ignore_case(a: IStr, b: IStr) -> bool {
    a == b || resolve(a).eq_ignore_ascii_case(resolve(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_same_key() {
        assert_eq!(intern("a gnoll pup"), intern("a gnoll pup"));
        assert_eq!(resolve(intern("a gnoll pup")), "a gnoll pup");
    }

    #[test]
    fn case_insensitive_compare() {
        assert!(eq_ignore_case(intern("Orc"), intern("oRC")));
        assert!(!eq_ignore_case(intern("Orc"), intern("Orcs")));
    }
}
