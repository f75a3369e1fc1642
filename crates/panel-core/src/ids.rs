//! ID prefix constants.
//!
//! Every stored record gets a prefixed short id (`itm-a3f8b2c1`) generated by
//! `PanelDb::generate_id`. Users are the exception: their ids come from the
//! identity provider and are stored as given.

pub const PREFIX_ITEM: &str = "itm";
pub const PREFIX_ASSIGNMENT: &str = "asg";
pub const PREFIX_AUDIT: &str = "aud";

pub const ALL_PREFIXES: [&str; 3] = [PREFIX_ITEM, PREFIX_ASSIGNMENT, PREFIX_AUDIT];

/// Return the prefix part of an id, if it carries a known one.
#[must_use]
pub fn prefix_of(id: &str) -> Option<&'static str> {
    let (prefix, rest) = id.split_once('-')?;
    if rest.is_empty() {
        return None;
    }
    ALL_PREFIXES.iter().copied().find(|p| *p == prefix)
}
