// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed readers over raw tag values.
//!
//! Every reader trims its input and returns `None` when the value does not
//! parse. A `None` means "field unset"; it is never escalated to an error.

use chorale_domain::{Mbid, ReleaseDate};

/// Conversion from a trimmed tag value.
pub trait FromTagValue: Sized {
    fn from_tag_value(value: &str) -> Option<Self>;
}

impl FromTagValue for String {
    fn from_tag_value(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromTagValue for u32 {
    fn from_tag_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromTagValue for ReleaseDate {
    fn from_tag_value(value: &str) -> Option<Self> {
        ReleaseDate::parse_str(value)
    }
}

impl FromTagValue for Mbid {
    fn from_tag_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

pub fn read_as<T: FromTagValue>(value: &str) -> Option<T> {
    T::from_tag_value(value.trim())
}

/// Split on any of `delimiters`, trimming tokens and dropping empty ones.
pub fn split_tokens(value: &str, delimiters: &[char]) -> Vec<String> {
    value
        .split(|c: char| delimiters.contains(&c))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a `Number/Total` pair.
///
/// The value is split once on `/`; each half is read on its own, so a bad
/// number does not hide a good total and vice versa.
pub fn read_position(value: &str) -> (Option<u32>, Option<u32>) {
    match value.split_once('/') {
        Some((number, total)) => (read_as(number), read_as(total)),
        None => (read_as(value), None),
    }
}

/// Read a `/`-separated list of MusicBrainz identifiers.
///
/// All or nothing: one malformed token (an empty one included) discards the
/// whole list.
pub fn read_mbid_list(value: &str) -> Option<Vec<Mbid>> {
    value.split('/').map(read_as::<Mbid>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "056e4f3e-d505-4dad-8ec1-d04f521cbb56";
    const B: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";
    const C: &str = "5441c29d-3602-4898-b1a1-b77fa23b8e50";

    #[test]
    fn integers_are_trimmed_and_strict() {
        assert_eq!(read_as::<u32>(" 7 "), Some(7));
        assert_eq!(read_as::<u32>("7a"), None);
        assert_eq!(read_as::<u32>("-1"), None);
        assert_eq!(read_as::<u32>(""), None);
    }

    #[test]
    fn positions_resolve_each_half_independently() {
        assert_eq!(read_position("3/14"), (Some(3), Some(14)));
        assert_eq!(read_position("3"), (Some(3), None));
        assert_eq!(read_position("x/14"), (None, Some(14)));
        assert_eq!(read_position("3/x"), (Some(3), None));
        assert_eq!(read_position(" 2 / 2 "), (Some(2), Some(2)));
    }

    #[test]
    fn mbid_list_is_atomic() {
        let all = read_mbid_list(&format!("{A}/{B}/{C}")).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].to_string(), B);

        assert!(read_mbid_list(&format!("{A}/garbage/{C}")).is_none());
        assert!(read_mbid_list(&format!("{A}/")).is_none());
        assert!(read_mbid_list("").is_none());
    }

    #[test]
    fn mbid_list_tolerates_padding() {
        let ids = read_mbid_list(&format!(" {A} / {B} ")).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn token_split_drops_blanks() {
        assert_eq!(
            split_tokens("Rock/ Pop ;;Jazz,", &['/', ',', ';']),
            vec!["Rock", "Pop", "Jazz"]
        );
        assert!(split_tokens(" / ", &['/']).is_empty());
    }
}
