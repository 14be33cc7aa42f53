//! Output file naming.
//!
//! Names are also the skip-detection contract: a later run recognises
//! finished work purely by these file names existing.

/// Characters removed from titles before they become file names.
const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Output container extension.
pub const EXTENSION: &str = "m4b";

/// Strip characters that are invalid in file names on common filesystems.
pub fn sanitize_filename(title: &str) -> String {
    title.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}

/// `{title}.m4b`, for an item copied whole.
pub fn single_file_name(title: &str) -> String {
    format!("{}.{EXTENSION}", sanitize_filename(title))
}

/// `{title} - Part {n}.m4b`, for split items.
pub fn part_file_name(title: &str, part: usize) -> String {
    format!("{} - Part {part}.{EXTENSION}", sanitize_filename(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forbidden_characters() {
        assert_eq!(
            sanitize_filename(r#"Star Wars: Episode I / "Phantom" <Menace>?*|\"#),
            "Star Wars Episode I  Phantom Menace"
        );
        assert_eq!(sanitize_filename("Plain Title"), "Plain Title");
    }

    #[test]
    fn file_names() {
        assert_eq!(single_file_name("Dune: Messiah"), "Dune Messiah.m4b");
        assert_eq!(part_file_name("Dune: Messiah", 3), "Dune Messiah - Part 3.m4b");
    }
}
