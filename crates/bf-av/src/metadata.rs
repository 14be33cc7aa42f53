//! ffmetadata documents consumed by the remux step.

use std::fmt::Write as _;
use std::path::Path;

/// Header line every ffmetadata file starts with.
pub const FFMETADATA_HEADER: &str = ";FFMETADATA1";

/// A chapter entry, in milliseconds relative to the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataChapter {
    pub start_ms: i64,
    pub end_ms: i64,
    pub title: String,
}

/// Global tags plus chapter list for one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDocument {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub chapters: Vec<MetadataChapter>,
}

impl MetadataDocument {
    /// Render in ffmetadata syntax with a `1/1000` chapter timebase.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{FFMETADATA_HEADER}");
        let _ = writeln!(out, "title={}", escape(&self.title));
        let _ = writeln!(out, "album={}", escape(&self.album));
        let _ = writeln!(out, "artist={}", escape(&self.artist));
        out.push('\n');

        for ch in &self.chapters {
            out.push_str("[CHAPTER]\n");
            out.push_str("TIMEBASE=1/1000\n");
            let _ = writeln!(out, "START={}", ch.start_ms.max(0));
            let _ = writeln!(out, "END={}", ch.end_ms);
            let _ = writeln!(out, "title={}", escape(&ch.title));
            out.push('\n');
        }

        out
    }

    /// Write the rendered document to `path`.
    pub async fn write_to(&self, path: &Path) -> bf_core::Result<()> {
        tokio::fs::write(path, self.render()).await?;
        Ok(())
    }
}

/// Escape characters that are special in ffmetadata values.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> MetadataDocument {
        MetadataDocument {
            title: "Dune - Part 2".into(),
            album: "Dune".into(),
            artist: "Frank Herbert".into(),
            chapters: vec![MetadataChapter {
                start_ms: 4_000_000,
                end_ms: 4_600_000,
                title: "Book Two".into(),
            }],
        }
    }

    #[test]
    fn renders_header_tags_and_chapters() {
        let text = doc().render();
        let expected = "\
;FFMETADATA1
title=Dune - Part 2
album=Dune
artist=Frank Herbert

[CHAPTER]
TIMEBASE=1/1000
START=4000000
END=4600000
title=Book Two

";
        assert_eq!(text, expected);
    }

    #[test]
    fn negative_start_is_floored() {
        let mut d = doc();
        d.chapters[0].start_ms = -15;
        assert!(d.render().contains("START=0\n"));
    }

    #[test]
    fn special_characters_are_escaped() {
        let mut d = doc();
        d.title = "a=b; c#d".into();
        assert!(d.render().contains("title=a\\=b\\; c\\#d\n"));
    }

    #[tokio::test]
    async fn write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.txt");
        doc().write_to(&path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(FFMETADATA_HEADER));
    }
}
