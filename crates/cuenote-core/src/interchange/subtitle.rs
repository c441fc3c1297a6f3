//! Subtitle export and import (SRT and WebVTT).
//!
//! Export takes only comments and highlights, sorted by timestamp, and
//! writes canonical files: SRT with numbered blocks and CRLF endings, VTT
//! with a `WEBVTT` header, unnumbered blocks, and LF endings. Records
//! without a duration get a default span.
//!
//! Import is a tolerant block scan: blocks are split on blank lines, an
//! optional leading index line is skipped, and a block missing its `-->`
//! line or carrying an unparsable time is dropped rather than failing the
//! whole file. Re-exporting an imported well-formed file reproduces it byte
//! for byte in the same flavor.

use tracing::debug;

use super::timecode;
use crate::model::{Annotation, AnnotationDraft, AnnotationKind, Position, Provenance};
use crate::store::sort_timeline;

/// Span given to point-in-time records on export, in seconds.
pub const DEFAULT_DURATION_SECS: f64 = 3.0;

/// The two subtitle dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFlavor {
    Srt,
    Vtt,
}

/// One parsed cue before it becomes an annotation draft.
#[derive(Debug, Clone, PartialEq)]
struct Cue {
    start: f64,
    end: f64,
    text: String,
}

/// Result of a tolerant import: the usable drafts plus how many blocks the
/// scanner saw in total.
#[derive(Debug, Default)]
pub struct SubtitleImport {
    pub drafts: Vec<AnnotationDraft>,
    pub attempted: usize,
}

/// Render comments and highlights as a subtitle file.
pub fn export(annotations: &[&Annotation], flavor: SubtitleFlavor) -> String {
    let mut cues: Vec<&Annotation> = annotations
        .iter()
        .copied()
        .filter(|a| matches!(a.kind, AnnotationKind::Comment | AnnotationKind::Highlight))
        .collect();
    sort_timeline(&mut cues);

    let eol = match flavor {
        SubtitleFlavor::Srt => "\r\n",
        SubtitleFlavor::Vtt => "\n",
    };

    let mut out = String::new();
    if flavor == SubtitleFlavor::Vtt {
        out.push_str("WEBVTT");
        out.push_str(eol);
        out.push_str(eol);
    }

    for (i, annotation) in cues.iter().enumerate() {
        let start = annotation.timestamp;
        let end = start + annotation.duration.unwrap_or(DEFAULT_DURATION_SECS);

        if flavor == SubtitleFlavor::Srt {
            out.push_str(&(i + 1).to_string());
            out.push_str(eol);
        }
        match flavor {
            SubtitleFlavor::Srt => {
                out.push_str(&timecode::format_srt(start));
                out.push_str(" --> ");
                out.push_str(&timecode::format_srt(end));
            }
            SubtitleFlavor::Vtt => {
                out.push_str(&timecode::format_vtt(start));
                out.push_str(" --> ");
                out.push_str(&timecode::format_vtt(end));
            }
        }
        out.push_str(eol);
        for line in annotation.content.split('\n') {
            out.push_str(line);
            out.push_str(eol);
        }
        out.push_str(eol);
    }
    out
}

/// Scan a subtitle file into annotation drafts. Never fails: malformed
/// blocks are skipped and only counted in `attempted`.
///
/// Imported drafts are comments anchored at the cue start with
/// `duration = end - start`, positioned bottom-center, provenance `Import`.
pub fn import(data: &str) -> SubtitleImport {
    let normalized = data.replace("\r\n", "\n");
    let mut lines = normalized.lines().peekable();

    // Optional WEBVTT header plus the blank line after it
    if lines.peek().is_some_and(|l| l.trim_start().starts_with("WEBVTT")) {
        lines.next();
    }

    let mut outcome = SubtitleImport::default();
    let mut block: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            flush_block(&mut block, &mut outcome);
        } else {
            block.push(line);
        }
    }
    flush_block(&mut block, &mut outcome);
    outcome
}

fn flush_block(block: &mut Vec<&str>, outcome: &mut SubtitleImport) {
    if block.is_empty() {
        return;
    }
    outcome.attempted += 1;
    match parse_cue_block(block) {
        Some(cue) => outcome.drafts.push(cue_to_draft(cue)),
        None => debug!(lines = block.len(), "skipping malformed subtitle block"),
    }
    block.clear();
}

/// Parse one block of non-blank lines into a cue. Returns `None` when the
/// block has no timing line, an unparsable time, a negative span, or no
/// text.
fn parse_cue_block(lines: &[&str]) -> Option<Cue> {
    let timing_at = lines.iter().position(|line| line.contains("-->"))?;
    let mut parts = lines[timing_at].splitn(2, "-->");
    let start = timecode::parse(parts.next()?)?;
    let end = timecode::parse(parts.next()?)?;
    if end < start {
        return None;
    }

    let text = lines[timing_at + 1..].join("\n");
    if text.trim().is_empty() {
        return None;
    }

    Some(Cue { start, end, text })
}

fn cue_to_draft(cue: Cue) -> AnnotationDraft {
    AnnotationDraft {
        kind: Some(AnnotationKind::Comment),
        content: cue.text,
        timestamp: cue.start,
        duration: Some(cue.end - cue.start),
        position: Some(Position::bottom_center()),
        source: Some(Provenance::Import),
        ..AnnotationDraft::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, AnnotationDraft};
    use crate::session::StreamSession;
    use crate::store::AnnotationStore;

    fn session() -> StreamSession {
        StreamSession::new("stream-1", "actor-1", "Alice")
    }

    fn fixture_store() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        let s = session();
        store
            .create(AnnotationDraft::comment("First note", 10.0), &s)
            .unwrap();
        store
            .create(AnnotationDraft::comment("Second note", 20.5), &s)
            .unwrap();
        store
    }

    #[test]
    fn test_srt_export_shape() {
        let store = fixture_store();
        let snapshot = store.snapshot();
        let refs: Vec<&Annotation> = snapshot.iter().collect();

        let srt = export(&refs, SubtitleFlavor::Srt);
        let expected = "1\r\n\
                        00:00:10,000 --> 00:00:13,000\r\n\
                        First note\r\n\
                        \r\n\
                        2\r\n\
                        00:00:20,500 --> 00:00:23,500\r\n\
                        Second note\r\n\
                        \r\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_vtt_export_shape() {
        let store = fixture_store();
        let snapshot = store.snapshot();
        let refs: Vec<&Annotation> = snapshot.iter().collect();

        let vtt = export(&refs, SubtitleFlavor::Vtt);
        let expected = "WEBVTT\n\
                        \n\
                        00:00:10.000 --> 00:00:13.000\n\
                        First note\n\
                        \n\
                        00:00:20.500 --> 00:00:23.500\n\
                        Second note\n\
                        \n";
        assert_eq!(vtt, expected);
    }

    #[test]
    fn test_export_takes_only_comments_and_highlights() {
        let mut store = AnnotationStore::new();
        let s = session();
        store
            .create(AnnotationDraft::comment("keep", 1.0), &s)
            .unwrap();
        store
            .create(
                AnnotationDraft::comment("keep too", 2.0).with_kind(AnnotationKind::Highlight),
                &s,
            )
            .unwrap();
        store
            .create(
                AnnotationDraft::comment("skip", 3.0).with_kind(AnnotationKind::Marker),
                &s,
            )
            .unwrap();

        let snapshot = store.snapshot();
        let refs: Vec<&Annotation> = snapshot.iter().collect();
        let srt = export(&refs, SubtitleFlavor::Srt);
        assert!(srt.contains("keep"));
        assert!(srt.contains("keep too"));
        assert!(!srt.contains("skip"));
    }

    #[test]
    fn test_export_respects_duration() {
        let mut store = AnnotationStore::new();
        let s = session();
        store
            .create(
                AnnotationDraft::comment("spanned", 60.0).with_duration(4.25),
                &s,
            )
            .unwrap();

        let snapshot = store.snapshot();
        let refs: Vec<&Annotation> = snapshot.iter().collect();
        let srt = export(&refs, SubtitleFlavor::Srt);
        assert!(srt.contains("00:01:00,000 --> 00:01:04,250"));
    }

    #[test]
    fn test_import_maps_cue_defaults() {
        let vtt = "WEBVTT\n\n00:00:05.000 --> 00:00:09.500\nHello there\n";
        let outcome = import(vtt);

        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.drafts.len(), 1);
        let draft = &outcome.drafts[0];
        assert_eq!(draft.kind, Some(AnnotationKind::Comment));
        assert_eq!(draft.content, "Hello there");
        assert_eq!(draft.timestamp, 5.0);
        assert_eq!(draft.duration, Some(4.5));
        assert_eq!(draft.source, Some(Provenance::Import));
        let position = draft.position.unwrap();
        assert_eq!(position.anchor, Anchor::BottomCenter);
        assert_eq!((position.x, position.y), (50.0, 90.0));
    }

    #[test]
    fn test_import_skips_malformed_blocks() {
        let srt = "1\r\n\
                   00:00:10,000 --> 00:00:13,000\r\n\
                   good cue\r\n\
                   \r\n\
                   2\r\n\
                   this block has no arrow\r\n\
                   \r\n\
                   3\r\n\
                   bad --> time\r\n\
                   text\r\n\
                   \r\n\
                   4\r\n\
                   00:00:30,000 --> 00:00:33,000\r\n\
                   another good cue\r\n\
                   \r\n";
        let outcome = import(srt);

        assert_eq!(outcome.attempted, 4);
        assert_eq!(outcome.drafts.len(), 2);
        assert_eq!(outcome.drafts[0].content, "good cue");
        assert_eq!(outcome.drafts[1].content, "another good cue");
    }

    #[test]
    fn test_import_joins_multiline_text() {
        let srt = "1\r\n00:00:10,000 --> 00:00:13,000\r\nline one\r\nline two\r\n\r\n";
        let outcome = import(srt);
        assert_eq!(outcome.drafts[0].content, "line one\nline two");
    }

    #[test]
    fn test_import_rejects_backwards_span_and_empty_text() {
        let srt = "1\r\n00:00:10,000 --> 00:00:05,000\r\ntext\r\n\r\n\
                   2\r\n00:00:20,000 --> 00:00:23,000\r\n\r\n";
        let outcome = import(srt);
        assert_eq!(outcome.attempted, 2);
        assert!(outcome.drafts.is_empty());
    }

    #[test]
    fn test_reexport_is_byte_identical() {
        let store = fixture_store();
        let snapshot = store.snapshot();
        let refs: Vec<&Annotation> = snapshot.iter().collect();

        for flavor in [SubtitleFlavor::Srt, SubtitleFlavor::Vtt] {
            let first = export(&refs, flavor);

            let outcome = import(&first);
            let mut reimported = AnnotationStore::new();
            let s = session();
            for draft in outcome.drafts {
                reimported.create(draft, &s).unwrap();
            }
            let snapshot = reimported.snapshot();
            let refs: Vec<&Annotation> = snapshot.iter().collect();
            let second = export(&refs, flavor);

            assert_eq!(first, second);
        }
    }
}
