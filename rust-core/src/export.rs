//! JSON-lines ingestion and export.
//!
//! Input is one [`LandmarkFrame`] per line:
//!
//! ```text
//! {"frame_number":0,"image_width":1280,"image_height":720,"landmarks":{"right_ankle":{"x":0.39,"y":0.8,"visibility":0.9}}}
//! ```
//!
//! Output is one [`StreamingUpdate`] per line, each self-contained:
//! a sequence number, a `type` tag, and the payload under `data`.

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::warn;

use crate::error::{GaitError, Result};
use crate::pipeline::{FrameAnalysis, SessionReport};
use crate::types::LandmarkFrame;

/// Iterator over frames in a JSON-lines stream.
///
/// Blank lines are skipped. A malformed line yields [`GaitError::Frame`]
/// with its 1-based line number; iteration can continue past it.
pub struct FrameReader<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Line number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<LandmarkFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(GaitError::Io(e))),
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(line).map_err(|source| GaitError::Frame {
                line: self.line_number,
                source,
            }));
        }
    }
}

/// One output message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingUpdate {
    pub seq: u64,
    #[serde(flatten)]
    pub payload: UpdatePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UpdatePayload {
    /// Per-frame phases, angles and any contact classification.
    Frame(FrameAnalysis),
    /// Session summary, written once at the end.
    Report(SessionReport),
}

/// Writes analysis results as JSON lines.
pub struct StreamingExporter<W: Write> {
    writer: W,
    sequence: u64,
    /// Only write frames that carry a classification.
    contacts_only: bool,
}

impl<W: Write> StreamingExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            sequence: 0,
            contacts_only: false,
        }
    }

    /// Skip frames without a classification.
    pub fn contacts_only(mut self, enabled: bool) -> Self {
        self.contacts_only = enabled;
        self
    }

    /// Writes a frame result. Returns whether a line was written.
    pub fn write_frame(&mut self, analysis: &FrameAnalysis) -> Result<bool> {
        if self.contacts_only && analysis.classifications().next().is_none() {
            return Ok(false);
        }
        self.emit(UpdatePayload::Frame(analysis.clone()))?;
        Ok(true)
    }

    pub fn write_report(&mut self, report: &SessionReport) -> Result<()> {
        if !report.meets_detection_target && report.frames_processed > 0 {
            warn!(
                detection_rate = report.detection_rate,
                "pose detected in fewer frames than the target rate"
            );
        }
        self.emit(UpdatePayload::Report(report.clone()))
    }

    /// Messages written so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    // ===== PRIVATE METHODS =====

    fn emit(&mut self, payload: UpdatePayload) -> Result<()> {
        self.sequence += 1;
        let update = StreamingUpdate {
            seq: self.sequence,
            payload,
        };
        serde_json::to_writer(&mut self.writer, &update)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GaitConfig;
    use crate::pipeline::GaitAnalyzer;
    use crate::types::Landmark;

    const INPUT: &str = r#"{"frame_number":0,"image_width":1280,"image_height":720,"landmarks":{"right_ankle":{"x":0.39,"y":0.8,"z":0.0,"visibility":0.9},"nose":{"x":0.5,"y":0.1,"visibility":0.99}}}

{"frame_number":1,"image_width":1280,"image_height":720,"landmarks":{}}
"#;

    #[test]
    fn test_reader_parses_and_skips_blank_lines() {
        let frames: Vec<_> = FrameReader::new(INPUT.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 1);
        assert_eq!(frames[0].get(Landmark::RightAnkle).unwrap().y, 0.8);
        assert!(frames[1].is_empty());
    }

    #[test]
    fn test_reader_reports_line_number() {
        let input = "{\"frame_number\":0,\"image_width\":10,\"image_height\":10}\n\nnot json\n";
        let mut reader = FrameReader::new(input.as_bytes());
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(GaitError::Frame { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected frame error, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_exporter_writes_json_lines() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let mut exporter = StreamingExporter::new(Vec::new());
        for frame in FrameReader::new(INPUT.as_bytes()) {
            let analysis = analyzer.process_frame(&frame.unwrap());
            assert!(exporter.write_frame(&analysis).unwrap());
        }
        exporter.write_report(&analyzer.report()).unwrap();
        assert_eq!(exporter.sequence(), 3);

        let output = String::from_utf8(exporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["seq"], 1);
        assert_eq!(lines[0]["type"], "frame");
        assert_eq!(lines[0]["data"]["updates"][0]["phase"], "SWING");
        assert_eq!(lines[2]["type"], "report");
        assert_eq!(lines[2]["data"]["frames_processed"], 2);
    }

    #[test]
    fn test_contacts_only_filters_frames() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let mut exporter = StreamingExporter::new(Vec::new()).contacts_only(true);
        for frame in FrameReader::new(INPUT.as_bytes()) {
            let analysis = analyzer.process_frame(&frame.unwrap());
            assert!(!exporter.write_frame(&analysis).unwrap());
        }
        assert_eq!(exporter.sequence(), 0);
    }
}
