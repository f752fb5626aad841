//! Formatting-filtered text and formatting statistics
//!
//! Both queries walk the runs of the selected slides once, resolving each
//! run's effective formatting through [`effective_formatting`]. Runs are
//! also laid out into a per-slide `complete_text`: paragraphs and text
//! frames are separated by a newline, and every matching run records the
//! character offset it starts at.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::formatting::{
    effective_formatting, slide_runs, EffectiveFormatting, FormattingPredicate, DEFAULT_COLOR,
};
use crate::layout::PlaceholderType;
use crate::query::QueryEngine;
use crate::slide::Slide;
use crate::text::{Paragraph, TextFrame};

/// One run matching a formatting predicate
#[derive(Debug, Clone, Serialize)]
pub struct FormattedRun {
    pub slide_number: usize,
    pub slide_id: u32,
    pub shape_name: String,
    pub shape_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderType>,
    pub text: String,
    /// Character offset of the run in its slide's `complete_text`
    pub start_position: usize,
    pub formatting: EffectiveFormatting,
}

/// A matching run as listed under its slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedSegment {
    pub text: String,
    pub start_position: usize,
    pub shape_name: String,
}

/// Matches of one slide together with the slide's whole text
#[derive(Debug, Clone, Serialize)]
pub struct SlideFormattedText {
    pub slide_number: usize,
    pub title: Option<String>,
    pub complete_text: String,
    pub segments: Vec<FormattedSegment>,
}

/// Result of [`QueryEngine::formatted_text`]
#[derive(Debug, Clone, Serialize)]
pub struct FormattedText {
    pub predicate: String,
    pub slides_analyzed: usize,
    pub slides_with_matches: usize,
    pub match_count: usize,
    pub matches: Vec<FormattedRun>,
    /// Slides with at least one match, in presentation order
    pub by_slide: Vec<SlideFormattedText>,
}

/// Run counts per formatting property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormattingCounts {
    pub bold: usize,
    pub italic: usize,
    pub underline: usize,
    pub strikethrough: usize,
    pub highlight: usize,
    /// Text in a colour other than the default black
    pub colored: usize,
    pub hyperlinks: usize,
}

impl FormattingCounts {
    /// Count one run; returns whether it carries any formatting at all
    fn record(&mut self, formatting: &EffectiveFormatting) -> bool {
        let colored = !formatting.color.eq_ignore_ascii_case(DEFAULT_COLOR);
        let flags = [
            (formatting.bold, &mut self.bold),
            (formatting.italic, &mut self.italic),
            (formatting.underline, &mut self.underline),
            (formatting.strikethrough, &mut self.strikethrough),
            (formatting.highlight.is_some(), &mut self.highlight),
            (colored, &mut self.colored),
            (formatting.hyperlink.is_some(), &mut self.hyperlinks),
        ];

        let mut any = false;
        for (set, slot) in flags {
            if set {
                *slot += 1;
                any = true;
            }
        }
        any
    }

    fn add(mut self, other: &Self) -> Self {
        self.bold += other.bold;
        self.italic += other.italic;
        self.underline += other.underline;
        self.strikethrough += other.strikethrough;
        self.highlight += other.highlight;
        self.colored += other.colored;
        self.hyperlinks += other.hyperlinks;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideFormattingStats {
    pub slide_number: usize,
    pub runs: usize,
    pub formatted_runs: usize,
    pub counts: FormattingCounts,
}

/// Result of [`QueryEngine::formatting_analysis`]
#[derive(Debug, Clone, Serialize)]
pub struct FormattingAnalysis {
    pub slides_analyzed: usize,
    pub total_runs: usize,
    /// Runs with at least one counted property
    pub formatted_runs: usize,
    pub counts: FormattingCounts,
    /// Runs per resolved typeface
    pub fonts: BTreeMap<String, usize>,
    /// Runs per size in points
    pub sizes: BTreeMap<String, usize>,
    /// Runs per resolved colour
    pub colors: BTreeMap<String, usize>,
    pub slides: Vec<SlideFormattingStats>,
}

/// Lays runs out into one string per slide
#[derive(Default)]
struct TextLayout<'s> {
    text: String,
    chars: usize,
    last: Option<(&'s TextFrame, &'s Paragraph)>,
}

impl<'s> TextLayout<'s> {
    /// Append a run and return its starting character offset
    fn push(&mut self, frame: &'s TextFrame, paragraph: &'s Paragraph, text: &str) -> usize {
        let same_paragraph = self.last.is_some_and(|(last_frame, last_paragraph)| {
            std::ptr::eq(last_frame, frame) && std::ptr::eq(last_paragraph, paragraph)
        });
        if !same_paragraph && !self.text.is_empty() {
            self.text.push('\n');
            self.chars += 1;
        }
        self.last = Some((frame, paragraph));

        let start = self.chars;
        self.text.push_str(text);
        self.chars += text.chars().count();
        start
    }
}

fn is_blank_run(text: &str) -> bool {
    text == "\n" || text.trim().is_empty()
}

impl<'a> QueryEngine<'a> {
    /// Every run on every slide whose effective formatting satisfies the predicate
    pub fn formatted_text(&self, predicate: &FormattingPredicate) -> FormattedText {
        let slides = self
            .presentation
            .slides
            .iter()
            .enumerate()
            .map(|(i, s)| (i + 1, s))
            .collect();
        self.collect_formatted(predicate, slides)
    }

    /// Same as [`formatted_text`](Self::formatted_text), limited to the given
    /// 1-based slide numbers (empty means all)
    pub fn formatted_text_in(
        &self,
        predicate: &FormattingPredicate,
        slide_numbers: &[usize],
    ) -> Result<FormattedText> {
        let slides = self.select_slides(slide_numbers)?;
        Ok(self.collect_formatted(predicate, slides))
    }

    fn collect_formatted(
        &self,
        predicate: &FormattingPredicate,
        slides: Vec<(usize, &'a Slide)>,
    ) -> FormattedText {
        let slides_analyzed = slides.len();
        let mut matches = Vec::new();
        let mut by_slide = Vec::new();

        for (number, slide) in slides {
            let mut layout = TextLayout::default();
            let mut segments = Vec::new();

            for ctx in slide_runs(slide) {
                let start_position = layout.push(ctx.frame, ctx.paragraph, &ctx.run.text);
                if is_blank_run(&ctx.run.text) {
                    continue;
                }
                let formatting = effective_formatting(self.presentation, &ctx);
                if !predicate.matches(&formatting) {
                    continue;
                }

                segments.push(FormattedSegment {
                    text: ctx.run.text.clone(),
                    start_position,
                    shape_name: ctx.shape.name.clone(),
                });
                matches.push(FormattedRun {
                    slide_number: number,
                    slide_id: slide.id,
                    shape_name: ctx.shape.name.clone(),
                    shape_type: ctx.shape.type_name(),
                    placeholder: ctx.placeholder().map(|ph| ph.ph_type),
                    text: ctx.run.text.clone(),
                    start_position,
                    formatting,
                });
            }

            if !segments.is_empty() {
                by_slide.push(SlideFormattedText {
                    slide_number: number,
                    title: slide.title(),
                    complete_text: layout.text,
                    segments,
                });
            }
        }

        FormattedText {
            predicate: predicate.to_string(),
            slides_analyzed,
            slides_with_matches: by_slide.len(),
            match_count: matches.len(),
            matches,
            by_slide,
        }
    }

    /// Formatting statistics over the given slides (empty means all)
    pub fn formatting_analysis(&self, slide_numbers: &[usize]) -> Result<FormattingAnalysis> {
        let slides = self.select_slides(slide_numbers)?;
        let mut analysis = FormattingAnalysis {
            slides_analyzed: slides.len(),
            total_runs: 0,
            formatted_runs: 0,
            counts: FormattingCounts::default(),
            fonts: BTreeMap::new(),
            sizes: BTreeMap::new(),
            colors: BTreeMap::new(),
            slides: Vec::new(),
        };

        for (number, slide) in slides {
            let mut stats = SlideFormattingStats {
                slide_number: number,
                runs: 0,
                formatted_runs: 0,
                counts: FormattingCounts::default(),
            };

            for ctx in slide_runs(slide) {
                if is_blank_run(&ctx.run.text) {
                    continue;
                }
                let formatting = effective_formatting(self.presentation, &ctx);
                stats.runs += 1;
                if stats.counts.record(&formatting) {
                    stats.formatted_runs += 1;
                }
                *analysis.fonts.entry(formatting.font).or_default() += 1;
                *analysis.sizes.entry(formatting.size.to_string()).or_default() += 1;
                *analysis.colors.entry(formatting.color).or_default() += 1;
            }

            analysis.total_runs += stats.runs;
            analysis.formatted_runs += stats.formatted_runs;
            analysis.counts = analysis.counts.add(&stats.counts);
            analysis.slides.push(stats);
        }

        Ok(analysis)
    }
}
