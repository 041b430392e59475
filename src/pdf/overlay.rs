//! Overlay pages: the per-certificate text drawn on top of the template.
//!
//! Coordinates are PDF user space with the origin at the bottom-left of the
//! template page. Every position is derived from the page size read from the
//! template, so templates that are not A4 landscape still line up relative
//! to their own edges.

use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::compose::{ProgramEntry, RichText};
use crate::error::Result;
use crate::records::CertificateNumber;

use super::fonts::{encode_win_ansi, FontSet};
use super::layout::{align_x, wrap, Align, Line, Run};

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

/// Resource names used by overlay content streams.
pub const FONT_REGULAR: &str = "F1";
pub const FONT_BOLD: &str = "F2";

// Inner padding of a text frame on every side.
const FRAME_PADDING: f32 = 6.0;

// Page 1
const STATEMENT_SIZE: f32 = 14.0;
const STATEMENT_LEADING: f32 = 20.0;
const STATEMENT_FRAME_HEIGHT: f32 = 140.0;
const STATEMENT_FRAME_BOTTOM_FROM_TOP: f32 = 410.0;

// Page 2
const PROGRAM_SIZE: f32 = 11.0;
const PROGRAM_LEADING: f32 = 14.0;
const HEADING_SIZE: f32 = 11.0;
const NAME_SIZE: f32 = 8.0;
const NAME_STEP: f32 = 12.0;
const FIELD_SIZE: f32 = 12.0;
const FIELD_X_OFFSET: f32 = 57.0;

const SIGNATURE_SIZE: f32 = 12.0;
const SIGNATURE_Y: f32 = 60.0;

pub const ORGANIZERS_HEADING: &str = "Organizers:";
const BULLET: &str = "\u{2022} ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
impl PageSize {
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width: 841.89,
        height: 595.27,
    };
}

/// One rendered overlay in the coordinates of the template page it will
/// cover.
#[derive(Debug, Clone)]
pub struct OverlayPage {
    pub content: Content,
}

impl OverlayPage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.content.encode()?)
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Frame {
    fn inner_width(&self) -> f32 {
        self.width - 2.0 * FRAME_PADDING
    }
}

/// A laid-out line inside a frame. `prefix` is drawn at the frame edge and
/// the text starts at `indent`.
#[derive(Debug, Default)]
struct FlowLine {
    indent: f32,
    prefix: Option<&'static str>,
    line: Line,
}

struct Canvas<'a> {
    fonts: &'a FontSet,
    ops: Vec<Operation>,
}

impl<'a> Canvas<'a> {
    fn new(fonts: &'a FontSet) -> Self {
        Self {
            fonts,
            ops: vec![Operation::new("q", vec![]), Operation::new("g", vec![0.into()])],
        }
    }

    fn text(&mut self, x: f32, y: f32, runs: &[Run], size: f32) {
        if runs.iter().all(|r| r.text.is_empty()) {
            return;
        }
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        for run in runs {
            let font = if run.bold { FONT_BOLD } else { FONT_REGULAR };
            self.ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(&run.text))],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn centered(&mut self, cx: f32, y: f32, text: &str, bold: bool, size: f32) {
        let width = self.fonts.face(bold).width(text, size);
        let run = Run {
            text: text.to_string(),
            bold,
        };
        self.text(cx - width / 2.0, y, &[run], size);
    }

    /// Draw lines top to bottom inside `frame`, returning how many did not
    /// fit and were dropped.
    fn flow(
        &mut self,
        frame: Frame,
        lines: &[FlowLine],
        size: f32,
        leading: f32,
        align: Align,
    ) -> usize {
        let left = frame.x + FRAME_PADDING;
        let floor = frame.y + FRAME_PADDING;
        let mut baseline = frame.y + frame.height - FRAME_PADDING - size;

        for (i, flow) in lines.iter().enumerate() {
            if baseline < floor {
                return lines.len() - i;
            }
            let x = align_x(align, left, frame.inner_width(), flow.line.width) + flow.indent;
            if let Some(prefix) = flow.prefix {
                let run = Run {
                    text: prefix.to_string(),
                    bold: false,
                };
                self.text(left, baseline, &[run], size);
            }
            self.text(x, baseline, &flow.line.runs, size);
            baseline -= leading;
        }
        0
    }

    fn finish(mut self) -> OverlayPage {
        self.ops.push(Operation::new("Q", vec![]));
        OverlayPage {
            content: Content {
                operations: self.ops,
            },
        }
    }
}

fn signature_line(canvas: &mut Canvas<'_>, size: PageSize, signature: &str) {
    canvas.centered(size.width / 2.0, SIGNATURE_Y, signature, false, SIGNATURE_SIZE);
}

/// Page 1: the certification sentence centred in the upper-middle of the
/// page, with the place and date line near the bottom.
pub fn render_statement_page(
    size: PageSize,
    statement: &RichText,
    signature: &str,
    fonts: &FontSet,
) -> OverlayPage {
    let frame_width = size.width * 0.7;
    let frame = Frame {
        x: (size.width - frame_width) / 2.0,
        y: size.height - STATEMENT_FRAME_BOTTOM_FROM_TOP,
        width: frame_width,
        height: STATEMENT_FRAME_HEIGHT,
    };

    let lines: Vec<FlowLine> = wrap(statement, fonts, STATEMENT_SIZE, frame.inner_width())
        .into_iter()
        .map(|line| FlowLine {
            line,
            ..Default::default()
        })
        .collect();

    let mut canvas = Canvas::new(fonts);
    let dropped = canvas.flow(frame, &lines, STATEMENT_SIZE, STATEMENT_LEADING, Align::Center);
    if dropped > 0 {
        tracing::warn!("certificate statement overflows its frame, {} line(s) dropped", dropped);
    }
    signature_line(&mut canvas, size, signature);
    canvas.finish()
}

/// Fields of the second page that vary per certificate.
#[derive(Debug, Clone, Copy)]
pub struct ProgramPage<'a> {
    pub program: &'a [ProgramEntry],
    pub instructors: &'a [String],
    pub volume: Option<&'a str>,
    pub number: CertificateNumber,
    pub signature: &'a str,
}

fn program_lines(program: &[ProgramEntry], fonts: &FontSet, width: f32) -> Vec<FlowLine> {
    let bullet_width = fonts.regular.width(BULLET, PROGRAM_SIZE);
    let mut lines = Vec::new();

    for (i, entry) in program.iter().enumerate() {
        match entry {
            ProgramEntry::Paragraph(text) => {
                if i > 0 {
                    lines.push(FlowLine::default());
                }
                let mut rich = RichText::default();
                rich.push(text.as_str(), false);
                lines.extend(
                    wrap(&rich, fonts, PROGRAM_SIZE, width)
                        .into_iter()
                        .map(|line| FlowLine {
                            line,
                            ..Default::default()
                        }),
                );
            }
            ProgramEntry::Bullet(text) => {
                let mut rich = RichText::default();
                rich.push(text.as_str(), false);
                let wrapped = wrap(&rich, fonts, PROGRAM_SIZE, width - bullet_width);
                for (j, line) in wrapped.into_iter().enumerate() {
                    lines.push(FlowLine {
                        indent: bullet_width,
                        prefix: (j == 0).then_some(BULLET),
                        line,
                    });
                }
            }
        }
    }
    lines
}

/// Page 2: program content on the left; organizers, volume and certificate
/// number on the right; the place and date line at the bottom.
pub fn render_program_page(size: PageSize, page: &ProgramPage<'_>, fonts: &FontSet) -> OverlayPage {
    let top_y = size.height - 45.0 * MM;
    let right_x = size.width / 2.0 + 53.0 * MM;
    let mut canvas = Canvas::new(fonts);

    let frame = Frame {
        x: 40.0 * MM,
        y: 0.0,
        width: size.width / 2.0 - 130.0,
        height: top_y + 45.0,
    };
    let lines = program_lines(page.program, fonts, frame.inner_width());
    let dropped = canvas.flow(frame, &lines, PROGRAM_SIZE, PROGRAM_LEADING, Align::Left);
    if dropped > 0 {
        tracing::warn!("program text overflows page 2, {} line(s) dropped", dropped);
    }

    canvas.centered(right_x, top_y - 35.0, ORGANIZERS_HEADING, true, HEADING_SIZE);

    // Names stack downward until the slot passes the lower bound; the rest
    // are left off the page.
    let mut slot = top_y - 16.0;
    let mut drawn = 0;
    for name in page.instructors {
        canvas.centered(right_x, slot - 33.0, name.trim(), false, NAME_SIZE);
        drawn += 1;
        slot -= NAME_STEP;
        if slot < 60.0 * MM {
            break;
        }
    }
    if drawn < page.instructors.len() {
        tracing::warn!(
            "organizer list truncated: {} of {} names fit on page 2",
            drawn,
            page.instructors.len()
        );
    }

    if let Some(volume) = page.volume.map(str::trim).filter(|v| !v.is_empty()) {
        canvas.centered(right_x + FIELD_X_OFFSET, 77.0 * MM, volume, false, FIELD_SIZE);
    }
    canvas.centered(
        right_x + FIELD_X_OFFSET,
        67.0 * MM,
        &page.number.to_string(),
        false,
        FIELD_SIZE,
    );

    signature_line(&mut canvas, size, page.signature);
    canvas.finish()
}
