// Greedy line breaking for styled text.
use crate::compose::RichText;

use super::fonts::FontSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub runs: Vec<Run>,
    pub width: f32,
}

impl Line {
    #[cfg(test)]
    pub fn plain(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn push(&mut self, text: &str, bold: bool, width: f32) {
        match self.runs.last_mut() {
            Some(last) if last.bold == bold => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                bold,
            }),
        }
        self.width += width;
    }

    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

// A word is the styled text between two whitespace gaps; it may change style
// midway, e.g. a bold title followed by a plain comma.
type Word = Vec<(char, bool)>;

fn split_words(text: &RichText) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Word::new();
    for span in &text.spans {
        for c in span.text.chars() {
            if c.is_whitespace() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            } else {
                current.push((c, span.bold));
            }
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn char_width(c: char, bold: bool, fonts: &FontSet, size: f32) -> f32 {
    fonts.face(bold).width(c.encode_utf8(&mut [0; 4]), size)
}

fn word_width(word: &Word, fonts: &FontSet, size: f32) -> f32 {
    word.iter().map(|&(c, b)| char_width(c, b, fonts, size)).sum()
}

fn append_word(line: &mut Line, word: &Word, fonts: &FontSet, size: f32) {
    for &(c, bold) in word {
        line.push(c.encode_utf8(&mut [0; 4]), bold, char_width(c, bold, fonts, size));
    }
}

/// Break `text` into lines no wider than `max_width` points. Words wider
/// than a whole line are split between characters.
pub fn wrap(text: &RichText, fonts: &FontSet, size: f32, max_width: f32) -> Vec<Line> {
    let space = fonts.regular.width(" ", size);
    let mut lines = Vec::new();
    let mut line = Line::default();

    for word in split_words(text) {
        let width = word_width(&word, fonts, size);

        if width > max_width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for &(c, bold) in &word {
                let w = char_width(c, bold, fonts, size);
                if line.width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                line.push(c.encode_utf8(&mut [0; 4]), bold, w);
            }
            continue;
        }

        if line.is_empty() {
            append_word(&mut line, &word, fonts, size);
        } else if line.width + space + width <= max_width {
            let bold = line.runs.last().is_some_and(|r| r.bold);
            line.push(" ", bold, space);
            append_word(&mut line, &word, fonts, size);
        } else {
            lines.push(std::mem::take(&mut line));
            append_word(&mut line, &word, fonts, size);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Left edge for a line of `width` placed in a box starting at `x`.
pub fn align_x(align: Align, x: f32, box_width: f32, width: f32) -> f32 {
    match align {
        Align::Left => x,
        Align::Center => x + (box_width - width) / 2.0,
    }
}
