//! Verbose sub-question trace
//!
//! Human-readable lines printed when the engine runs verbose. Each
//! sub-question gets a label from its position in the decomposition, so its
//! question and answer lines share a colour regardless of completion order.

use colored::{Color, Colorize};

const PALETTE: &[Color] = &[
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Red,
    Color::BrightCyan,
    Color::BrightMagenta,
    Color::BrightGreen,
    Color::BrightYellow,
];

/// Per-sub-question trace label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLabel {
    index: usize,
}

impl TraceLabel {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Position of the sub-question in the decomposition
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn color(&self) -> Color {
        PALETTE[self.index % PALETTE.len()]
    }
}

/// Labels for a batch of `count` sub-questions
pub fn label_mapping(count: usize) -> Vec<TraceLabel> {
    (0..count).map(TraceLabel::new).collect()
}

/// Prints trace lines when verbose
#[derive(Debug, Clone, Copy)]
pub struct TracePrinter {
    verbose: bool,
}

impl TracePrinter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn generated(&self, count: usize) {
        if self.verbose {
            println!("Generated {} sub questions.", count);
        }
    }

    pub fn question(&self, label: TraceLabel, tool_name: &str, question: &str) {
        if self.verbose {
            println!("{}", question_line(tool_name, question).color(label.color()));
        }
    }

    pub fn answer(&self, label: TraceLabel, tool_name: &str, answer: &str) {
        if self.verbose {
            println!("{}", answer_line(tool_name, answer).color(label.color()));
        }
    }
}

pub fn question_line(tool_name: &str, question: &str) -> String {
    format!("[{}] Q: {}", tool_name, question)
}

pub fn answer_line(tool_name: &str, answer: &str) -> String {
    format!("[{}] A: {}", tool_name, answer)
}
