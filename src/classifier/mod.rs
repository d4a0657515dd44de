//! Line-based text/code segmentation for completions with no structure.
//!
//! A line is code-like when its trimmed form starts with one of
//! [`CODE_PREFIXES`] or a structural character (`{ } ( ) [ ] ;`), or when
//! it is an indented non-blank line while a code run is open.
//!
//! Blank lines belong to whichever run is open: they keep paragraph spacing
//! inside text and never close a code run.
//!
//! Known limitation: the language of a code run cannot be inferred from these
//! heuristics, so every code block carries the classifier's single language.

use crate::wire::{BlockKind, ContentBlock};

pub const CODE_PREFIXES: &[&str] = &[
    // definitions
    "def ", "class ", "function ", "fn ", "pub fn ", "func ", "struct ", "impl ",
    "const ", "let ", "var ", "public ", "private ", "protected ", "static ",
    "async ", "export ",
    // imports
    "import ", "from ", "#include", "package ",
    // control flow
    "if ", "if(", "elif ", "else:", "else {", "for ", "for(", "while ", "while(",
    "return ", "return;", "try:", "try {", "except ", "catch ",
    // output
    "print(", "printf(", "println!(", "console.", "System.out.", "echo ",
    // comments
    "//", "/*",
];

const STRUCTURAL: &[char] = &['{', '}', '(', ')', '[', ']', ';'];

pub struct Classifier {
    language: String,
}

impl Classifier {
    pub fn new(language: impl Into<String>) -> Self {
        Self { language: language.into() }
    }

    pub fn classify(&self, text: &str) -> Vec<ContentBlock> {
        let mut blocks = Vec::new();
        let mut text_run = String::new();
        let mut code_run = String::new();
        let mut open: Option<BlockKind> = None;

        for line in text.lines() {
            let kind = if line.trim().is_empty() {
                open.unwrap_or(BlockKind::Text)
            } else if is_code_line(line, open == Some(BlockKind::Code)) {
                BlockKind::Code
            } else {
                BlockKind::Text
            };

            match kind {
                BlockKind::Code => {
                    self.flush(&mut blocks, &mut text_run, BlockKind::Text);
                    code_run.push_str(line);
                    code_run.push('\n');
                }
                BlockKind::Text => {
                    self.flush(&mut blocks, &mut code_run, BlockKind::Code);
                    text_run.push_str(line);
                    text_run.push('\n');
                }
            }

            if !line.trim().is_empty() {
                open = Some(kind);
            }
        }

        self.flush(&mut blocks, &mut text_run, BlockKind::Text);
        self.flush(&mut blocks, &mut code_run, BlockKind::Code);
        blocks
    }

    fn flush(&self, blocks: &mut Vec<ContentBlock>, run: &mut String, kind: BlockKind) {
        let block = match kind {
            BlockKind::Text => ContentBlock::text(run.trim()),
            BlockKind::Code => ContentBlock::code(code_body(run), self.language.as_str()),
        };
        if !block.is_blank() {
            blocks.push(block);
        }
        run.clear();
    }
}

/// Drops blank lines around a code run but keeps the first line's indent.
fn code_body(run: &str) -> String {
    run.lines()
        .skip_while(|l| l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

pub fn is_code_line(line: &str, code_open: bool) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    CODE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        || trimmed.starts_with(STRUCTURAL)
        || (code_open && line.starts_with(char::is_whitespace))
}
