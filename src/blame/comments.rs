//! Comment detection keyed by file extension.
//!
//! A [`CommentClassifier`] is fed the physical lines of one file in order and
//! carries block-comment state from line to line.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Block comment delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDelimiters {
    pub start: &'static str,
    pub end: &'static str,
    /// Whether a block may open after code on the same line
    pub opens_mid_line: bool,
}

/// Comment syntax of one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line_markers: &'static [&'static str],
    pub blocks: &'static [BlockDelimiters],
}

const C_BLOCK: BlockDelimiters = BlockDelimiters {
    start: "/*",
    end: "*/",
    opens_mid_line: true,
};

const C_STYLE: CommentSyntax = CommentSyntax {
    line_markers: &["//"],
    blocks: &[C_BLOCK],
};

const HASH: CommentSyntax = CommentSyntax {
    line_markers: &["#"],
    blocks: &[],
};

const PYTHON: CommentSyntax = CommentSyntax {
    line_markers: &["#"],
    blocks: &[
        BlockDelimiters {
            start: "\"\"\"",
            end: "\"\"\"",
            opens_mid_line: false,
        },
        BlockDelimiters {
            start: "'''",
            end: "'''",
            opens_mid_line: false,
        },
    ],
};

const RUBY: CommentSyntax = CommentSyntax {
    line_markers: &["#"],
    blocks: &[BlockDelimiters {
        start: "=begin",
        end: "=end",
        opens_mid_line: false,
    }],
};

const SQL: CommentSyntax = CommentSyntax {
    line_markers: &["--"],
    blocks: &[C_BLOCK],
};

const MARKUP: CommentSyntax = CommentSyntax {
    line_markers: &[],
    blocks: &[BlockDelimiters {
        start: "<!--",
        end: "-->",
        opens_mid_line: true,
    }],
};

const CSS: CommentSyntax = CommentSyntax {
    line_markers: &[],
    blocks: &[C_BLOCK],
};

const HASKELL: CommentSyntax = CommentSyntax {
    line_markers: &["--"],
    blocks: &[BlockDelimiters {
        start: "{-",
        end: "-}",
        opens_mid_line: true,
    }],
};

const LUA: CommentSyntax = CommentSyntax {
    line_markers: &["--"],
    blocks: &[BlockDelimiters {
        start: "--[[",
        end: "]]",
        opens_mid_line: false,
    }],
};

const MATLAB: CommentSyntax = CommentSyntax {
    line_markers: &["%"],
    blocks: &[BlockDelimiters {
        start: "%{",
        end: "%}",
        opens_mid_line: false,
    }],
};

const PERCENT: CommentSyntax = CommentSyntax {
    line_markers: &["%"],
    blocks: &[],
};

const DASHES: CommentSyntax = CommentSyntax {
    line_markers: &["--"],
    blocks: &[],
};

const FORTRAN: CommentSyntax = CommentSyntax {
    line_markers: &["!"],
    blocks: &[],
};

static SYNTAX_BY_EXTENSION: Lazy<HashMap<&'static str, CommentSyntax>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for ext in [
        "c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx", "java", "js", "jsx", "ts", "tsx", "glsl",
        "cs", "go", "rs", "swift", "kt", "scala", "php", "dart", "groovy",
    ] {
        table.insert(ext, C_STYLE);
    }
    for ext in ["sh", "bash", "pl", "pm", "r", "yaml", "yml", "toml", "cmake", "cif", "mk"] {
        table.insert(ext, HASH);
    }
    for ext in ["py", "pyw", "pyi"] {
        table.insert(ext, PYTHON);
    }
    table.insert("rb", RUBY);
    table.insert("sql", SQL);
    for ext in ["html", "htm", "xml", "xhtml", "vue", "svg"] {
        table.insert(ext, MARKUP);
    }
    for ext in ["css", "scss", "less"] {
        table.insert(ext, CSS);
    }
    table.insert("hs", HASKELL);
    table.insert("lua", LUA);
    table.insert("m", MATLAB);
    for ext in ["tex", "sty", "erl"] {
        table.insert(ext, PERCENT);
    }
    for ext in ["ada", "adb", "ads", "vhd", "vhdl"] {
        table.insert(ext, DASHES);
    }
    for ext in ["f90", "f95", "f03"] {
        table.insert(ext, FORTRAN);
    }
    table
});

/// Comment syntax for a file extension, if the language is known
pub fn syntax_for(extension: &str) -> Option<CommentSyntax> {
    SYNTAX_BY_EXTENSION
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
}

/// Stateful per-file comment line detector.
#[derive(Debug, Clone)]
pub struct CommentClassifier {
    syntax: Option<CommentSyntax>,
    open_block: Option<&'static str>,
}

impl CommentClassifier {
    pub fn for_extension(extension: Option<&str>) -> Self {
        Self {
            syntax: extension.and_then(syntax_for),
            open_block: None,
        }
    }

    pub fn in_block(&self) -> bool {
        self.open_block.is_some()
    }

    /// Classify the next physical line of the file.
    ///
    /// A line is a comment when it lies inside a block comment, or when its
    /// first non-blank text opens a comment and no code follows the comment
    /// on the same line.
    pub fn is_comment_line(&mut self, line: &str) -> bool {
        let Some(syntax) = self.syntax else {
            return false;
        };
        let trimmed = line.trim();

        if let Some(end) = self.open_block {
            return match trimmed.find(end) {
                Some(pos) => {
                    self.open_block = None;
                    only_comment_after(syntax, &trimmed[pos + end.len()..])
                }
                None => true,
            };
        }

        if trimmed.is_empty() {
            return false;
        }

        for block in syntax.blocks {
            if let Some(after) = trimmed.strip_prefix(block.start) {
                return match after.find(block.end) {
                    Some(pos) => only_comment_after(syntax, &after[pos + block.end.len()..]),
                    None => {
                        self.open_block = Some(block.end);
                        true
                    }
                };
            }
        }

        if syntax.line_markers.iter().any(|m| trimmed.starts_with(m)) {
            return true;
        }

        // code line that may leave a block comment open
        for block in syntax.blocks.iter().filter(|b| b.opens_mid_line) {
            if let Some(pos) = trimmed.rfind(block.start) {
                if !trimmed[pos + block.start.len()..].contains(block.end) {
                    self.open_block = Some(block.end);
                }
            }
        }
        false
    }
}

fn only_comment_after(syntax: CommentSyntax, rest: &str) -> bool {
    let rest = rest.trim();
    rest.is_empty() || syntax.line_markers.iter().any(|m| rest.starts_with(m))
}
