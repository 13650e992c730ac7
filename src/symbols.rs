//! Snippet Extraction
//!
//! Turns the editor's document symbol tree into the ordered snippet batch
//! sent for stats. Only function-like symbols are kept, and each snippet is
//! capped to its first few lines to keep batch payloads small.

use serde::{Deserialize, Serialize};

/// Zero-based position. `character` counts Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Module,
    Class,
    Struct,
    Interface,
    Method,
    Function,
    Constructor,
    Variable,
    #[serde(other)]
    Other,
}

impl SymbolKind {
    pub fn is_function_like(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

/// One node of the editor's symbol tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: SourceRange,
    #[serde(default)]
    pub children: Vec<DocumentSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub range: SourceRange,
    pub text: String,
}

/// Snippets in document order.
///
/// Stats replies are matched to snippets purely by index, so a batch is
/// only ever appended to; there is no way to reorder or filter it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetBatch(Vec<Snippet>);

impl SnippetBatch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, range: SourceRange, text: impl Into<String>) {
        self.0.push(Snippet { range, text: text.into() });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snippet> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snippet> {
        self.0.iter()
    }

    /// Snippet texts in batch order, as sent on the wire
    pub fn texts(&self) -> Vec<String> {
        self.0.iter().map(|s| s.text.clone()).collect()
    }
}

impl FromIterator<(SourceRange, String)> for SnippetBatch {
    fn from_iter<T: IntoIterator<Item = (SourceRange, String)>>(iter: T) -> Self {
        let mut batch = SnippetBatch::new();
        for (range, text) in iter {
            batch.push(range, text);
        }
        batch
    }
}

/// Depth-first, parents before their children
pub fn flatten_symbols(symbols: &[DocumentSymbol]) -> Vec<&DocumentSymbol> {
    let mut out = Vec::new();
    for symbol in symbols {
        out.push(symbol);
        out.extend(flatten_symbols(&symbol.children));
    }
    out
}

/// Build the stats batch for a document.
///
/// Each function or method contributes the text from its start up to the
/// beginning of line `start + max_lines` (or its own last line, whichever
/// comes first). A symbol on a single line contributes its whole range.
pub fn extract_snippets(text: &str, symbols: &[DocumentSymbol], max_lines: u32) -> SnippetBatch {
    flatten_symbols(symbols)
        .into_iter()
        .filter(|s| s.kind.is_function_like())
        .map(|s| {
            let range = s.range;
            let end_line = range.end.line.min(range.start.line.saturating_add(max_lines));
            let end = if end_line == range.start.line {
                range.end
            } else {
                Position::new(end_line, 0)
            };
            (range, slice_text(text, range.start, end))
        })
        .collect()
}

/// Text between two positions, end exclusive
fn slice_text(text: &str, start: Position, end: Position) -> String {
    let mut out = String::new();
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let idx = idx as u32;
        if idx < start.line {
            continue;
        }
        if idx > end.line {
            break;
        }
        let from = if idx == start.line { start.character as usize } else { 0 };
        let chars = line.chars().skip(from);
        if idx == end.line {
            let take = (end.character as usize).saturating_sub(from);
            out.extend(chars.take(take));
        } else {
            out.extend(chars);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "class Calculator:\n    def add(self, a, b):\n        return a + b\n\n    def div(self, a, b):\n        if b == 0:\n            raise ValueError()\n        return a / b\n\ndef main(): pass\n";

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> SourceRange {
        SourceRange::new(Position::new(sl, sc), Position::new(el, ec))
    }

    fn symbol(name: &str, kind: SymbolKind, r: SourceRange, children: Vec<DocumentSymbol>) -> DocumentSymbol {
        DocumentSymbol { name: name.into(), kind, range: r, children }
    }

    fn tree() -> Vec<DocumentSymbol> {
        vec![
            symbol(
                "Calculator",
                SymbolKind::Class,
                range(0, 0, 7, 20),
                vec![
                    symbol("add", SymbolKind::Method, range(1, 4, 2, 20), vec![]),
                    symbol("div", SymbolKind::Method, range(4, 4, 7, 20), vec![]),
                ],
            ),
            symbol("main", SymbolKind::Function, range(9, 0, 9, 16), vec![]),
        ]
    }

    #[test]
    fn test_flatten_is_preorder() {
        let symbols = tree();
        let names: Vec<&str> = flatten_symbols(&symbols).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Calculator", "add", "div", "main"]);
    }

    #[test]
    fn test_extract_keeps_functions_in_order() {
        let batch = extract_snippets(SOURCE, &tree(), 10);
        assert_eq!(batch.len(), 3);
        // stops at the start of the symbol's last line
        assert_eq!(batch.get(0).unwrap().text, "def add(self, a, b):\n");
        assert_eq!(batch.get(1).unwrap().text, "def div(self, a, b):\n        if b == 0:\n            raise ValueError()\n");
        assert_eq!(batch.get(2).unwrap().text, "def main(): pass");
    }

    #[test]
    fn test_extract_caps_lines() {
        let batch = extract_snippets(SOURCE, &tree(), 2);
        let div = batch.get(1).unwrap();
        assert_eq!(div.text, "def div(self, a, b):\n        if b == 0:\n");
        assert_eq!(div.range, range(4, 4, 7, 20));
    }

    #[test]
    fn test_extract_empty_tree() {
        assert!(extract_snippets(SOURCE, &[], 10).is_empty());
    }

    #[test]
    fn test_symbol_kind_from_json() {
        let sym: DocumentSymbol = serde_json::from_value(serde_json::json!({
            "name": "x",
            "kind": "enumMember",
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 1}}
        }))
        .unwrap();
        assert_eq!(sym.kind, SymbolKind::Other);
        assert!(sym.children.is_empty());
    }

    #[test]
    fn test_batch_texts_preserve_order() {
        let batch: SnippetBatch = vec![
            (range(0, 0, 0, 1), "b".to_string()),
            (range(1, 0, 1, 1), "a".to_string()),
            (range(2, 0, 2, 1), "b".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(batch.texts(), vec!["b", "a", "b"]);
    }
}
