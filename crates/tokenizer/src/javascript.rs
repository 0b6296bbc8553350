use fingerprint::TokenCode;
use tree_sitter::{Language, Parser, Tree};

use crate::{TokenizeError, Tokenizer};

/// Tokenizes JavaScript by syntax-tree shape.
///
/// The source is parsed with tree-sitter and walked in pre-order. Every
/// inner node (one with at least one child) contributes its node kind id;
/// leaves such as identifiers, literals and punctuation are skipped, as are
/// comments. Renaming variables or reformatting code therefore leaves the
/// token stream unchanged.
#[derive(Debug, Clone)]
pub struct JavaScriptTokenizer {
    language: Language,
    comment: TokenCode,
    strict: bool,
}

impl JavaScriptTokenizer {
    pub fn new() -> Self {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let comment = language.id_for_node_kind("comment", true);
        Self {
            language,
            comment,
            strict: false,
        }
    }

    /// Reject sources whose syntax tree contains error or missing nodes.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Node kind id for a named grammar symbol, `None` if the grammar lacks it.
    pub fn symbol(&self, kind: &str) -> Option<TokenCode> {
        match self.language.id_for_node_kind(kind, true) {
            0 => None,
            id => Some(id),
        }
    }

    fn parse(&self, source: &[u8]) -> Result<Tree, TokenizeError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|err| TokenizeError::Parser(err.to_string()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| TokenizeError::Parser("parser returned no tree".to_string()))
    }
}

impl Default for JavaScriptTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for JavaScriptTokenizer {
    fn tokenize(&self, source: &[u8]) -> Result<Vec<TokenCode>, TokenizeError> {
        let tree = self.parse(source)?;
        let mut cursor = tree.walk();
        let mut tokens = Vec::new();

        loop {
            let node = cursor.node();
            if self.strict && (node.is_error() || node.is_missing()) {
                let pos = node.start_position();
                return Err(TokenizeError::Syntax {
                    line: pos.row + 1,
                    column: pos.column + 1,
                });
            }
            if node.child_count() > 0 && node.kind_id() != self.comment {
                tokens.push(node.kind_id());
            }

            // Descend first, then try siblings, then climb until an
            // ancestor has an unvisited sibling.
            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            let mut advanced = false;
            while cursor.goto_parent() {
                if cursor.goto_next_sibling() {
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                break;
            }
        }

        Ok(tokens)
    }
}
