//! Template tokenizer and block parser
//!
//! Turns template text into a tree of nodes borrowing from the source, so
//! the decrypted template is never copied while it is parsed. Nesting of
//! `if`, `unless`, `each` and `with` blocks is tracked explicitly.
//!
//! Malformed input never fails the parse:
//! - a closing tag with no matching open block is dropped;
//! - a block left open at the end of the template loses its tags and its
//!   contents are spliced into the enclosing level;
//! - a closing tag for an outer block also ends every block opened inside it.
//!
//! The only hard error is nesting deeper than [`MAX_DEPTH`].

use thiserror::Error;

/// Maximum number of simultaneously open blocks
pub const MAX_DEPTH: usize = 64;

/// Failures while parsing or rendering a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("blocks nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("value could not be rendered: {0}")]
    Serialize(String),
}

/// The four block helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    Unless,
    Each,
    With,
}

impl BlockKind {
    const ALL: [BlockKind; 4] = [Self::If, Self::Unless, Self::Each, Self::With];

    pub fn name(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Unless => "unless",
            Self::Each => "each",
            Self::With => "with",
        }
    }

    fn is_conditional(self) -> bool {
        matches!(self, Self::If | Self::Unless)
    }
}

/// A parsed template node
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'t> {
    Text(&'t str),
    Variable(&'t str),
    If {
        condition: &'t str,
        /// `unless` blocks invert the condition
        negate: bool,
        then: Vec<Node<'t>>,
        otherwise: Vec<Node<'t>>,
    },
    Each {
        path: &'t str,
        body: Vec<Node<'t>>,
    },
    With {
        path: &'t str,
        body: Vec<Node<'t>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'t> {
    Text(&'t str),
    Open(BlockKind, &'t str),
    Close(BlockKind),
    Else,
    Variable(&'t str),
}

/// Split a template into text and `{{...}}` tags
///
/// A tag is `{{`, a non-empty run without `}`, then `}}`. Anything else is
/// plain text.
fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(found) = template[cursor..].find("{{") {
        let open = cursor + found;
        let content_start = open + 2;
        let tag = template[content_start..].find('}').and_then(|len| {
            let close = content_start + len;
            (len > 0 && template[close..].starts_with("}}")).then_some(close)
        });

        match tag {
            Some(close) => {
                if text_start < open {
                    tokens.push(Token::Text(&template[text_start..open]));
                }
                tokens.push(classify(&template[content_start..close]));
                cursor = close + 2;
                text_start = cursor;
            }
            None => cursor = open + 1,
        }
    }

    if text_start < template.len() {
        tokens.push(Token::Text(&template[text_start..]));
    }
    tokens
}

fn classify(content: &str) -> Token<'_> {
    if let Some(rest) = content.strip_prefix('#') {
        for kind in BlockKind::ALL {
            let Some(after) = rest.strip_prefix(kind.name()) else {
                continue;
            };
            if after.starts_with(char::is_whitespace) && !after.trim().is_empty() {
                return Token::Open(kind, after.trim());
            }
        }
    }

    if let Some(rest) = content.strip_prefix('/') {
        if let Some(kind) = BlockKind::ALL.into_iter().find(|kind| kind.name() == rest) {
            return Token::Close(kind);
        }
    }

    if content.trim() == "else" {
        return Token::Else;
    }

    Token::Variable(content.trim())
}

/// A block whose closing tag has not been seen yet
struct OpenBlock<'t> {
    kind: BlockKind,
    expr: &'t str,
    children: Vec<Node<'t>>,
    otherwise: Option<Vec<Node<'t>>>,
}

impl<'t> OpenBlock<'t> {
    fn current(&mut self) -> &mut Vec<Node<'t>> {
        self.otherwise.as_mut().unwrap_or(&mut self.children)
    }

    fn into_node(self) -> Node<'t> {
        match self.kind {
            BlockKind::If | BlockKind::Unless => Node::If {
                condition: self.expr,
                negate: self.kind == BlockKind::Unless,
                then: self.children,
                otherwise: self.otherwise.unwrap_or_default(),
            },
            BlockKind::Each => Node::Each {
                path: self.expr,
                body: self.children,
            },
            BlockKind::With => Node::With {
                path: self.expr,
                body: self.children,
            },
        }
    }

    /// Contents of a block that was never closed, tags removed
    fn into_spliced(self) -> Vec<Node<'t>> {
        let mut nodes = self.children;
        if let Some(otherwise) = self.otherwise {
            nodes.push(Node::Variable("else"));
            nodes.extend(otherwise);
        }
        nodes
    }
}

struct Parser<'t> {
    root: Vec<Node<'t>>,
    stack: Vec<OpenBlock<'t>>,
}

impl<'t> Parser<'t> {
    fn target(&mut self) -> &mut Vec<Node<'t>> {
        match self.stack.last_mut() {
            Some(block) => block.current(),
            None => &mut self.root,
        }
    }

    fn open(&mut self, kind: BlockKind, expr: &'t str) -> Result<(), TemplateError> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(TemplateError::TooDeep);
        }
        self.stack.push(OpenBlock {
            kind,
            expr,
            children: Vec::new(),
            otherwise: None,
        });
        Ok(())
    }

    fn close(&mut self, kind: BlockKind) {
        let Some(position) = self.stack.iter().rposition(|block| block.kind == kind) else {
            return;
        };
        while self.stack.len() > position + 1 {
            self.splice_top();
        }
        if let Some(block) = self.stack.pop() {
            let node = block.into_node();
            self.target().push(node);
        }
    }

    fn otherwise(&mut self) {
        match self.stack.last_mut() {
            Some(block) if block.kind.is_conditional() && block.otherwise.is_none() => {
                block.otherwise = Some(Vec::new());
            }
            _ => self.target().push(Node::Variable("else")),
        }
    }

    fn splice_top(&mut self) {
        if let Some(block) = self.stack.pop() {
            let nodes = block.into_spliced();
            self.target().extend(nodes);
        }
    }

    fn finish(mut self) -> Vec<Node<'t>> {
        while !self.stack.is_empty() {
            self.splice_top();
        }
        self.root
    }
}

/// Parse a template into nodes
pub fn parse(template: &str) -> Result<Vec<Node<'_>>, TemplateError> {
    let mut parser = Parser {
        root: Vec::new(),
        stack: Vec::new(),
    };

    for token in tokenize(template) {
        match token {
            Token::Text(text) => parser.target().push(Node::Text(text)),
            Token::Variable(expr) => parser.target().push(Node::Variable(expr)),
            Token::Open(kind, expr) => parser.open(kind, expr)?,
            Token::Close(kind) => parser.close(kind),
            Token::Else => parser.otherwise(),
        }
    }

    Ok(parser.finish())
}
