//! Прощающий парсер CSS.
//!
//! Строит дерево правил из потока токенов [`Lexer`]. Незакрытый блок в
//! конце ввода - ошибка, остальной мусор пропускается.

use super::error::CssParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};

/// Предельная глубина вложенности блоков и значений.
pub const MAX_NESTING: usize = 4096;

/// Таблица стилей.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub rules: Vec<CssNode>,
}

/// Узел верхнего уровня или вложенного блока.
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Rule(StyleRule),
    AtRule(AtRule),
}

/// `selector { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Текст селектора со свёрнутыми пробелами.
    pub selector: String,
    pub block: Block,
    pub span: Span,
}

/// `@name prelude { ... }` или `@name prelude;`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Имя без `@`, в нижнем регистре.
    pub name: String,
    pub prelude: String,
    pub block: Option<Block>,
    pub span: Span,
}

impl AtRule {
    /// Синтетический селектор для отчёта: `@name prelude`.
    pub fn selector(&self) -> String {
        if self.prelude.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, self.prelude)
        }
    }
}

/// Содержимое `{ ... }`: декларации и вложенные правила.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub rules: Vec<CssNode>,
}

/// `property: value [!important]`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Имя свойства. Кастомные свойства (`--x`) сохраняют регистр.
    pub property: String,
    pub value: Vec<ComponentValue>,
    pub important: bool,
    pub span: Span,
}

impl Declaration {
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

/// Элемент значения декларации.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    Ident(String),
    Function { name: String, args: Vec<ComponentValue> },
    Number(f64),
    Percentage(f64),
    Dimension { value: f64, unit: String },
    Str(String),
    Hash(String),
    Url(String),
    Delim(char),
    Comma,
    /// `( ... )` или `[ ... ]` без имени функции.
    Block { open: char, values: Vec<ComponentValue> },
}

impl ComponentValue {
    /// Обойти значение и все вложенные в него значения.
    pub fn walk<'v>(&'v self, visit: &mut impl FnMut(&'v ComponentValue)) {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            visit(self);
            match self {
                ComponentValue::Function { args: values, .. } | ComponentValue::Block { values, .. } => {
                    for value in values {
                        value.walk(visit);
                    }
                }
                _ => {}
            }
        })
    }
}

/// Парсер таблицы стилей.
pub struct Parser<'a> {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        let lexer = Lexer::new(source);
        Self {
            source: lexer.source(),
            tokens: lexer.tokenize(),
            pos: 0,
            depth: 0,
        }
    }

    /// Распарсить всю таблицу стилей.
    pub fn parse_stylesheet(&mut self) -> Result<Stylesheet, CssParseError> {
        let mut rules = Vec::new();

        loop {
            self.skip_trivia();
            match &self.peek().value {
                Token::Eof => break,
                Token::RBrace => {
                    log::debug!("stray '}}' at {} skipped", self.peek().span.start);
                    self.bump();
                }
                Token::AtKeyword(_) => rules.push(self.parse_at_rule()?),
                _ => {
                    if let Some(rule) = self.parse_style_rule()? {
                        rules.push(rule);
                    }
                }
            }
        }

        Ok(Stylesheet { rules })
    }

    fn peek(&self) -> &Spanned<Token> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn bump(&mut self) -> Spanned<Token> {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn skip_whitespace(&mut self) {
        while self.peek().value.is_whitespace() {
            self.bump();
        }
    }

    /// Пропустить пробелы и пустые `;`.
    fn skip_trivia(&mut self) {
        while matches!(self.peek().value, Token::Whitespace | Token::Semicolon) {
            self.bump();
        }
    }

    /// Собрать прелюдию до `{`, `;` или `}` вне скобок.
    fn prelude_end(&mut self) -> usize {
        let mut depth = 0usize;
        loop {
            match &self.peek().value {
                Token::Eof => return self.pos,
                Token::LParen | Token::Function(_) | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                Token::LBrace | Token::RBrace => return self.pos,
                Token::Semicolon if depth == 0 => return self.pos,
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_at_rule(&mut self) -> Result<CssNode, CssParseError> {
        let start = self.bump();
        let name = match &start.value {
            Token::AtKeyword(name) => name.to_ascii_lowercase(),
            _ => String::new(),
        };

        let prelude_start = self.pos;
        let prelude_end = self.prelude_end();
        let prelude = self.text_of(prelude_start, prelude_end);

        let next = self.peek().clone();
        let (block, end) = match next.value {
            Token::LBrace => {
                self.bump();
                let (block, close) = self.parse_block(next.span)?;
                (Some(block), close)
            }
            Token::Semicolon => {
                self.bump();
                (None, next.span)
            }
            _ => (None, next.span),
        };

        Ok(CssNode::AtRule(AtRule {
            name,
            prelude,
            block,
            span: start.span.merge(end),
        }))
    }

    /// Правило со стилем. `None`, если прелюдия оборвалась без блока.
    fn parse_style_rule(&mut self) -> Result<Option<CssNode>, CssParseError> {
        let start = self.peek().span;
        let prelude_start = self.pos;
        let prelude_end = self.prelude_end();
        let selector = self.text_of(prelude_start, prelude_end);

        let next = self.peek().clone();
        match next.value {
            Token::LBrace => {
                self.bump();
                let (block, close) = self.parse_block(next.span)?;
                Ok(Some(CssNode::Rule(StyleRule {
                    selector,
                    block,
                    span: start.merge(close),
                })))
            }
            Token::Eof if !selector.is_empty() => Err(CssParseError::unexpected_eof(
                next.span,
                format!("expected '{{' after '{selector}'"),
            )),
            Token::Semicolon => {
                log::debug!("junk '{}' before ';' skipped", selector);
                self.bump();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Распарсить блок после `{`. Возвращает блок и позицию `}`.
    fn parse_block(&mut self, open: Span) -> Result<(Block, Span), CssParseError> {
        if self.depth >= MAX_NESTING {
            return Err(CssParseError::TooDeep {
                span: open,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.parse_block_inner(open));
        self.depth -= 1;
        result
    }

    fn parse_block_inner(&mut self, open: Span) -> Result<(Block, Span), CssParseError> {
        let mut block = Block::default();

        loop {
            self.skip_trivia();
            match &self.peek().value {
                Token::RBrace => {
                    let close = self.bump();
                    return Ok((block, close.span));
                }
                Token::Eof => return Err(CssParseError::UnclosedBlock { span: open }),
                Token::AtKeyword(_) => block.rules.push(self.parse_at_rule()?),
                _ if self.looks_like_declaration() => {
                    if let Some(declaration) = self.parse_declaration()? {
                        block.declarations.push(declaration);
                    }
                }
                _ => {
                    if let Some(rule) = self.parse_style_rule()? {
                        block.rules.push(rule);
                    }
                }
            }
        }
    }

    /// `ident :` и до `;`/`}` не встречается `{`.
    fn looks_like_declaration(&self) -> bool {
        let mut rest = self.tokens[self.pos..].iter().filter(|t| !t.value.is_whitespace());
        if !matches!(rest.next().map(|t| &t.value), Some(Token::Ident(_))) {
            return false;
        }
        if !matches!(rest.next().map(|t| &t.value), Some(Token::Colon)) {
            return false;
        }
        for token in rest {
            match token.value {
                Token::LBrace => return false,
                Token::Semicolon | Token::RBrace | Token::Eof => return true,
                _ => {}
            }
        }
        true
    }

    fn parse_declaration(&mut self) -> Result<Option<Declaration>, CssParseError> {
        self.skip_whitespace();
        let name = self.bump();
        let property = match name.value {
            Token::Ident(ident) if ident.starts_with("--") => ident,
            Token::Ident(ident) => ident.to_ascii_lowercase(),
            _ => return Ok(None),
        };
        self.skip_whitespace();
        self.bump(); // ':'

        let value_start = self.pos;
        let mut depth = 0usize;
        loop {
            match &self.peek().value {
                Token::Eof | Token::RBrace => break,
                Token::Semicolon if depth == 0 => break,
                Token::LParen | Token::Function(_) | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let value_end = self.pos;
        let end_span = if value_end > value_start {
            self.tokens[value_end - 1].span
        } else {
            name.span
        };
        if matches!(self.peek().value, Token::Semicolon) {
            self.bump();
        }

        let mut value = component_values(&self.tokens[value_start..value_end])?;
        let important = strip_important(&mut value);

        Ok(Some(Declaration {
            property,
            value,
            important,
            span: name.span.merge(end_span),
        }))
    }

    /// Текст токенов `[from, to)` со свёрнутыми пробелами.
    fn text_of(&self, from: usize, to: usize) -> String {
        let mut text = String::new();
        let mut pending_space = false;
        for token in &self.tokens[from..to] {
            if token.value.is_whitespace() {
                pending_space = !text.is_empty();
                continue;
            }
            if pending_space {
                text.push(' ');
                pending_space = false;
            }
            text.push_str(&self.source[token.span.start..token.span.end]);
        }
        text
    }
}

/// Превратить токены значения в дерево компонентов.
fn component_values(tokens: &[Spanned<Token>]) -> Result<Vec<ComponentValue>, CssParseError> {
    let mut pos = 0;
    collect_values(tokens, &mut pos, None, 0)
}

fn collect_values(
    tokens: &[Spanned<Token>],
    pos: &mut usize,
    close: Option<&Token>,
    depth: usize,
) -> Result<Vec<ComponentValue>, CssParseError> {
    if depth > MAX_NESTING {
        let span = tokens.get(pos.saturating_sub(1)).map_or(Span::new(0, 0), |t| t.span);
        return Err(CssParseError::TooDeep {
            span,
            limit: MAX_NESTING,
        });
    }
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        let mut values = Vec::new();
        while let Some(token) = tokens.get(*pos) {
            *pos += 1;
            if Some(&token.value) == close {
                break;
            }
            let value = match &token.value {
                Token::Whitespace | Token::Eof => continue,
                Token::Function(name) => ComponentValue::Function {
                    name: name.to_ascii_lowercase(),
                    args: collect_values(tokens, pos, Some(&Token::RParen), depth + 1)?,
                },
                Token::LParen => ComponentValue::Block {
                    open: '(',
                    values: collect_values(tokens, pos, Some(&Token::RParen), depth + 1)?,
                },
                Token::LBracket => ComponentValue::Block {
                    open: '[',
                    values: collect_values(tokens, pos, Some(&Token::RBracket), depth + 1)?,
                },
                Token::Ident(ident) => ComponentValue::Ident(ident.clone()),
                Token::Number(n) => ComponentValue::Number(*n),
                Token::Percentage(n) => ComponentValue::Percentage(*n),
                Token::Dimension(value, unit) => ComponentValue::Dimension {
                    value: *value,
                    unit: unit.clone(),
                },
                Token::String(s) => ComponentValue::Str(s.clone()),
                Token::Hash(h) => ComponentValue::Hash(h.clone()),
                Token::Url(u) => ComponentValue::Url(u.clone()),
                Token::Comma => ComponentValue::Comma,
                Token::Colon => ComponentValue::Delim(':'),
                Token::Semicolon => ComponentValue::Delim(';'),
                Token::Delim(c) => ComponentValue::Delim(*c),
                Token::RParen => ComponentValue::Delim(')'),
                Token::RBracket => ComponentValue::Delim(']'),
                Token::LBrace => ComponentValue::Delim('{'),
                Token::RBrace => ComponentValue::Delim('}'),
                Token::AtKeyword(name) => ComponentValue::Ident(format!("@{name}")),
            };
            values.push(value);
        }
        Ok(values)
    })
}

/// Убрать хвостовой `!important` и сообщить, был ли он.
fn strip_important(values: &mut Vec<ComponentValue>) -> bool {
    let n = values.len();
    if n >= 2 {
        if let (ComponentValue::Delim('!'), ComponentValue::Ident(word)) = (&values[n - 2], &values[n - 1]) {
            if word.eq_ignore_ascii_case("important") {
                values.truncate(n - 2);
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Stylesheet {
        Parser::new(source).parse_stylesheet().unwrap()
    }

    fn rule(node: &CssNode) -> &StyleRule {
        match node {
            CssNode::Rule(rule) => rule,
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_rule() {
        let sheet = parse("a:hover,  .nav > li { color: red; Display: GRID }");
        assert_eq!(sheet.rules.len(), 1);
        let rule = rule(&sheet.rules[0]);
        assert_eq!(rule.selector, "a:hover, .nav > li");
        assert_eq!(rule.block.declarations.len(), 2);
        assert_eq!(rule.block.declarations[1].property, "display");
        assert_eq!(rule.block.declarations[1].value, vec![ComponentValue::Ident("GRID".into())]);
    }

    #[test]
    fn test_parse_function_values() {
        let sheet = parse(".box { width: clamp(10px, 50%, calc(100vw - 2rem)) !important; }");
        let decl = &rule(&sheet.rules[0]).block.declarations[0];
        assert!(decl.important);
        match &decl.value[0] {
            ComponentValue::Function { name, args } => {
                assert_eq!(name, "clamp");
                assert!(args.iter().any(|a| matches!(a, ComponentValue::Function { name, .. } if name == "calc")));
                assert!(args.contains(&ComponentValue::Percentage(50.0)));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_at_rules() {
        let sheet = parse("@import url(a.css); @container card (min-width: 400px) { .title { font-size: 2cqi; } }");
        assert_eq!(sheet.rules.len(), 2);
        match &sheet.rules[1] {
            CssNode::AtRule(at) => {
                assert_eq!(at.name, "container");
                assert_eq!(at.prelude, "card (min-width: 400px)");
                assert_eq!(at.selector(), "@container card (min-width: 400px)");
                let block = at.block.as_ref().unwrap();
                assert_eq!(rule(&block.rules[0]).selector, ".title");
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
        match &sheet.rules[0] {
            CssNode::AtRule(at) => assert!(at.block.is_none()),
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nesting() {
        let sheet = parse(".card { color: blue; &:hover { color: red; } .title { margin: 0 } }");
        let card = rule(&sheet.rules[0]);
        assert_eq!(card.block.declarations.len(), 1);
        assert_eq!(card.block.rules.len(), 2);
        assert_eq!(rule(&card.block.rules[0]).selector, "&:hover");
    }

    #[test]
    fn test_custom_property_keeps_case() {
        let sheet = parse(":root { --Main-Color: #FFF; }");
        let decl = &rule(&sheet.rules[0]).block.declarations[0];
        assert_eq!(decl.property, "--Main-Color");
        assert!(decl.is_custom_property());
        assert_eq!(decl.value, vec![ComponentValue::Hash("FFF".into())]);
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let err = Parser::new("a { color: red;").parse_stylesheet().unwrap_err();
        assert!(matches!(err, CssParseError::UnclosedBlock { .. }));
        assert_eq!(err.span().start, 2);
    }

    #[test]
    fn test_selector_without_block_is_error() {
        let err = Parser::new("a, b").parse_stylesheet().unwrap_err();
        assert!(matches!(err, CssParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_stray_tokens_are_skipped() {
        let sheet = parse("} ; garbage; b { top: 0 }");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(rule(&sheet.rules[0]).selector, "b");
    }

    #[test]
    fn test_walk_values() {
        let sheet = parse("a { background: linear-gradient(in oklch, red, blue) }");
        let decl = &rule(&sheet.rules[0]).block.declarations[0];
        let mut idents = Vec::new();
        for value in &decl.value {
            value.walk(&mut |v| {
                if let ComponentValue::Ident(name) = v {
                    idents.push(name.as_str());
                }
            });
        }
        assert_eq!(idents, vec!["in", "oklch", "red", "blue"]);
    }
}
