use std::str::FromStr;

use rustc_hash::FxHashMap;
use yangkit_resolver::{
    ResolvedSchema, SchemaResolverBuilder, config::ResolverConfig, path::schema_node_name,
};
use yangkit_schema::{
    Schema,
    findings::{Findings, FindingKind},
    keyword::Keyword,
    registry::Conformance,
    statement::{StatementId, StatementKind},
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Plus,
    Open,
    Close,
    Semicolon,
}

/// Splits YANG source text into tokens, tagged with their line.
fn tokenize(source: &str) -> anyhow::Result<Vec<(Token, u32)>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i += 2;
            }
            '{' => {
                tokens.push((Token::Open, line));
                i += 1;
            }
            '}' => {
                tokens.push((Token::Close, line));
                i += 1;
            }
            ';' => {
                tokens.push((Token::Semicolon, line));
                i += 1;
            }
            '+' if chars.get(i + 1).is_none_or(|next| next.is_whitespace()) => {
                tokens.push((Token::Plus, line));
                i += 1;
            }
            '"' | '\'' => {
                let start_line = line;
                let mut text = String::new();
                i += 1;
                loop {
                    let Some(&ch) = chars.get(i) else {
                        anyhow::bail!("unterminated string starting on line {start_line}");
                    };
                    i += 1;
                    if ch == c {
                        break;
                    }
                    if ch == '\n' {
                        line += 1;
                    }
                    if c == '"' && ch == '\\' {
                        let escaped = chars.get(i).copied().unwrap_or('\\');
                        i += 1;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    } else {
                        text.push(ch);
                    }
                }
                tokens.push((Token::Quoted(text), start_line));
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.get(i) {
                    if ch.is_whitespace() || matches!(ch, '{' | '}' | ';') {
                        break;
                    }
                    word.push(ch);
                    i += 1;
                }
                tokens.push((Token::Word(word), line));
            }
        }
    }
    Ok(tokens)
}

/// A parsed statement before it is placed in the arena.
#[derive(Debug, Clone)]
struct RawStatement {
    keyword: String,
    argument: Option<String>,
    line: u32,
    children: Vec<RawStatement>,
}

impl RawStatement {
    fn child(&self, keyword: &str) -> Option<&RawStatement> {
        self.children.iter().find(|child| child.keyword == keyword)
    }

    fn argument(&self) -> &str {
        self.argument.as_deref().unwrap_or_default()
    }
}

struct Parser {
    tokens: Vec<(Token, u32)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token, u32)> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn statements(&mut self) -> anyhow::Result<Vec<RawStatement>> {
        let mut statements = Vec::new();
        while let Some(token) = self.peek() {
            if *token == Token::Close {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> anyhow::Result<RawStatement> {
        let Some((Token::Word(keyword), line)) = self.next() else {
            anyhow::bail!("expected a keyword at token {}", self.position);
        };
        let argument = self.argument()?;
        let children = match self.next() {
            Some((Token::Semicolon, _)) => Vec::new(),
            Some((Token::Open, _)) => {
                let children = self.statements()?;
                match self.next() {
                    Some((Token::Close, _)) => children,
                    _ => anyhow::bail!("missing '}}' for '{keyword}' on line {line}"),
                }
            }
            other => anyhow::bail!("unexpected {other:?} after '{keyword}' on line {line}"),
        };
        Ok(RawStatement {
            keyword,
            argument,
            line,
            children,
        })
    }

    fn argument(&mut self) -> anyhow::Result<Option<String>> {
        match self.peek() {
            Some(Token::Word(_)) => match self.next() {
                Some((Token::Word(word), _)) => Ok(Some(word)),
                _ => unreachable!(),
            },
            Some(Token::Quoted(_)) => {
                let mut text = String::new();
                loop {
                    match self.next() {
                        Some((Token::Quoted(part), _)) => text.push_str(&part),
                        other => anyhow::bail!("expected a string, found {other:?}"),
                    }
                    if self.peek() == Some(&Token::Plus) {
                        self.position += 1;
                    } else {
                        break;
                    }
                }
                Ok(Some(text))
            }
            _ => Ok(None),
        }
    }
}

/// Maps every prefix usable inside `module` to the name of the module it
/// stands for.
fn prefix_table(module: &RawStatement) -> FxHashMap<String, String> {
    let mut table = FxHashMap::default();
    if let Some(prefix) = module.child("prefix") {
        table.insert(prefix.argument().to_string(), module.argument().to_string());
    }
    if let Some(belongs_to) = module.child("belongs-to")
        && let Some(prefix) = belongs_to.child("prefix")
    {
        table.insert(prefix.argument().to_string(), belongs_to.argument().to_string());
    }
    for import in module.children.iter().filter(|child| child.keyword == "import") {
        if let Some(prefix) = import.child("prefix") {
            table.insert(prefix.argument().to_string(), import.argument().to_string());
        }
    }
    table
}

fn statement_kind(
    keyword: &str,
    prefixes: &FxHashMap<String, String>,
) -> anyhow::Result<StatementKind> {
    match keyword.split_once(':') {
        Some((prefix, name)) => Ok(StatementKind::Extension {
            module: prefixes
                .get(prefix)
                .cloned()
                .unwrap_or_else(|| prefix.to_string()),
            name: name.to_string(),
        }),
        None => Ok(Keyword::from_str(keyword)?.into()),
    }
}

fn add_children(
    schema: &mut Schema,
    parent: StatementId,
    raw: &[RawStatement],
    prefixes: &FxHashMap<String, String>,
) -> anyhow::Result<()> {
    for statement in raw {
        let kind = statement_kind(&statement.keyword, prefixes)?;
        let id = schema.add_statement(parent, kind, statement.argument.as_deref(), statement.line)?;
        add_children(schema, id, &statement.children, prefixes)?;
    }
    Ok(())
}

/// Parses each source into a module tree, registers it with the given
/// conformance and links the registry.
pub(crate) fn try_load_schema(sources: &[(&str, Conformance)]) -> anyhow::Result<Schema> {
    let mut schema = Schema::new();
    for (source, conformance) in sources {
        let mut parser = Parser {
            tokens: tokenize(source)?,
            position: 0,
        };
        for raw in parser.statements()? {
            let keyword = Keyword::from_str(&raw.keyword)?;
            let (module, root) = schema.begin_module(keyword, raw.argument(), raw.line)?;
            add_children(&mut schema, root, &raw.children, &prefix_table(&raw))?;
            schema.finish_module(module, *conformance)?;
        }
    }
    schema.link_modules();
    Ok(schema)
}

pub(crate) fn load_schema(sources: &[&str]) -> Schema {
    let sources: Vec<(&str, Conformance)> = sources
        .iter()
        .map(|source| (*source, Conformance::Implemented))
        .collect();
    try_load_schema(&sources).unwrap()
}

pub(crate) fn resolve_with(sources: &[&str], config: &ResolverConfig) -> ResolvedSchema {
    init_logger();
    SchemaResolverBuilder::build_resolved_schema(load_schema(sources), config)
        .unwrap()
        .resolved_schema()
}

pub(crate) fn resolve(sources: &[&str]) -> ResolvedSchema {
    resolve_with(sources, &ResolverConfig::default())
}

pub(crate) fn module_root(schema: &Schema, name: &str) -> StatementId {
    let module = schema
        .registry
        .by_name(name)
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("module '{name}' is not loaded"));
    schema.registry.root(module).unwrap()
}

/// Follows identifiers from a module root; `input` and `output` match by
/// keyword.
pub(crate) fn node(schema: &Schema, module: &str, path: &[&str]) -> Option<StatementId> {
    let mut current = module_root(schema, module);
    for segment in path {
        current = schema
            .arena
            .children(current)
            .iter()
            .copied()
            .find(|child| schema_node_name(schema, *child) == Some(*segment))?;
    }
    Some(current)
}

pub(crate) fn expect_node(schema: &Schema, module: &str, path: &[&str]) -> StatementId {
    node(schema, module, path)
        .unwrap_or_else(|| panic!("no schema node at {module}:/{}", path.join("/")))
}

pub(crate) fn child_arguments(schema: &Schema, parent: StatementId, keyword: Keyword) -> Vec<String> {
    schema
        .arena
        .children_of_kind(parent, keyword)
        .into_iter()
        .map(|child| schema.identifier(child).to_string())
        .collect()
}

pub(crate) fn child_argument(schema: &Schema, parent: StatementId, keyword: Keyword) -> Option<String> {
    child_arguments(schema, parent, keyword).into_iter().next()
}

/// Names of the members of a flattened `union`.
pub(crate) fn union_members(schema: &Schema, type_statement: StatementId) -> Vec<String> {
    child_arguments(schema, type_statement, Keyword::Type)
}

pub(crate) fn codes(findings: &Findings) -> Vec<&'static str> {
    findings.iter().map(|finding| finding.kind.code()).collect()
}

pub(crate) fn messages(findings: &Findings, kind: FindingKind) -> Vec<String> {
    findings
        .of_kind(kind)
        .into_iter()
        .map(|finding| finding.message.clone())
        .collect()
}
