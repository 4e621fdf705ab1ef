use std::fmt;

use crate::evaluator::value::{format_number, parse_number_prefix, Value};

/// Operator enumeration - the closed set of operators the grammar knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Or,        // |
    And,       // &
    Not,       // !
    DoubleNot, // ! !
    Add,       // +
    Sub,       // -
    Cat,       // .
    Mul,       // *
    Div,       // /
    Mod,       // %
    Pow,       // ^
    Eq,        // ==
    Ne,        // !=
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    StrEq,     // eq
    StrNe,     // ne
    StrLt,     // lt
    StrLe,     // le
    StrGt,     // gt
    StrGe,     // ge
    Set,       // =
    Comma,     // ,
}

/// Symbol patterns, multi-character patterns before their prefixes
pub const SYMBOL_PATTERNS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    ("=<", Operator::Le),
    (">=", Operator::Ge),
    ("=>", Operator::Ge),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("|", Operator::Or),
    ("&", Operator::And),
    ("!", Operator::Not),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    (".", Operator::Cat),
    ("*", Operator::Mul),
    ("/", Operator::Div),
    (",", Operator::Comma),
    ("%", Operator::Mod),
    ("^", Operator::Pow),
    ("=", Operator::Set),
];

/// Alphabetic operators, matched against whole words
pub const WORD_PATTERNS: &[(&str, Operator)] = &[
    ("eq", Operator::StrEq),
    ("ne", Operator::StrNe),
    ("lt", Operator::StrLt),
    ("le", Operator::StrLe),
    ("gt", Operator::StrGt),
    ("ge", Operator::StrGe),
];

impl Operator {
    /// Canonical source spelling
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Or => "|",
            Operator::And => "&",
            Operator::Not => "!",
            Operator::DoubleNot => "!!",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Cat => ".",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::StrEq => "eq",
            Operator::StrNe => "ne",
            Operator::StrLt => "lt",
            Operator::StrLe => "le",
            Operator::StrGt => "gt",
            Operator::StrGe => "ge",
            Operator::Set => "=",
            Operator::Comma => ",",
        }
    }

    /// Upper-case name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Or => "OR",
            Operator::And => "AND",
            Operator::Not => "NOT",
            Operator::DoubleNot => "NNOT",
            Operator::Add => "ADD",
            Operator::Sub => "SUB",
            Operator::Cat => "CAT",
            Operator::Mul => "MUL",
            Operator::Div => "DIV",
            Operator::Mod => "MOD",
            Operator::Pow => "POW",
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Lt => "LT",
            Operator::Le => "LE",
            Operator::Gt => "GT",
            Operator::Ge => "GE",
            Operator::StrEq => "SEQ",
            Operator::StrNe => "SNE",
            Operator::StrLt => "SLT",
            Operator::StrLe => "SLE",
            Operator::StrGt => "SGT",
            Operator::StrGe => "SGE",
            Operator::Set => "SET",
            Operator::Comma => "COM",
        }
    }

    /// Look up an alphabetic operator, ignoring case
    pub fn from_word(word: &str) -> Option<Operator> {
        WORD_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.eq_ignore_ascii_case(word))
            .map(|(_, op)| *op)
    }

    /// Longest symbol pattern at the start of `text`
    pub fn match_symbol(text: &str) -> Option<(Operator, usize)> {
        SYMBOL_PATTERNS
            .iter()
            .find(|(pattern, _)| text.starts_with(pattern))
            .map(|(pattern, op)| (*op, pattern.len()))
    }

    /// SUB, NOT and double-NOT may stand in front of an operand
    pub fn is_sign(&self) -> bool {
        matches!(self, Operator::Sub | Operator::Not | Operator::DoubleNot)
    }

    pub fn is_logical_not(&self) -> bool {
        matches!(self, Operator::Not | Operator::DoubleNot)
    }

    /// String comparator a numeric comparator turns into when a string is involved
    pub fn string_counterpart(&self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::StrEq),
            Operator::Ne => Some(Operator::StrNe),
            Operator::Lt => Some(Operator::StrLt),
            Operator::Le => Some(Operator::StrLe),
            Operator::Gt => Some(Operator::StrGt),
            Operator::Ge => Some(Operator::StrGe),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.symbol())
    }
}

/// One node of the expression tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Token {
    /// Null, or a failed sub-result
    #[default]
    Undefined,
    Number(f64),
    Text(String),
    Operator(Operator),
    /// Name as written; lookups fold case
    Variable(String),
    /// Call with its unsplit argument tokens, separators included
    Function { name: String, args: Vec<Token> },
    /// Parenthesized sub-expression
    Group(Vec<Token>),
    Conditional {
        when_true: Vec<Token>,
        when_false: Vec<Token>,
    },
}

impl Token {
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Token::Variable(name.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Token::Undefined)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Token::Number(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text(_))
    }

    /// Number or string literal
    pub fn is_scalar(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Text(_))
    }

    pub fn is_operator(&self, op: Operator) -> bool {
        matches!(self, Token::Operator(o) if *o == op)
    }

    pub fn as_operator(&self) -> Option<Operator> {
        match self {
            Token::Operator(op) => Some(*op),
            _ => None,
        }
    }

    /// Short kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Undefined => "undefined",
            Token::Number(_) => "number",
            Token::Text(_) => "string",
            Token::Operator(_) => "operator",
            Token::Variable(_) => "variable",
            Token::Function { .. } => "function",
            Token::Group(_) => "group",
            Token::Conditional { .. } => "conditional",
        }
    }

    /// Numeric reading of a token; strings parse their leading number
    pub fn to_number(&self) -> f64 {
        match self {
            Token::Number(n) => *n,
            Token::Text(s) => parse_number_prefix(s).unwrap_or_else(|| {
                if !s.is_empty() {
                    tracing::debug!(stage = "convert", "'{}' is not a number, using 0", s);
                }
                0.0
            }),
            Token::Undefined => 0.0,
            other => {
                tracing::warn!(
                    stage = "convert",
                    "cannot use {} as a number, using 0",
                    other.kind_name()
                );
                0.0
            }
        }
    }

    /// String reading of a token; undefined reads as `null`
    pub fn to_text(&self) -> String {
        match self {
            Token::Text(s) => s.clone(),
            Token::Number(n) => format_number(*n),
            Token::Undefined => "null".to_string(),
            other => {
                tracing::warn!(
                    stage = "convert",
                    "cannot use {} as a string, using empty string",
                    other.kind_name()
                );
                String::new()
            }
        }
    }

    /// Scalar value of a fully reduced token; anything else is null
    pub fn to_value(&self) -> Value {
        match self {
            Token::Number(n) => Value::Number(*n),
            Token::Text(s) => Value::String(s.clone()),
            _ => Value::Null,
        }
    }
}

impl From<Value> for Token {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Token::Undefined,
            Value::Number(n) => Token::Number(n),
            Value::String(s) => Token::Text(s),
        }
    }
}

impl From<f64> for Token {
    fn from(n: f64) -> Self {
        Token::Number(n)
    }
}

impl From<Operator> for Token {
    fn from(op: Operator) -> Self {
        Token::Operator(op)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Undefined => write!(f, "undefined"),
            Token::Number(n) => write!(f, "number({})", format_number(*n)),
            Token::Text(s) => write!(f, "string('{}')", s),
            Token::Operator(op) => write!(f, "operator {}", op),
            Token::Variable(name) => write!(f, "variable({})", name),
            Token::Function { name, args } => {
                write!(f, "function {}({} token(s))", name, args.len())
            }
            Token::Group(inner) => write!(f, "group({} token(s))", inner.len()),
            Token::Conditional {
                when_true,
                when_false,
            } => write!(
                f,
                "conditional({} : {} token(s))",
                when_true.len(),
                when_false.len()
            ),
        }
    }
}
