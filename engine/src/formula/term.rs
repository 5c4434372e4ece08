use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operator between terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    /// Multiplicative operators bind a chunk together during aggregation.
    pub fn is_multiplicative(&self) -> bool {
        matches!(self, Operator::Mul | Operator::Div)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepMode {
    Highest,
    Lowest,
}

/// Keep-highest/lowest modifier (`kh`, `kl2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keep {
    pub mode: KeepMode,
    pub count: i32,
}

/// A die count or face count: a literal, or a parenthesized sub-expression
/// not yet folded into a number (see normalization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Fixed(i32),
    Pending(Box<GroupTerm>),
}

impl Quantity {
    pub fn fixed(&self) -> Option<i32> {
        match self {
            Quantity::Fixed(n) => Some(*n),
            Quantity::Pending(_) => None,
        }
    }
}

/// One rolled die face, with keep/reroll bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    pub value: i32,
    pub kept: bool,
    pub rerolled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DieTerm {
    pub count: Quantity,
    pub faces: Quantity,
    /// True when the source wrote `dN` with no coefficient; cleared by
    /// normalization once rewritten as the canonical `1dN`.
    #[serde(default)]
    pub implicit_count: bool,
    #[serde(default)]
    pub keep: Option<Keep>,
    /// Reroll-once: any die landing at or below this value is rerolled a
    /// single time and the new face is used.
    #[serde(default)]
    pub reroll_max: Option<i32>,
    #[serde(default)]
    pub flavor: Option<String>,
    #[serde(default)]
    pub results: Vec<DieResult>,
}

impl DieTerm {
    pub fn new(count: i32, faces: i32) -> Self {
        Self {
            count: Quantity::Fixed(count),
            faces: Quantity::Fixed(faces),
            implicit_count: false,
            keep: None,
            reroll_max: None,
            flavor: None,
            results: Vec::new(),
        }
    }

    /// Sum of kept faces; zero before evaluation.
    pub fn value(&self) -> i32 {
        self.results.iter().filter(|r| r.kept).map(|r| r.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberTerm {
    pub value: i32,
    #[serde(default)]
    pub flavor: Option<String>,
}

impl NumberTerm {
    pub fn new(value: i32) -> Self {
        Self {
            value,
            flavor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTerm {
    pub terms: Vec<Term>,
}

/// One node of a parsed dice expression. A formula is an ordered list of
/// terms; groups nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Die(DieTerm),
    Number(NumberTerm),
    Operator(Operator),
    Group(GroupTerm),
}

impl Term {
    pub fn number(value: i32) -> Term {
        Term::Number(NumberTerm::new(value))
    }

    pub fn flavor(&self) -> Option<&str> {
        match self {
            Term::Die(d) => d.flavor.as_deref(),
            Term::Number(n) => n.flavor.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Die(d) => {
                match &d.count {
                    Quantity::Fixed(n) if d.implicit_count && *n == 1 => {}
                    Quantity::Fixed(n) => write!(f, "{}", n)?,
                    Quantity::Pending(g) => write!(f, "({})", render_terms(&g.terms))?,
                }
                f.write_str("d")?;
                match &d.faces {
                    Quantity::Fixed(n) => write!(f, "{}", n)?,
                    Quantity::Pending(g) => write!(f, "({})", render_terms(&g.terms))?,
                }
                if let Some(keep) = d.keep {
                    let tag = match keep.mode {
                        KeepMode::Highest => "kh",
                        KeepMode::Lowest => "kl",
                    };
                    if keep.count == 1 {
                        write!(f, "{}", tag)?;
                    } else {
                        write!(f, "{}{}", tag, keep.count)?;
                    }
                }
                if let Some(r) = d.reroll_max {
                    write!(f, "r{}", r)?;
                }
                if let Some(flavor) = &d.flavor {
                    write!(f, "[{}]", flavor)?;
                }
                Ok(())
            }
            Term::Number(n) => {
                write!(f, "{}", n.value)?;
                if let Some(flavor) = &n.flavor {
                    write!(f, "[{}]", flavor)?;
                }
                Ok(())
            }
            Term::Operator(op) => f.write_str(op.symbol()),
            Term::Group(g) => write!(f, "({})", render_terms(&g.terms)),
        }
    }
}

/// Re-serialize a term list to its canonical formula string.
pub fn render_terms(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
