use super::term::{DieTerm, GroupTerm, Keep, KeepMode, NumberTerm, Operator, Quantity, Term};
use super::RollData;
use crate::error::FormulaError;

/// Parse a dice expression into a flat term list (groups nest).
///
/// Grammar: integers, `NdM` dice (count omissible, count/faces may be a
/// parenthesized expression), `kh`/`kl` keep modifiers, `rN` reroll-once,
/// `[flavor]` display tags, `@dotted.path` data references, and `+ - * /`
/// arithmetic with parentheses.
pub fn parse(formula: &str, data: &RollData) -> Result<Vec<Term>, FormulaError> {
    let chars: Vec<char> = formula.chars().collect();
    let mut parser = Parser {
        chars,
        pos: 0,
        data,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(FormulaError::Empty);
    }
    let terms = parser.expression(false)?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(FormulaError::UnexpectedChar(
            parser.chars[parser.pos],
            parser.pos,
        ));
    }
    Ok(terms)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    data: &'a RollData,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expression(&mut self, nested: bool) -> Result<Vec<Term>, FormulaError> {
        let mut terms = Vec::new();
        self.skip_ws();
        // Leading unary sign.
        if let Some(c @ ('+' | '-')) = self.peek() {
            terms.push(Term::Operator(if c == '+' {
                Operator::Add
            } else {
                Operator::Sub
            }));
            self.bump();
        }
        loop {
            self.skip_ws();
            self.operand(&mut terms)?;
            self.skip_ws();
            match self.peek() {
                Some('+') => terms.push(Term::Operator(Operator::Add)),
                Some('-') => terms.push(Term::Operator(Operator::Sub)),
                Some('*') => terms.push(Term::Operator(Operator::Mul)),
                Some('/') => terms.push(Term::Operator(Operator::Div)),
                Some(')') if nested => break,
                Some(c) => return Err(FormulaError::UnexpectedChar(c, self.pos)),
                None => break,
            }
            self.bump();
        }
        Ok(terms)
    }

    fn operand(&mut self, terms: &mut Vec<Term>) -> Result<(), FormulaError> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.expression(true)?;
                if self.bump() != Some(')') {
                    return Err(FormulaError::Expected(")", self.pos));
                }
                let group = GroupTerm { terms: inner };
                if self.die_marker_here() {
                    // `(expr)dN`: the group is the die's (pending) count.
                    self.bump(); // 'd'
                    let die = self.die_tail(Quantity::Pending(Box::new(group)), false)?;
                    terms.push(Term::Die(die));
                } else {
                    terms.push(Term::Group(group));
                }
                Ok(())
            }
            Some(c) if c.is_ascii_digit() => {
                let n = self.integer()?;
                if self.die_marker_here() {
                    self.bump(); // 'd'
                    let die = self.die_tail(Quantity::Fixed(n), false)?;
                    terms.push(Term::Die(die));
                } else {
                    let flavor = self.maybe_flavor()?;
                    terms.push(Term::Number(NumberTerm { value: n, flavor }));
                }
                Ok(())
            }
            Some('d') | Some('D') if self.die_marker_here() => {
                self.bump();
                let die = self.die_tail(Quantity::Fixed(1), true)?;
                terms.push(Term::Die(die));
                Ok(())
            }
            Some('@') => {
                self.bump();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.')
                {
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err(FormulaError::Expected("reference name", self.pos));
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                let value = *self
                    .data
                    .get(&name)
                    .ok_or(FormulaError::UnknownReference(name.clone()))?;
                let flavor = self.maybe_flavor()?;
                terms.push(Term::Number(NumberTerm { value, flavor }));
                Ok(())
            }
            Some(c) => Err(FormulaError::UnexpectedChar(c, self.pos)),
            None => Err(FormulaError::Expected("operand", self.pos)),
        }
    }

    /// `d` at the cursor introducing a die (followed by digits or a group).
    fn die_marker_here(&self) -> bool {
        matches!(self.peek(), Some('d' | 'D'))
            && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == '(')
    }

    /// Faces, modifiers, and flavor after the `d` has been consumed.
    fn die_tail(
        &mut self,
        count: Quantity,
        implicit_count: bool,
    ) -> Result<DieTerm, FormulaError> {
        let faces = match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.expression(true)?;
                if self.bump() != Some(')') {
                    return Err(FormulaError::Expected(")", self.pos));
                }
                Quantity::Pending(Box::new(GroupTerm { terms: inner }))
            }
            Some(c) if c.is_ascii_digit() => {
                let n = self.integer()?;
                if n < 1 {
                    return Err(FormulaError::InvalidDie(format!("d{}", n)));
                }
                Quantity::Fixed(n)
            }
            _ => return Err(FormulaError::Expected("die faces", self.pos)),
        };

        let mut keep = None;
        let mut reroll_max = None;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('k' | 'K'), Some('h' | 'H')) => {
                    self.pos += 2;
                    keep = Some(Keep {
                        mode: KeepMode::Highest,
                        count: self.optional_integer(1)?,
                    });
                }
                (Some('k' | 'K'), Some('l' | 'L')) => {
                    self.pos += 2;
                    keep = Some(Keep {
                        mode: KeepMode::Lowest,
                        count: self.optional_integer(1)?,
                    });
                }
                (Some('r' | 'R'), Some(c)) if c.is_ascii_digit() => {
                    self.bump();
                    reroll_max = Some(self.integer()?);
                }
                _ => break,
            }
        }

        let flavor = self.maybe_flavor()?;
        Ok(DieTerm {
            count,
            faces,
            implicit_count,
            keep,
            reroll_max,
            flavor,
            results: Vec::new(),
        })
    }

    fn integer(&mut self) -> Result<i32, FormulaError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(FormulaError::Expected("number", self.pos));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| FormulaError::Expected("number", start))
    }

    fn optional_integer(&mut self, default: i32) -> Result<i32, FormulaError> {
        if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.integer()
        } else {
            Ok(default)
        }
    }

    fn maybe_flavor(&mut self) -> Result<Option<String>, FormulaError> {
        if self.peek() != Some('[') {
            return Ok(None);
        }
        self.bump();
        let start = self.pos;
        while !matches!(self.peek(), Some(']') | None) {
            self.pos += 1;
        }
        if self.bump() != Some(']') {
            return Err(FormulaError::Expected("]", self.pos));
        }
        let text: String = self.chars[start..self.pos - 1].iter().collect();
        Ok(Some(text))
    }
}
