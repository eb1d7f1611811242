//! Arithmetic evaluator and polynomial simplifier.
//!
//! Grammar (precedence low to high):
//!   expr    := term (('+' | '-') term)*
//!   term    := unary (('*' | '/' | '×' | '÷') unary | <implicit> unary)*
//!   unary   := ('-' | '+') unary | power
//!   power   := primary ('^' unary)?
//!   primary := number | letter | '(' expr ')'
//!
//! Letters are single-character variables, so `2xy` is `2*x*y`.

use crate::error::{EduCheckError, Result};
use std::collections::BTreeMap;

const MAX_EXPONENT: u32 = 16;
/// Longest token stream accepted; also bounds the depth of the parsed tree.
const MAX_TOKENS: usize = 512;
/// Deepest nesting of parentheses, signs and exponents.
const MAX_DEPTH: usize = 64;
/// Highest total degree of a simplified monomial.
const MAX_DEGREE: u32 = 64;
/// Most terms a simplified polynomial may hold.
const MAX_TERMS: usize = 10_000;
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Var(char),
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(f64),
    Var(char),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let lit: String = chars[start..i].iter().collect();
                let n = lit
                    .parse::<f64>()
                    .map_err(|_| EduCheckError::evaluation(format!("invalid number '{}'", lit)))?;
                tokens.push(Token::Num(n));
            }
            'a'..='z' | 'A'..='Z' => {
                tokens.push(Token::Var(c));
                i += 1;
            }
            '+' | '-' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '*' | '×' => {
                tokens.push(Token::Op('*'));
                i += 1;
            }
            '/' | '÷' => {
                tokens.push(Token::Op('/'));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => {
                return Err(EduCheckError::evaluation(format!(
                    "unsupported character '{}'",
                    other
                )));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(EduCheckError::evaluation("expression nested too deeply"));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<Expr> {
        self.nested(Self::sum)
    }

    fn sum(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Op(op @ ('*' | '/'))) => {
                    let op = *op;
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Num(_)) | Some(Token::Var(_)) | Some(Token::LParen) => {
                    let rhs = self.power()?;
                    lhs = Expr::Bin('*', Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        self.nested(Self::signed)
    }

    fn signed(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(Expr::Bin('^', Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Var(v)) => Ok(Expr::Var(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(EduCheckError::evaluation("unbalanced parentheses")),
                }
            }
            Some(t) => Err(EduCheckError::evaluation(format!(
                "unexpected token {:?}",
                t
            ))),
            None => Err(EduCheckError::evaluation("unexpected end of expression")),
        }
    }
}

fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EduCheckError::evaluation("empty expression"));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EduCheckError::evaluation(format!(
            "expression too long ({} tokens)",
            tokens.len()
        )));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(EduCheckError::evaluation(format!(
            "trailing input after position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

fn eval(expr: &Expr) -> Result<f64> {
    let v = match expr {
        Expr::Num(n) => *n,
        Expr::Var(v) => {
            return Err(EduCheckError::evaluation(format!(
                "cannot evaluate variable '{}'",
                v
            )));
        }
        Expr::Neg(inner) => -eval(inner)?,
        Expr::Bin(op, l, r) => {
            let (a, b) = (eval(l)?, eval(r)?);
            match op {
                '+' => a + b,
                '-' => a - b,
                '*' => a * b,
                '/' => {
                    if b.abs() < EPSILON {
                        return Err(EduCheckError::evaluation("division by zero"));
                    }
                    a / b
                }
                '^' => a.powf(b),
                _ => return Err(EduCheckError::evaluation(format!("unknown operator '{}'", op))),
            }
        }
    };
    if !v.is_finite() {
        return Err(EduCheckError::evaluation("result is not a finite number"));
    }
    Ok(v)
}

/// Evaluate a purely numeric expression.
pub fn evaluate(input: &str) -> Result<f64> {
    eval(&parse(input)?)
}

/// Variable -> exponent, kept sorted so equal monomials compare equal.
type Monomial = BTreeMap<char, u32>;

#[derive(Debug, Clone, Default, PartialEq)]
struct Polynomial {
    terms: BTreeMap<Monomial, f64>,
}

impl Polynomial {
    fn constant(c: f64) -> Self {
        let mut p = Self::default();
        p.add_term(Monomial::new(), c);
        p
    }

    fn var(v: char) -> Self {
        let mut p = Self::default();
        p.add_term(Monomial::from([(v, 1)]), 1.0);
        p
    }

    fn add_term(&mut self, m: Monomial, c: f64) {
        let entry = self.terms.entry(m.clone()).or_insert(0.0);
        *entry += c;
        if entry.abs() < EPSILON {
            self.terms.remove(&m);
        }
    }

    fn as_constant(&self) -> Option<f64> {
        match self.terms.len() {
            0 => Some(0.0),
            1 => self.terms.get(&Monomial::new()).copied(),
            _ => None,
        }
    }

    fn add(mut self, other: &Polynomial, sign: f64) -> Self {
        for (m, c) in &other.terms {
            self.add_term(m.clone(), sign * c);
        }
        self
    }

    fn mul(&self, other: &Polynomial) -> Result<Self> {
        let mut out = Polynomial::default();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let mut m = ma.clone();
                for (v, e) in mb {
                    let slot = m.entry(*v).or_insert(0);
                    *slot = slot
                        .checked_add(*e)
                        .ok_or_else(|| EduCheckError::evaluation("exponent overflow"))?;
                }
                if degree(&m) > MAX_DEGREE {
                    return Err(EduCheckError::evaluation(format!(
                        "degree exceeds {}",
                        MAX_DEGREE
                    )));
                }
                out.add_term(m, ca * cb);
                if out.terms.len() > MAX_TERMS {
                    return Err(EduCheckError::evaluation(format!(
                        "more than {} terms",
                        MAX_TERMS
                    )));
                }
            }
        }
        Ok(out)
    }

    fn scale(mut self, k: f64) -> Self {
        for c in self.terms.values_mut() {
            *c *= k;
        }
        self.terms.retain(|_, c| c.abs() >= EPSILON);
        self
    }

    fn pow(&self, exp: u32) -> Result<Self> {
        let mut out = Polynomial::constant(1.0);
        for _ in 0..exp {
            out = out.mul(self)?;
        }
        Ok(out)
    }

    fn render(&self) -> String {
        if self.terms.is_empty() {
            return "0".to_string();
        }
        let mut ordered: Vec<(&Monomial, f64)> = self.terms.iter().map(|(m, c)| (m, *c)).collect();
        ordered.sort_by(|(ma, _), (mb, _)| {
            degree(mb).cmp(&degree(ma)).then_with(|| ma.cmp(mb))
        });

        let mut out = String::new();
        for (i, (m, c)) in ordered.into_iter().enumerate() {
            let negative = c < 0.0;
            let magnitude = c.abs();
            if i == 0 {
                if negative {
                    out.push('-');
                }
            } else {
                out.push_str(if negative { " - " } else { " + " });
            }
            let vars: String = m
                .iter()
                .map(|(v, e)| {
                    if *e == 1 {
                        v.to_string()
                    } else {
                        format!("{}^{}", v, e)
                    }
                })
                .collect();
            if vars.is_empty() || (magnitude - 1.0).abs() >= EPSILON {
                out.push_str(&format_number(magnitude));
            }
            out.push_str(&vars);
        }
        out
    }
}

/// Sum of exponents, saturating so oversized monomials still compare as too large.
fn degree(m: &Monomial) -> u32 {
    m.values().fold(0u32, |acc, e| acc.saturating_add(*e))
}

fn to_polynomial(expr: &Expr) -> Result<Polynomial> {
    match expr {
        Expr::Num(n) => Ok(Polynomial::constant(*n)),
        Expr::Var(v) => Ok(Polynomial::var(*v)),
        Expr::Neg(inner) => Ok(to_polynomial(inner)?.scale(-1.0)),
        Expr::Bin(op, l, r) => {
            let a = to_polynomial(l)?;
            let b = to_polynomial(r)?;
            match op {
                '+' => Ok(a.add(&b, 1.0)),
                '-' => Ok(a.add(&b, -1.0)),
                '*' => a.mul(&b),
                '/' => match b.as_constant() {
                    Some(d) if d.abs() >= EPSILON => Ok(a.scale(1.0 / d)),
                    Some(_) => Err(EduCheckError::evaluation("division by zero")),
                    None => Err(EduCheckError::evaluation(
                        "division by a variable expression is not supported",
                    )),
                },
                '^' => {
                    let e = b.as_constant().ok_or_else(|| {
                        EduCheckError::evaluation("exponent must be a constant")
                    })?;
                    if e < 0.0 || e.fract().abs() >= EPSILON || e > MAX_EXPONENT as f64 {
                        return Err(EduCheckError::evaluation(format!(
                            "unsupported exponent {}",
                            format_number(e)
                        )));
                    }
                    a.pow(e.round() as u32)
                }
                _ => Err(EduCheckError::evaluation(format!("unknown operator '{}'", op))),
            }
        }
    }
}

/// Simplify to a canonical polynomial string: terms by descending degree, then
/// by variable name, e.g. `x^2 + 2xy - 3`.
pub fn simplify(input: &str) -> Result<String> {
    Ok(to_polynomial(&parse(input)?)?.render())
}

/// Integers print without a fractional part, others with at most six decimals.
pub fn format_number(v: f64) -> String {
    let rounded = v.round();
    if (v - rounded).abs() < EPSILON && rounded.abs() < 1e15 {
        let i = rounded as i64;
        return i.to_string();
    }
    let s = format!("{:.6}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
