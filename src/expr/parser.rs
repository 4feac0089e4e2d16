//! Expression parser.
//!
//! A small nom-based recursive-descent parser for the expression language
//! allowed inside `${...}` placeholders, attribute bindings and `on-`
//! actions. Precedence, tightest first:
//!
//! ```text
//! primary  literals, identifiers, (expr), [list], {map}
//! postfix  a.b   a[i]   f(args)
//! unary    !x    -x
//! infix    * / %   then   + -   then   < <= > >=   then   == !=
//! logic    &&   then   ||
//! ternary  cond ? then : else
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, opt, recognize, verify},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::ast::{BinaryOp, Expr, UnaryOp};

/// Parse a complete expression string.
pub(crate) fn parse_expression(input: &str) -> Result<Expr, String> {
    match all_consuming(delimited(multispace0, expression, multispace0))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(err) => Err(err.to_string()),
    }
}

/// Full expression - the ternary level.
fn expression(input: &str) -> IResult<&str, Expr> {
    let (rest, cond) = or_level(input)?;
    let (rest, tail) = opt(pair(
        preceded(token('?'), expression),
        preceded(token(':'), expression),
    ))(rest)?;
    Ok(match tail {
        Some((then_branch, else_branch)) => (
            rest,
            Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ),
        ),
        None => (rest, cond),
    })
}

// =============================================================================
// Infix levels
// =============================================================================

/// Left-fold one precedence level. `ops` must list longer symbols first
/// so `<=` wins over `<`.
fn binary_level<'a>(
    operand: fn(&'a str) -> IResult<&'a str, Expr>,
    ops: &'static [(&'static str, BinaryOp)],
) -> impl FnMut(&'a str) -> IResult<&'a str, Expr> {
    move |input: &'a str| {
        let (mut rest, mut lhs) = operand(input)?;
        'fold: loop {
            let (after_ws, _) = multispace0::<&str, nom::error::Error<&str>>(rest)?;
            for (symbol, op) in ops {
                if let Some(after_op) = after_ws.strip_prefix(symbol) {
                    let (next, rhs) = operand(after_op)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    rest = next;
                    continue 'fold;
                }
            }
            return Ok((rest, lhs));
        }
    }
}

fn or_level(input: &str) -> IResult<&str, Expr> {
    binary_level(and_level, &[("||", BinaryOp::Or)])(input)
}

fn and_level(input: &str) -> IResult<&str, Expr> {
    binary_level(equality, &[("&&", BinaryOp::And)])(input)
}

fn equality(input: &str) -> IResult<&str, Expr> {
    binary_level(comparison, &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)])(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    binary_level(
        additive,
        &[
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
        ],
    )(input)
}

fn additive(input: &str) -> IResult<&str, Expr> {
    binary_level(multiplicative, &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)])(input)
}

fn multiplicative(input: &str) -> IResult<&str, Expr> {
    binary_level(
        unary,
        &[
            ("*", BinaryOp::Mul),
            ("/", BinaryOp::Div),
            ("%", BinaryOp::Rem),
        ],
    )(input)
}

// =============================================================================
// Unary and postfix
// =============================================================================

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(token('!'), unary), |e| {
            Expr::Unary(UnaryOp::Not, Box::new(e))
        }),
        map(preceded(token('-'), unary), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        postfix,
    ))(input)
}

/// Member access, indexing and calls, folded left over a primary.
fn postfix(input: &str) -> IResult<&str, Expr> {
    let (mut rest, mut expr) = delimited(multispace0, primary, multispace0)(input)?;
    loop {
        if let Ok((next, name)) =
            preceded(char('.'), preceded(multispace0, identifier))(rest)
        {
            expr = Expr::Member(Box::new(expr), name.to_string());
            rest = next;
            continue;
        }
        if let Ok((next, index)) = delimited(char('['), expression, token(']'))(rest) {
            expr = Expr::Index(Box::new(expr), Box::new(index));
            rest = next;
            continue;
        }
        if let Ok((next, args)) = delimited(
            char('('),
            separated_list0(token(','), expression),
            token(')'),
        )(rest)
        {
            expr = Expr::Call(Box::new(expr), args);
            rest = next;
            continue;
        }
        return Ok((rest, expr));
    }
}

// =============================================================================
// Primaries
// =============================================================================

fn primary(input: &str) -> IResult<&str, Expr> {
    alt((
        number,
        string_literal,
        list_literal,
        map_literal,
        delimited(token('('), expression, token(')')),
        keyword_or_ident,
    ))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    map(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| Expr::Number(s.parse().unwrap_or(f64::NAN)),
    )(input)
}

fn keyword_or_ident(input: &str) -> IResult<&str, Expr> {
    map(identifier, |name| match name {
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        "null" => Expr::Null,
        other => Expr::Ident(other.to_string()),
    })(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
        |s: &str| !s.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, Expr> {
    alt((quoted('"'), quoted('\'')))(input)
}

/// Quoted string with `\` escapes. `\n` and `\t` translate, any other
/// escaped character stands for itself.
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, Expr> {
    move |input: &str| {
        let (body, _) = char(quote)(input)?;
        let mut out = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, other)) => out.push(other),
                    None => break,
                }
            } else if c == quote {
                return Ok((&body[i + c.len_utf8()..], Expr::Str(out)));
            } else {
                out.push(c);
            }
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }
}

fn list_literal(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(
            char('['),
            separated_list0(token(','), expression),
            token(']'),
        ),
        Expr::List,
    )(input)
}

fn map_literal(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(
            char('{'),
            separated_list0(token(','), map_entry),
            token('}'),
        ),
        Expr::Map,
    )(input)
}

fn map_entry(input: &str) -> IResult<&str, (String, Expr)> {
    pair(
        delimited(multispace0, map_key, multispace0),
        preceded(token(':'), expression),
    )(input)
}

fn map_key(input: &str) -> IResult<&str, String> {
    alt((
        map(identifier, str::to_string),
        map(string_literal, |expr| match expr {
            Expr::Str(s) => s,
            _ => String::new(),
        }),
    ))(input)
}

/// A single punctuation character with surrounding whitespace.
fn token<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    delimited(multispace0, char(c), multispace0)
}
