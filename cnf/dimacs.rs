//! The DIMACS CNF text format: a `p cnf <variables> <clauses>` header,
//! then one clause per line as signed integers terminated by `0`.

use std::fmt;

use nom::{
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult,
};
use thiserror::Error;

use crate::{Cnf, CnfError, Var};

/// Things that may go wrong reading DIMACS text.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DimacsError {
    #[error("line {0}: malformed clause `{1}`")]
    Malformed(usize, String),
    #[error("line {0}: clause is not terminated by 0")]
    Unterminated(usize),
    #[error("line {0}: 0 inside a clause")]
    EmbeddedZero(usize),
    #[error(transparent)]
    Cnf(#[from] CnfError),
}

fn integer(input: &str) -> IResult<&str, Var> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<Var>)(input)
}

fn integers(input: &str) -> IResult<&str, Vec<Var>> {
    all_consuming(delimited(
        space0,
        separated_list0(space1, integer),
        space0,
    ))(input)
}

pub(crate) fn write(cnf: &Cnf, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_fmt(format_args!(
        "p cnf {} {}\n",
        cnf.num_variables(),
        cnf.len()
    ))?;
    for clause in cnf.clauses() {
        for var in clause {
            f.write_fmt(format_args!("{var} "))?;
        }
        f.write_str("0\n")?;
    }
    Ok(())
}

/// Header lines (`p ...`), comment lines (`c ...`), and blank lines
/// are skipped; every other line is a clause.
pub(crate) fn read(text: &str) -> Result<Cnf, DimacsError> {
    let mut cnf = Cnf::new();
    for (i, line) in text.lines().enumerate() {
        let n = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('p') || line.starts_with('c') {
            continue;
        }
        let (_, mut vars) =
            integers(line).map_err(|_| DimacsError::Malformed(n, line.to_owned()))?;
        match vars.pop() {
            Some(0) => (),
            _ => return Err(DimacsError::Unterminated(n)),
        }
        if vars.contains(&0) {
            return Err(DimacsError::EmbeddedZero(n));
        }
        cnf.add_clause(vars)?;
    }
    Ok(cnf)
}
