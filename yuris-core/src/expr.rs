//! Folding a postfix instruction list into an expression tree, and printing
//! the tree back as source text with minimal parenthesization.

use crate::error::{Error, Result};
use crate::ins::{Ins, InsArg, Opcode};

/// An owned expression tree. Leaves carry their rendered text (literals keep
/// the engine's own spelling, variables their resolved names).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Leaf(String),
    Index { name: String, args: Vec<Expr> },
    /// `ToStr`/`ToNum`/`Neg`, or a binary opcode in the tolerated
    /// single-operand prefix form (`&x`, `!=x`).
    Unary { op: Opcode, child: Box<Expr> },
    Binary { op: Opcode, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn leaf(text: impl Into<String>) -> Expr {
        Expr::Leaf(text.into())
    }

    pub fn unary(op: Opcode, child: Expr) -> Expr {
        Expr::Unary { op, child: Box::new(child) }
    }

    pub fn binary(op: Opcode, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }
}

// Precedence levels are the engine's, not C's; lower binds tighter.
const ADR_PREC: i32 = 1;
const NEG_PREC: i32 = 2;

fn bin_prec(op: Opcode) -> i32 {
    use Opcode::*;
    match op {
        Mul | Div | Mod => 3,
        Add | Sub => 4,
        Lt | Le | Gt | Ge => 6,
        Eq | Ne => 7,
        BitAnd => 8,
        BitXor => 9,
        BitOr => 0,
        LogAnd => 1,
        LogOr => 2,
        _ => -1,
    }
}

fn node_prec(e: &Expr) -> i32 {
    match e {
        Expr::Binary { op, .. } => bin_prec(*op),
        Expr::Unary { op: Opcode::Neg, .. } => NEG_PREC,
        Expr::Unary { op, .. } if op.is_binary() => bin_prec(*op),
        _ => -1,
    }
}

/// Fold a postfix instruction list into a tree.
///
/// `var_name` resolves the packed `(qualifier, var_idx)` operand of
/// `var`/`arr`/`idxbeg` to a sigil-prefixed source name. With
/// `to_new_tostr`, legacy `$@`-qualified variables lift as an explicit
/// `$( @name )` conversion instead.
pub fn lift<F>(list: &[Ins], mut var_name: F, to_new_tostr: bool) -> Result<Expr>
where
    F: FnMut(i64) -> Result<String>,
{
    let mut stk: Vec<Option<Expr>> = Vec::new();
    for (at, ins) in list.iter().enumerate() {
        match ins.op {
            Opcode::Nop => {}
            Opcode::I8 | Opcode::I16 | Opcode::I32 | Opcode::I64 => {
                let v = int_arg(ins, at)?;
                stk.push(Some(Expr::Leaf(v.to_string())));
            }
            Opcode::F64 => {
                let InsArg::Float(v) = ins.arg else {
                    return Err(bad_operand(ins, at));
                };
                stk.push(Some(Expr::Leaf(format!("{:?}", v))));
            }
            Opcode::Str => {
                let InsArg::Str(s) = &ins.arg else {
                    return Err(bad_operand(ins, at));
                };
                stk.push(Some(Expr::Leaf(s.clone())));
            }
            Opcode::Var => {
                let name = var_name(int_arg(ins, at)?)?;
                if to_new_tostr && name.starts_with("$@") {
                    stk.push(Some(Expr::unary(Opcode::ToStr, Expr::Leaf(name[1..].to_string()))));
                } else {
                    stk.push(Some(Expr::Leaf(name)));
                }
            }
            Opcode::Arr => {
                let name = var_name(int_arg(ins, at)?)?;
                stk.push(Some(Expr::Leaf(name + "()")));
            }
            Opcode::IdxBeg => {
                let name = var_name(int_arg(ins, at)?)?;
                stk.push(Some(Expr::Index { name, args: Vec::new() }));
                stk.push(None); // subscript marker
            }
            Opcode::IdxEnd => {
                let mut children = Vec::new();
                loop {
                    match stk.pop() {
                        Some(Some(e)) => children.push(e),
                        Some(None) => break,
                        None => return Err(Error::StackUnderflow { at }),
                    }
                }
                children.reverse();
                let top = stk.last_mut().ok_or(Error::StackUnderflow { at })?;
                let Some(Expr::Index { name, args }) = top else {
                    return Err(Error::layout(format!(
                        "idxend without matching idxbeg at instruction {at}"
                    )));
                };
                args.extend(children);
                if to_new_tostr && name.starts_with("$@") {
                    let inner = Expr::Index {
                        name: name[1..].to_string(),
                        args: std::mem::take(args),
                    };
                    *top = Some(Expr::unary(Opcode::ToStr, inner));
                }
            }
            Opcode::Neg | Opcode::ToStr | Opcode::ToNum => {
                let child = pop_expr(&mut stk, at)?;
                stk.push(Some(Expr::unary(ins.op, child)));
            }
            op if op.is_binary() => {
                let rhs = pop_expr(&mut stk, at)?;
                if stk.is_empty() {
                    // Tolerated truncation: a binary operator with a single
                    // operand at the end of the stream is a prefix form.
                    return Ok(Expr::unary(op, rhs));
                }
                let lhs = pop_expr(&mut stk, at)?;
                stk.push(Some(Expr::binary(op, lhs, rhs)));
            }
            op => {
                return Err(Error::layout(format!(
                    "opcode {} is not an expression operator",
                    op.mnemonic()
                )));
            }
        }
    }
    match (stk.pop(), stk.is_empty()) {
        (Some(Some(e)), true) => Ok(e),
        (popped, _) => {
            let depth = stk.len() + usize::from(popped.is_some());
            Err(Error::NonSingleton { depth })
        }
    }
}

fn int_arg(ins: &Ins, at: usize) -> Result<i64> {
    match ins.arg {
        InsArg::Int(v) => Ok(v),
        _ => Err(bad_operand(ins, at)),
    }
}

fn bad_operand(ins: &Ins, at: usize) -> Error {
    Error::layout(format!(
        "opcode {} carries a wrong operand kind at instruction {at}",
        ins.op.mnemonic()
    ))
}

fn pop_expr(stk: &mut Vec<Option<Expr>>, at: usize) -> Result<Expr> {
    match stk.pop() {
        Some(Some(e)) => Ok(e),
        _ => Err(Error::StackUnderflow { at }),
    }
}

/// Render a tree back to source text.
pub fn tree_to_string(e: &Expr) -> Result<String> {
    let mut out = String::new();
    write_expr(e, &mut out)?;
    Ok(out)
}

fn write_expr(e: &Expr, out: &mut String) -> Result<()> {
    match e {
        Expr::Leaf(text) => out.push_str(text),
        Expr::Index { name, args } => {
            if args.is_empty() {
                return Err(Error::layout(format!("indexed variable {name} without subscripts")));
            }
            out.push_str(name);
            out.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_expr(a, out)?;
            }
            out.push(')');
        }
        Expr::Unary { op: op @ (Opcode::ToStr | Opcode::ToNum), child } => {
            out.push_str(op.mnemonic());
            out.push('(');
            write_expr(child, out)?;
            out.push(')');
        }
        Expr::Unary { op, child } => {
            // `neg` prints as `-`; a binary opcode here is the prefix form,
            // where `&` is address-of and binds at its own level.
            let (text, my) = match op {
                Opcode::Neg => ("-", NEG_PREC),
                Opcode::BitAnd => ("&", ADR_PREC),
                op if op.is_binary() => (op.mnemonic(), bin_prec(*op)),
                op => {
                    return Err(Error::layout(format!(
                        "unary node with non-unary opcode {}",
                        op.mnemonic()
                    )))
                }
            };
            out.push_str(text);
            let paren = my < node_prec(child);
            if paren {
                out.push('(');
            }
            write_expr(child, out)?;
            if paren {
                out.push(')');
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let band = *op == Opcode::BitAnd;
            let my = bin_prec(*op);
            if band {
                out.push('(');
            }
            let paren = my < node_prec(lhs);
            if paren {
                out.push('(');
            }
            write_expr(lhs, out)?;
            if paren {
                out.push(')');
            }
            out.push_str(if band { " & " } else { op.mnemonic() });
            let paren = my <= node_prec(rhs);
            if paren {
                out.push('(');
            }
            write_expr(rhs, out)?;
            if paren {
                out.push(')');
            }
            if band {
                out.push(')');
            }
        }
    }
    Ok(())
}
