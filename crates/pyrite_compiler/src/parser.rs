//! Parser: indentation-delimited lines → AST.
//!
//! The grammar is line-oriented. A statement belongs to a block while its
//! line is indented at least `2*indent` spaces relative to the enclosing
//! construct. Expressions are split on single spaces: exactly three tokens
//! form an infix operation, so chained operators like `a + b + c` are a
//! parse error rather than a precedence decision.

use crate::reader::LineReader;
use pyrite_syntax::ast::{BinOp, Expr, FnDecl, Module, Stmt};
use pyrite_syntax::diagnostics::Diagnostic;

/// Parse result: the module plus warnings for skipped top-level lines.
#[derive(Debug)]
pub struct Parsed {
    pub module: Module,
    pub warnings: Vec<Diagnostic>,
}

/// Parse a whole source file. Unknown top-level lines are reported as
/// warnings and skipped; everything else that fails to parse is fatal.
pub fn parse(filename: &str, source: &str) -> Result<Parsed, Diagnostic> {
    let mut parser = Parser {
        reader: LineReader::new(source),
        warnings: Vec::new(),
    };
    let funcs = parser.parse_module()?;
    Ok(Parsed {
        module: Module {
            filename: filename.to_string(),
            funcs,
        },
        warnings: parser.warnings,
    })
}

struct Parser<'a> {
    reader: LineReader<'a>,
    warnings: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn parse_module(&mut self) -> Result<Vec<FnDecl>, Diagnostic> {
        let mut funcs = Vec::new();
        while let Some(line) = self.reader.peek() {
            if line.starts_with("def ") {
                funcs.push(self.parse_func()?);
            } else {
                let line_no = self.reader.line_number();
                let line = self.reader.pop().unwrap();
                self.warnings.push(Diagnostic::warning(
                    format!("unknown top-level line: {:?}", line),
                    Some(line_no),
                ));
            }
        }
        Ok(funcs)
    }

    fn parse_func(&mut self) -> Result<FnDecl, Diagnostic> {
        let line_no = self.reader.line_number();
        let header = self.reader.pop().unwrap();
        let rest = header.strip_prefix("def ").ok_or_else(|| {
            Diagnostic::error(
                format!("expected function definition, got {:?}", header),
                Some(line_no),
            )
        })?;
        let (name, params_part) = rest.split_once('(').ok_or_else(|| {
            Diagnostic::error(
                format!("malformed function header: {:?}", header),
                Some(line_no),
            )
        })?;
        let params_src = params_part.strip_suffix("):").ok_or_else(|| {
            Diagnostic::error(
                format!("malformed function header: {:?}", header),
                Some(line_no),
            )
        })?;
        let params: Vec<String> = if params_src.is_empty() {
            Vec::new()
        } else {
            params_src.split(", ").map(str::to_string).collect()
        };
        let body = self.parse_block(1)?;
        Ok(FnDecl {
            name: name.to_string(),
            params,
            body,
            line: line_no,
        })
    }

    /// Parse sibling statements while lines stay indented at this level.
    /// An `if` block immediately followed by `else:` at the same level is
    /// folded into a single `ifelse` node here.
    fn parse_block(&mut self, indent: usize) -> Result<Vec<Stmt>, Diagnostic> {
        let mut stmts = Vec::new();
        let prefix = "  ".repeat(indent);
        while let Some(line) = self.reader.peek() {
            if !line.starts_with(prefix.as_str()) {
                break;
            }
            let stmt = self.parse_stmt(indent)?;
            let stmt = match stmt {
                Stmt::If { cond, body, line } if self.peek_is_else(&prefix) => {
                    self.reader.pop();
                    let else_body = self.parse_block(indent + 1)?;
                    Stmt::IfElse {
                        cond,
                        then_body: body,
                        else_body,
                        line,
                    }
                }
                other => other,
            };
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    fn peek_is_else(&self, prefix: &str) -> bool {
        matches!(self.reader.peek(), Some(l) if l.starts_with(prefix) && l.trim() == "else:")
    }

    fn parse_stmt(&mut self, indent: usize) -> Result<Stmt, Diagnostic> {
        let line_no = self.reader.line_number();
        let raw = self.reader.pop().unwrap();
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix("return ") {
            let value = parse_expr(rest, line_no)?;
            return Ok(Stmt::Return {
                value,
                line: line_no,
            });
        }
        if let Some(rest) = line.strip_prefix("if ") {
            let cond_src = rest.strip_suffix(':').ok_or_else(|| {
                Diagnostic::error(format!("missing ':' after if condition: {:?}", line), Some(line_no))
            })?;
            let cond = parse_expr(cond_src, line_no)?;
            let body = self.parse_block(indent + 1)?;
            return Ok(Stmt::If {
                cond,
                body,
                line: line_no,
            });
        }
        if line == "else:" {
            return Err(Diagnostic::error(
                "else without a preceding if",
                Some(line_no),
            ));
        }
        if let Some(rest) = line.strip_prefix("while ") {
            let cond_src = rest.strip_suffix(':').ok_or_else(|| {
                Diagnostic::error(
                    format!("missing ':' after while condition: {:?}", line),
                    Some(line_no),
                )
            })?;
            let cond = parse_expr(cond_src, line_no)?;
            let body = self.parse_block(indent + 1)?;
            return Ok(Stmt::While {
                cond,
                body,
                line: line_no,
            });
        }
        if let Some((target, value_src)) = line.split_once(" = ") {
            let value = parse_expr(value_src, line_no)?;
            return Ok(Stmt::Assign {
                target: target.to_string(),
                value,
                line: line_no,
            });
        }
        Err(Diagnostic::error(
            format!("unknown statement: {}", line),
            Some(line_no),
        ))
    }
}

/// Parse one expression from a trimmed token string. Priority order:
/// parenthesized sub-expression, call, three-token infix, integer literal,
/// variable. Anything else is fatal.
pub fn parse_expr(src: &str, line: u32) -> Result<Expr, Diagnostic> {
    let src = src.trim();
    if src.starts_with('(') && paren_closes_at_end(src) {
        return parse_expr(&src[1..src.len() - 1], line);
    }
    if src.ends_with(')') {
        if let Some((name, _)) = src.split_once('(') {
            if is_ident(name) && paren_closes_at_end(&src[name.len()..]) {
                let args_src = &src[name.len() + 1..src.len() - 1];
                let args = if args_src.is_empty() {
                    Vec::new()
                } else {
                    args_src
                        .split(", ")
                        .map(|a| parse_expr(a, line))
                        .collect::<Result<Vec<_>, _>>()?
                };
                return Ok(Expr::Call {
                    callee: name.to_string(),
                    args,
                });
            }
        }
    }
    let tokens: Vec<&str> = src.split(' ').collect();
    if tokens.len() == 3 {
        let op = BinOp::from_token(tokens[1]).ok_or_else(|| {
            Diagnostic::error(
                format!("unknown operator {:?} in {:?}", tokens[1], src),
                Some(line),
            )
        })?;
        let left = parse_expr(tokens[0], line)?;
        let right = parse_expr(tokens[2], line)?;
        return Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
    }
    if !src.is_empty() && src.bytes().all(|b| b.is_ascii_digit()) {
        let value = src.parse::<i64>().map_err(|_| {
            Diagnostic::error(format!("integer literal out of range: {}", src), Some(line))
        })?;
        return Ok(Expr::Int(value));
    }
    if is_ident(src) {
        return Ok(Expr::Var(src.to_string()));
    }
    Err(Diagnostic::error(
        format!("cannot parse expression: {:?}", src),
        Some(line),
    ))
}

/// True when the paren opened at the start of `s` closes at its last byte.
/// Distinguishes `f(a, b)` from `f(a) + g(b)`, and `(a + b)` from
/// `(a) + (b)`.
fn paren_closes_at_end(s: &str) -> bool {
    let mut depth = 0i32;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Module {
        parse("test.pyr", src).expect("parse").module
    }

    #[test]
    fn parse_function_header_and_params() {
        let m = parse_ok("def add(a, b):\n  return a + b\n");
        assert_eq!(m.funcs.len(), 1);
        assert_eq!(m.funcs[0].name, "add");
        assert_eq!(m.funcs[0].params, ["a", "b"]);
        assert_eq!(m.funcs[0].body.len(), 1);
    }

    #[test]
    fn parse_empty_param_list() {
        let m = parse_ok("def five():\n  return 5\n");
        assert!(m.funcs[0].params.is_empty());
    }

    #[test]
    fn unknown_top_level_line_is_warning_not_error() {
        let parsed = parse("test.pyr", "what is this\ndef f(a):\n  return a\n").expect("parse");
        assert_eq!(parsed.module.funcs.len(), 1);
        assert_eq!(parsed.warnings.len(), 2); // the odd line and the trailing blank
        assert!(parsed.warnings[0].message.contains("what is this"));
    }

    #[test]
    fn if_followed_by_else_folds_into_ifelse() {
        let m = parse_ok(
            "def max(a, b):\n  if a > b:\n    r = a\n  else:\n    r = b\n  return r\n",
        );
        let body = &m.funcs[0].body;
        assert_eq!(body.len(), 2);
        let Stmt::IfElse {
            then_body,
            else_body,
            ..
        } = &body[0]
        else {
            panic!("expected ifelse, got {:?}", body[0]);
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn orphan_else_is_fatal() {
        let err = parse("test.pyr", "def f(a):\n  else:\n    r = a\n").unwrap_err();
        assert!(err.message.contains("else without a preceding if"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn unknown_statement_is_fatal() {
        let err = parse("test.pyr", "def f(a):\n  launch missiles\n").unwrap_err();
        assert!(err.message.contains("unknown statement"));
    }

    #[test]
    fn while_parses_with_nested_body() {
        let m = parse_ok("def f(a):\n  x = 1\n  while x < 5:\n    x = x + 1\n  return x\n");
        let body = &m.funcs[0].body;
        assert_eq!(body.len(), 3);
        let Stmt::While { body: loop_body, .. } = &body[1] else {
            panic!("expected while");
        };
        assert_eq!(loop_body.len(), 1);
    }

    #[test]
    fn chained_operators_fail() {
        let err = parse_expr("a + b + c", 1).unwrap_err();
        assert!(err.message.contains("cannot parse expression"));
    }

    #[test]
    fn parenthesized_expression_unwraps() {
        let e = parse_expr("(a < b)", 1).unwrap();
        assert!(matches!(e, Expr::Binary { op: BinOp::Lt, .. }));
    }

    #[test]
    fn binop_over_two_parenthesized_operands() {
        let e = parse_expr("(a) + (b)", 1).unwrap();
        let Expr::Binary { op, left, right } = e else {
            panic!("expected binop");
        };
        assert_eq!(op, BinOp::Add);
        assert_eq!(*left, Expr::Var("a".into()));
        assert_eq!(*right, Expr::Var("b".into()));
    }

    #[test]
    fn call_with_arguments() {
        let e = parse_expr("add(x, 3)", 1).unwrap();
        let Expr::Call { callee, args } = e else {
            panic!("expected call");
        };
        assert_eq!(callee, "add");
        assert_eq!(args, vec![Expr::Var("x".into()), Expr::Int(3)]);
    }

    #[test]
    fn call_with_no_arguments() {
        let e = parse_expr("f()", 1).unwrap();
        assert_eq!(
            e,
            Expr::Call {
                callee: "f".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn call_with_binop_argument() {
        let e = parse_expr("f(a + b)", 1).unwrap();
        let Expr::Call { args, .. } = e else {
            panic!("expected call")
        };
        assert!(matches!(args[0], Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn binop_over_two_calls_is_not_a_call() {
        let e = parse_expr("f(a) + g(b)", 1).unwrap();
        let Expr::Binary { op, left, right } = e else {
            panic!("expected binop");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(*left, Expr::Call { .. }));
        assert!(matches!(*right, Expr::Call { .. }));
    }

    #[test]
    fn unknown_operator_is_fatal() {
        let err = parse_expr("a % b", 1).unwrap_err();
        assert!(err.message.contains("unknown operator"));
    }

    #[test]
    fn deeper_indentation_stays_in_block() {
        // Body lines indented more than required still belong to the block.
        let m = parse_ok("def f(a):\n  if a > 1:\n      r = a\n  return a\n");
        let Stmt::If { body, .. } = &m.funcs[0].body[0] else {
            panic!("expected if");
        };
        assert_eq!(body.len(), 1);
    }
}
