use crate::expr::{Expr, LiteralValue};

/// Renders an expression in parenthesised prefix form, e.g.
/// `(* (- 123.0) (group 45.67))`.  Used by the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => Self::parenthesize("group", [inner.as_ref()]),

            Expr::Unary { operator, right } => {
                Self::parenthesize(&operator.lexeme, [right.as_ref()])
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, [left.as_ref(), right.as_ref()]),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }

    fn parenthesize<'e>(name: &str, exprs: impl IntoIterator<Item = &'e Expr>) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::scan_tokens;

    fn printed(src: &str) -> String {
        let (tokens, errors) = scan_tokens(src);
        assert!(errors.is_empty());
        let expr = Parser::new(tokens)
            .parse_expression()
            .unwrap_or_else(|e| panic!("parse failed: {:?}", e));
        AstPrinter::print(&expr)
    }

    #[test]
    fn prints_precedence_as_nesting() {
        assert_eq!(printed("-123 * (45.67)"), "(* (- 123.0) (group 45.67))");
        assert_eq!(printed("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    }

    #[test]
    fn prints_logical_and_assignment() {
        assert_eq!(printed("a = b or c"), "(= a (or b c))");
    }

    #[test]
    fn prints_calls_and_properties() {
        assert_eq!(printed("f(1, \"x\")"), "(call f 1.0 x)");
        assert_eq!(printed("a.b.c = 2"), "(= (. (. a b) c) 2.0)");
    }
}
