//! CFG s-expression serializer.
//!
//! Golden-file form of packages and values:
//!
//! ```text
//! (+ [vF32:vF32:vF32] (add_vv (param 0) (param 1)))
//! (main [vF32:vF32] (call +_[vF32:vF32:vF32] (param 0) (param 0)))
//! ```
//!
//! - package: whitespace-separated `(name <type-mangling> <value>)` entries
//! - `(call <fn-value> <arg>…)` — function call (arguments optional)
//! - `(<op> <lhs> <rhs>)` with `<op>` ∈ `add_vv` … `mul_ss`
//! - `(param <index>)`, `(fp <literal>)`
//! - bare mangled names (`id_[vF32:vF32]`) — function references

use std::fmt;

use thrum_foundation::sexpr::{Error, Reader, Token};
use thrum_foundation::Symbol;
use thrum_vm::Opcode;

use crate::cfg::{Package, Value};
use crate::typed::TypedSymbol;
use crate::types::Type;

/// Parse a CFG package from s-expression text.
pub fn parse_package(source: &str) -> Result<Package, Error> {
    let mut reader = Reader::new(source)?;
    let mut package = Package::new();
    while !reader.at_end() {
        let (symbol, value) = parse_entry(&mut reader)?;
        package.functions.insert(symbol, value);
    }
    Ok(package)
}

/// Parse a single CFG value from s-expression text.
pub fn parse_value(source: &str) -> Result<Value, Error> {
    let mut reader = Reader::new(source)?;
    let value = parse_value_tree(&mut reader)?;
    if !reader.at_end() {
        return Err(Error::new(
            "trailing input after value",
            reader.current_span(),
        ));
    }
    Ok(value)
}

fn parse_entry(reader: &mut Reader) -> Result<(TypedSymbol, Value), Error> {
    reader.expect_lparen()?;
    let (name, _) = reader.expect_atom()?;
    let (mangling, span) = reader.expect_atom()?;
    let ty = match Type::parse_mangled(mangling) {
        Some(Type::Function(ft)) => *ft,
        _ => {
            return Err(Error::new(
                format!("invalid function type mangling `{mangling}`"),
                span,
            ))
        }
    };
    let value = parse_value_tree(reader)?;
    reader.expect_rparen()?;
    Ok((TypedSymbol::new(Symbol::from(name), ty), value))
}

fn parse_value_tree(reader: &mut Reader) -> Result<Value, Error> {
    match reader.peek() {
        Some(Token::Atom(text)) => {
            let span = reader.current_span();
            reader.advance();
            let Some(symbol) = TypedSymbol::parse_mangled(text) else {
                return Err(Error::new(
                    format!("invalid function reference `{text}`"),
                    span,
                ));
            };
            Ok(Value::FunctionRef {
                name: symbol.name,
                ty: symbol.ty,
            })
        }
        Some(Token::LParen) => {
            reader.expect_lparen()?;
            let (tag, span) = reader.expect_atom()?;
            let value = match tag {
                "call" => {
                    let function = parse_value_tree(reader)?;
                    let mut params = Vec::new();
                    while !matches!(reader.peek(), Some(Token::RParen) | None) {
                        params.push(parse_value_tree(reader)?);
                    }
                    Value::CallFunc {
                        function: Box::new(function),
                        params,
                    }
                }
                "param" => {
                    let (index, index_span) = reader.expect_atom()?;
                    let index = index.parse().map_err(|_| {
                        Error::new(format!("invalid parameter index `{index}`"), index_span)
                    })?;
                    Value::ParamRef(index)
                }
                "fp" => {
                    let (literal, literal_span) = reader.expect_atom()?;
                    let literal = literal.parse().map_err(|_| {
                        Error::new(format!("invalid literal `{literal}`"), literal_span)
                    })?;
                    Value::FPValue(literal)
                }
                op => match Opcode::from_mnemonic(op).filter(|op| op.is_arithmetic()) {
                    Some(op) => {
                        let lhs = parse_value_tree(reader)?;
                        let rhs = parse_value_tree(reader)?;
                        Value::BinaryOp {
                            op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        }
                    }
                    None => {
                        return Err(Error::new(format!("unknown value form `{op}`"), span));
                    }
                },
            };
            reader.expect_rparen()?;
            Ok(value)
        }
        _ => Err(Error::new("expected a CFG value", reader.current_span())),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::FPValue(value) => write!(f, "(fp {value})"),
            Value::ParamRef(index) => write!(f, "(param {index})"),
            Value::FunctionRef { name, ty } => {
                write!(f, "{}", TypedSymbol::new(name.clone(), ty.clone()))
            }
            Value::BinaryOp { op, lhs, rhs } => write!(f, "({op} {lhs} {rhs})"),
            Value::CallFunc { function, params } => {
                write!(f, "(call {function}")?;
                for param in params {
                    write!(f, " {param}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, value) in &self.functions {
            writeln!(f, "({} {} {value})", symbol.name, symbol.ty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intrinsic_entry() {
        let package = parse_package("(+ [vF32:vF32:vF32] (add_vv (param 0) (param 1)))").unwrap();
        assert_eq!(package.functions.len(), 1);
        let (symbol, value) = package.functions.first().unwrap();
        assert_eq!(symbol.to_string(), "+_[vF32:vF32:vF32]");
        assert!(matches!(
            value,
            Value::BinaryOp {
                op: Opcode::AddVv,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_call_with_reference() {
        let value = parse_value("(call id_[vF32:vF32] (param 0))").unwrap();
        let Value::CallFunc { function, params } = value else {
            panic!("expected call");
        };
        assert!(matches!(*function, Value::FunctionRef { .. }));
        assert_eq!(params, vec![Value::ParamRef(0)]);
    }

    #[test]
    fn test_nullary_call() {
        let value = parse_value("(call k_[F32])").unwrap();
        let Value::CallFunc { params, .. } = value else {
            panic!("expected call");
        };
        assert!(params.is_empty());
    }

    #[test]
    fn test_package_round_trip() {
        let source = "\
(+ [vF32:vF32:vF32] (add_vv (param 0) (param 1)))
(k [F32] (fp 4))
(main [vF32:vF32] (call +_[vF32:vF32:vF32] (call k_[F32]) (param 0)))
";
        let package = parse_package(source).unwrap();
        let reparsed = parse_package(&package.to_string()).unwrap();
        assert_eq!(package, reparsed);
    }

    #[test]
    fn test_unknown_form_is_rejected() {
        assert!(parse_value("(bogus 1 2)").is_err());
        assert!(parse_value("notmangled").is_err());
    }

    #[test]
    fn test_matches_built_package() {
        use thrum_dsl::{lower_module, parse_module};

        use crate::build::build_cfg;
        use crate::gc::gc;
        use crate::types::{FunctionType, Type};

        let module = lower_module(parse_module("main x = x + x ;").unwrap());
        let root_type = FunctionType {
            result: Type::Any,
            params: vec![Type::f32().vector_version()],
        };
        let (mut built, root) = build_cfg(&module, &Symbol::from("main"), &root_type).unwrap();
        gc(&mut built, &root).unwrap();

        let golden = parse_package(
            "\
(+ [vF32:vF32:vF32] (add_vv (param 0) (param 1)))
(main [vF32:vF32] (call +_[vF32:vF32:vF32] (param 0) (param 0)))
",
        )
        .unwrap();
        assert_eq!(built, golden);
    }
}
