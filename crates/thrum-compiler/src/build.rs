//! Type-directed CFG construction.
//!
//! Starting from a root function and signature, every referenced function
//! is reified into a monomorphic CFG at the signature its use site
//! demands. Source declarations are templates; the package entry for a
//! `(name, signature)` pair is created the first time that pair is
//! requested.
//!
//! Recursion terminates because the package entry is inserted *before* the
//! body is built: a recursive reference finds the in-progress entry and
//! closes the cycle nominally through a [`Value::FunctionRef`].
//!
//! A request may carry `Any` as its result type: every application
//! argument is built against the loosest constraint, so globals referenced
//! from argument position are first requested at an `Any` result. Such
//! entries are re-keyed to the concrete type of the built body, so the
//! symbols the rest of the pipeline sees are fully concrete.

use indexmap::IndexMap;

use thrum_dsl::{Expr, Module};
use thrum_foundation::Symbol;
use tracing::debug;

use crate::cfg::{Package, Value};
use crate::error::CompileError;
use crate::intrinsics::intrinsics;
use crate::typed::TypedSymbol;
use crate::types::{FunctionType, Type};

/// Build the CFG package for `module`, rooted at `root_name` with the
/// signature `root_type`.
///
/// Returns the package and the concrete typed symbol of the root (which
/// differs from `(root_name, root_type)` when the requested result was
/// `Any`).
pub fn build_cfg(
    module: &Module,
    root_name: &Symbol,
    root_type: &FunctionType,
) -> Result<(Package, TypedSymbol), CompileError> {
    let mut context = GlobalContext::new(module);
    let root = context.resolve(root_name, root_type)?;
    Ok((context.finish(), root))
}

/// Module-wide build state: the declaration templates and the package
/// being produced.
struct GlobalContext {
    sources: IndexMap<Symbol, Expr>,
    /// `None` marks an entry whose body is still being built.
    package: IndexMap<TypedSymbol, Option<Value>>,
}

impl GlobalContext {
    fn new(module: &Module) -> Self {
        let sources = module
            .declarations
            .iter()
            .map(|decl| (decl.name.clone(), decl.value.clone()))
            .collect();
        let package = intrinsics()
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        Self { sources, package }
    }

    /// Obtain the monomorphisation of `name` at `requested`, building it
    /// from source if the package does not have a usable instance yet.
    ///
    /// The lookup is subtype-aware: an existing instance whose signature
    /// subtypes the request satisfies it. This is what resolves an
    /// intrinsic from argument position, where the constraint's result is
    /// `Any` and never equals the seeded signature.
    fn resolve(
        &mut self,
        name: &Symbol,
        requested: &FunctionType,
    ) -> Result<TypedSymbol, CompileError> {
        let key = TypedSymbol::new(name.clone(), requested.clone());
        if self.package.contains_key(&key) {
            // Built already, or in progress (a recursive reference).
            return Ok(key);
        }
        let wanted = Type::Function(Box::new(requested.clone()));
        for existing in self.package.keys() {
            if existing.name == *name
                && Type::Function(Box::new(existing.ty.clone())).subtype_of(&wanted)
            {
                return Ok(existing.clone());
            }
        }

        let Some(expr) = self.sources.get(name).cloned() else {
            return Err(CompileError::UndeclaredIdentifier(name.clone()));
        };

        debug!(%key, "monomorphising");
        self.package.insert(key.clone(), None);

        let built = match &expr {
            Expr::Function { params, value } => {
                if params.len() != requested.params.len() {
                    return Err(CompileError::TypeMismatch(format!(
                        "`{name}` takes {} parameters but was requested at `{requested}`",
                        params.len()
                    )));
                }
                ScopeContext::new(self, requested.clone(), params)
                    .build(value, &requested.result)?
            }
            // Any other declaration body is an implicit nullary function.
            other => {
                ScopeContext::new(self, requested.clone(), &[]).build(other, &requested.result)?
            }
        };

        // Re-key `Any`-result requests to the concrete body type.
        let final_key = if requested.result == Type::Any {
            let actual = built.type_in(requested)?;
            TypedSymbol::new(
                name.clone(),
                FunctionType {
                    result: actual,
                    params: requested.params.clone(),
                },
            )
        } else {
            key.clone()
        };

        if final_key != key {
            self.package.shift_remove(&key);
        }
        self.package.insert(final_key.clone(), Some(built));
        Ok(final_key)
    }

    fn finish(self) -> Package {
        Package {
            functions: self
                .package
                .into_iter()
                .map(|(key, value)| (key, value.expect("all package entries are built")))
                .collect(),
        }
    }
}

/// Per-function build state: the enclosing signature and the parameter
/// bindings.
struct ScopeContext<'g> {
    global: &'g mut GlobalContext,
    function: FunctionType,
    bindings: IndexMap<Symbol, Value>,
}

impl<'g> ScopeContext<'g> {
    fn new(global: &'g mut GlobalContext, function: FunctionType, param_names: &[Symbol]) -> Self {
        let bindings = param_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), Value::ParamRef(index)))
            .collect();
        Self {
            global,
            function,
            bindings,
        }
    }

    /// Reify `expr` as a CFG value satisfying `requested`.
    fn build(&mut self, expr: &Expr, requested: &Type) -> Result<Value, CompileError> {
        let value = match expr {
            Expr::Scalar(scalar) => Value::FPValue(*scalar),
            Expr::Identifier(name) => self.resolve_identifier(name, requested)?,
            Expr::Apply { function, params } => {
                // Arguments are resolved first, at the loosest possible
                // constraint; their types then select the callee's
                // monomorphisation.
                let mut args = Vec::with_capacity(params.len());
                for param in params {
                    args.push(self.build(param, &Type::Any)?);
                }
                let mut param_types = Vec::with_capacity(args.len());
                for arg in &args {
                    param_types.push(arg.type_in(&self.function)?);
                }

                let constraint = Type::function(requested.clone(), param_types);
                let fn_site = self.build(function, &constraint)?;
                Value::CallFunc {
                    function: Box::new(fn_site),
                    params: args,
                }
            }
            Expr::OperatorSequence { .. } => return Err(CompileError::UnloweredOperatorSequence),
            Expr::Function { .. } => return Err(CompileError::Unsupported("lambda expressions")),
            Expr::LexicalScope { .. } => return Err(CompileError::Unsupported("lexical scopes")),
        };

        let ty = value.type_in(&self.function)?;
        if ty == Type::Any {
            return Err(CompileError::TypeMismatch(format!(
                "`{expr}` resolved to `Any`"
            )));
        }
        if !ty.subtype_of(requested) {
            return Err(CompileError::TypeMismatch(format!(
                "expected `{requested}`, found `{ty}` for `{expr}`"
            )));
        }
        Ok(value)
    }

    /// Resolve an identifier: locally bound parameters first, then global
    /// functions. A global referenced at a non-function type is an
    /// implicitly called nullary function.
    fn resolve_identifier(
        &mut self,
        name: &Symbol,
        requested: &Type,
    ) -> Result<Value, CompileError> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }

        if let Type::Function(ft) = requested {
            let key = self.global.resolve(name, ft)?;
            Ok(Value::FunctionRef {
                name: name.clone(),
                ty: key.ty,
            })
        } else {
            let ft = requested.function_version();
            let key = self.global.resolve(name, &ft)?;
            Ok(Value::CallFunc {
                function: Box::new(Value::FunctionRef {
                    name: name.clone(),
                    ty: key.ty,
                }),
                params: Vec::new(),
            })
        }
    }
}
