//! Semantic validation
//!
//! Compile-time pass over the parsed AST. Catches what the grammar
//! cannot: undefined names, misplaced `break`/`continue`/`return`,
//! nested function definitions, duplicate definitions, and calls of
//! things that are not callable. Programs that pass here cannot raise
//! NameError from a bare identifier at runtime.

use std::collections::HashSet;

use crate::error::{CompileError, Location};
use crate::executor::os::OsFunction;
use crate::executor::stdlib::Builtin;
use crate::executor::types::{AssignTarget, Expr, FunctionDef, Stmt};
use crate::value::ExcKind;

pub(crate) fn validate(
    body: &[Stmt],
    functions: &[FunctionDef],
    input_names: &[String],
    externals: &[String],
) -> Result<(), CompileError> {
    check_function_table(functions)?;

    // Names visible from inside functions: inputs plus every top-level
    // `let`. (Bindings introduced inside blocks stay block-local.)
    let mut globals: HashSet<String> = input_names.iter().cloned().collect();
    for stmt in body {
        if let Stmt::Let { name, .. } = stmt {
            globals.insert(name.clone());
        }
    }

    let mut ctx = Validator {
        functions,
        externals,
        globals: &globals,
        scopes: vec![input_names.iter().cloned().collect()],
        loop_depth: 0,
        in_function: false,
    };
    ctx.walk_stmts(body, true)?;

    for func in functions {
        let mut params: HashSet<String> = HashSet::new();
        for param in &func.params {
            if !params.insert(param.clone()) {
                return Err(CompileError::name(
                    format!(
                        "duplicate parameter {param:?} in function {:?}",
                        func.name
                    ),
                    Some(at_line(func.line)),
                ));
            }
        }
        let mut ctx = Validator {
            functions,
            externals,
            globals: &globals,
            scopes: vec![globals.clone(), params],
            loop_depth: 0,
            in_function: true,
        };
        ctx.walk_stmts(&func.body, false)?;
    }
    Ok(())
}

fn check_function_table(functions: &[FunctionDef]) -> Result<(), CompileError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for func in functions {
        if !seen.insert(func.name.as_str()) {
            return Err(CompileError::name(
                format!("function {:?} is defined twice", func.name),
                Some(at_line(func.line)),
            ));
        }
    }
    Ok(())
}

fn at_line(line: u32) -> Location {
    Location {
        line: line as usize,
        column: 1,
    }
}

struct Validator<'a> {
    functions: &'a [FunctionDef],
    externals: &'a [String],
    globals: &'a HashSet<String>,
    scopes: Vec<HashSet<String>>,
    loop_depth: usize,
    in_function: bool,
}

impl Validator<'_> {
    fn walk_stmts(&mut self, body: &[Stmt], top_level: bool) -> Result<(), CompileError> {
        for stmt in body {
            self.walk_stmt(stmt, top_level)?;
        }
        Ok(())
    }

    fn walk_block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        self.scopes.push(HashSet::new());
        let result = self.walk_stmts(body, false);
        self.scopes.pop();
        result
    }

    fn walk_stmt(&mut self, stmt: &Stmt, top_level: bool) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, init, line } => {
                if let Some(init) = init {
                    self.walk_expr(init, *line)?;
                }
                let current = self.scopes.last_mut().expect("scope stack is never empty");
                if !current.insert(name.clone()) {
                    return Err(CompileError::name(
                        format!("{name:?} is already defined in this scope"),
                        Some(at_line(*line)),
                    ));
                }
                Ok(())
            }
            Stmt::Assign {
                target,
                value,
                line,
                ..
            } => {
                let name = match target {
                    AssignTarget::Name(name) => name,
                    AssignTarget::Index { name, index } => {
                        self.walk_expr(index, *line)?;
                        name
                    }
                };
                if !self.is_visible(name) {
                    return Err(CompileError::name(
                        format!("cannot assign to undefined name {name:?}"),
                        Some(at_line(*line)),
                    ));
                }
                self.walk_expr(value, *line)
            }
            Stmt::Expr { expr, line, .. } => self.walk_expr(expr, *line),
            Stmt::If {
                test,
                then_body,
                else_body,
                line,
            } => {
                self.walk_expr(test, *line)?;
                self.walk_block(then_body)?;
                self.walk_block(else_body)
            }
            Stmt::While { test, body, line } => {
                self.walk_expr(test, *line)?;
                self.loop_depth += 1;
                let result = self.walk_block(body);
                self.loop_depth -= 1;
                result
            }
            Stmt::For {
                var,
                iterable,
                body,
                line,
            } => {
                self.walk_expr(iterable, *line)?;
                self.scopes.push(HashSet::from([var.clone()]));
                self.loop_depth += 1;
                let result = self.walk_block(body);
                self.loop_depth -= 1;
                self.scopes.pop();
                result
            }
            Stmt::Try {
                body,
                catch,
                finally,
                ..
            } => {
                self.walk_block(body)?;
                if let Some(clause) = catch {
                    self.scopes.push(HashSet::from([clause.var.clone()]));
                    let result = self.walk_block(&clause.body);
                    self.scopes.pop();
                    result?;
                }
                if let Some(finally) = finally {
                    self.walk_block(finally)?;
                }
                Ok(())
            }
            Stmt::Throw { value, line } => self.walk_expr(value, *line),
            Stmt::Return { value, line } => {
                if !self.in_function {
                    return Err(CompileError::syntax(
                        "return outside of a function",
                        Some(at_line(*line)),
                    ));
                }
                if let Some(value) = value {
                    self.walk_expr(value, *line)?;
                }
                Ok(())
            }
            Stmt::Break { line } => {
                if self.loop_depth == 0 {
                    return Err(CompileError::syntax(
                        "break outside of a loop",
                        Some(at_line(*line)),
                    ));
                }
                Ok(())
            }
            Stmt::Continue { line } => {
                if self.loop_depth == 0 {
                    return Err(CompileError::syntax(
                        "continue outside of a loop",
                        Some(at_line(*line)),
                    ));
                }
                Ok(())
            }
            Stmt::FnDef { index, line } => {
                if !top_level {
                    let name = self
                        .functions
                        .get(*index)
                        .map(|f| f.name.as_str())
                        .unwrap_or("<fn>");
                    return Err(CompileError::unsupported(
                        format!("function {name:?} must be defined at top level"),
                        Some(at_line(*line)),
                    ));
                }
                Ok(())
            }
        }
    }

    fn walk_expr(&mut self, expr: &Expr, line: u32) -> Result<(), CompileError> {
        match expr {
            Expr::LitNull
            | Expr::LitBool { .. }
            | Expr::LitInt { .. }
            | Expr::LitBig { .. }
            | Expr::LitFloat { .. }
            | Expr::LitStr { .. }
            | Expr::LitBytes { .. } => Ok(()),
            Expr::Ident { name } => {
                if self.is_visible(name) {
                    return Ok(());
                }
                if self.is_callable_name(name) {
                    return Err(CompileError::unsupported(
                        format!("{name:?} is a function name, not a value"),
                        Some(at_line(line)),
                    ));
                }
                Err(CompileError::name(
                    format!("undefined name {name:?}"),
                    Some(at_line(line)),
                ))
            }
            Expr::ListLit { items } | Expr::TupleLit { items } | Expr::SetLit { items } => {
                for item in items {
                    self.walk_expr(item, line)?;
                }
                Ok(())
            }
            Expr::DictLit { pairs } => {
                for (key, value) in pairs {
                    self.walk_expr(key, line)?;
                    self.walk_expr(value, line)?;
                }
                Ok(())
            }
            Expr::Unary { operand, .. } => self.walk_expr(operand, line),
            Expr::Binary { left, right, .. } | Expr::Logic { left, right, .. } => {
                self.walk_expr(left, line)?;
                self.walk_expr(right, line)
            }
            Expr::Index { object, index } => {
                self.walk_expr(object, line)?;
                self.walk_expr(index, line)
            }
            Expr::Member { object, .. } => self.walk_expr(object, line),
            Expr::Await { inner, line } => self.walk_expr(inner, *line),
            Expr::Call {
                callee,
                args,
                kwargs,
                line,
            } => self.walk_call(callee, args, kwargs, *line),
        }
    }

    fn walk_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        line: u32,
    ) -> Result<(), CompileError> {
        let mut kw_seen: HashSet<&str> = HashSet::new();
        for (name, _) in kwargs {
            if !kw_seen.insert(name.as_str()) {
                return Err(CompileError::syntax(
                    format!("duplicate keyword argument {name:?}"),
                    Some(at_line(line)),
                ));
            }
        }

        match callee {
            Expr::Ident { name } => {
                if !self.is_callable_name(name) {
                    if self.is_visible(name) {
                        return Err(CompileError::unsupported(
                            format!("{name:?} is a variable; only named functions can be called"),
                            Some(at_line(line)),
                        ));
                    }
                    return Err(CompileError::name(
                        format!("undefined function {name:?}"),
                        Some(at_line(line)),
                    ));
                }
            }
            Expr::Member { object, property } => {
                let dotted_external = match object.as_ref() {
                    Expr::Ident { name: base } => self
                        .externals
                        .iter()
                        .any(|ext| ext == &format!("{base}.{property}")),
                    _ => false,
                };
                if !dotted_external {
                    // Ordinary method call: the receiver is a value.
                    self.walk_expr(object, line)?;
                }
            }
            _ => {
                return Err(CompileError::unsupported(
                    "only named functions and methods can be called",
                    Some(at_line(line)),
                ))
            }
        }

        for arg in args {
            self.walk_expr(arg, line)?;
        }
        for (_, value) in kwargs {
            self.walk_expr(value, line)?;
        }
        Ok(())
    }

    /// A name visible as a value in the current scope chain.
    fn is_visible(&self, name: &str) -> bool {
        if self.scopes.iter().rev().any(|scope| scope.contains(name)) {
            return true;
        }
        // Inside a function the global names are always reachable.
        self.in_function && self.globals.contains(name)
    }

    /// A name a bare call can dispatch to.
    fn is_callable_name(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
            || self.externals.iter().any(|ext| ext == name)
            || Builtin::from_name(name).is_some()
            || ExcKind::from_name(name).is_some()
            || OsFunction::from_name(name).is_some()
    }
}
