//! Recursive-descent parser fused with code generator (spec §4.4).
//!
//! One method per grammar non-terminal; every production emits VM code
//! inline as it's recognized, consulting and updating the two symbol
//! scopes as it goes. No AST is ever materialized - emission order *is*
//! parse order.

use crate::error::CompileError;
use jackc_lex::{TokenKind, Tokenizer};
use jackc_sym::{Entry, Kind, SymbolTable};
use jackc_vm::{binary_op_from_symbol, unary_op_from_symbol, BinaryOp, Segment, UnaryOp, VmWriter};

fn segment_for(kind: Kind) -> Segment {
    match kind {
        Kind::Static => Segment::Static,
        Kind::Field => Segment::This,
        Kind::Argument => Segment::Argument,
        Kind::Local => Segment::Local,
    }
}

/// Owns the tokenizer, both symbol scopes, the current class/subroutine
/// context, the monotonic label counter, and the output buffer. One
/// `Engine` translates exactly one class (one `.jack` file).
pub struct Engine {
    tok: Tokenizer,
    class_scope: SymbolTable,
    subroutine_scope: SymbolTable,
    class_name: String,
    subroutine_name: String,
    subroutine_kind: String,
    label_count: u32,
    last_line: usize,
    output: String,
}

impl Engine {
    pub fn new(tok: Tokenizer) -> Self {
        let last_line = if tok.has_more() { tok.current_line() } else { 1 };
        Self {
            tok,
            class_scope: SymbolTable::new(),
            subroutine_scope: SymbolTable::new(),
            class_name: String::new(),
            subroutine_name: String::new(),
            subroutine_kind: String::new(),
            label_count: 0,
            last_line,
            output: String::new(),
        }
    }

    pub fn into_output(self) -> String {
        self.output
    }

    /// Entry point: the next routine called must be this one (mirrors the
    /// original's constructor-drives-`compileClass` shape).
    pub fn compile_class(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("class")?;
        self.class_name = self.ident()?;
        self.expect_symbol("{")?;

        self.class_scope = SymbolTable::new();
        while self.at_any_keyword(&["static", "field"]) {
            self.compile_class_var_dec()?;
        }
        while self.at_any_keyword(&["constructor", "function", "method"]) {
            self.compile_subroutine_dec()?;
        }
        self.expect_symbol("}")?;
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind_kw = self.tok.current_lexeme().to_string();
        let kind = if kind_kw == "static" { Kind::Static } else { Kind::Field };
        self.advance();
        let type_name = self.type_name()?;
        loop {
            let name = self.ident()?;
            self.class_scope.add(name, type_name.clone(), kind);
            if self.current_is_symbol(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_subroutine_dec(&mut self) -> Result<(), CompileError> {
        self.subroutine_scope = SymbolTable::new();
        let kind_kw = self.tok.current_lexeme().to_string();
        if kind_kw == "method" {
            self.subroutine_scope
                .add("this", self.class_name.clone(), Kind::Argument);
        }
        self.subroutine_kind = kind_kw;
        self.advance(); // over constructor/function/method

        let _return_type = self.type_name()?;
        self.subroutine_name = self.ident()?;

        self.expect_symbol("(")?;
        self.compile_parameter_list()?;
        self.expect_symbol(")")?;

        self.compile_subroutine_body()
    }

    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        while !self.current_is_symbol(")") {
            let type_name = self.type_name()?;
            let name = self.ident()?;
            self.subroutine_scope.add(name, type_name, Kind::Argument);
            if self.current_is_symbol(",") {
                self.advance();
            }
        }
        Ok(())
    }

    fn compile_subroutine_body(&mut self) -> Result<(), CompileError> {
        self.expect_symbol("{")?;
        while self.at_keyword("var") {
            self.compile_var_dec()?;
        }

        // The function directive is emitted only now: n_locals is final
        // only once every `var` has been parsed.
        let n_locals = self.subroutine_scope.count(Kind::Local);
        let function_name = format!("{}.{}", self.class_name, self.subroutine_name);
        self.emit().write_function(&function_name, n_locals);

        match self.subroutine_kind.as_str() {
            "constructor" => {
                let n_fields = self.class_scope.count(Kind::Field);
                self.emit().write_push(Segment::Constant, n_fields);
                self.emit().write_call("Memory.alloc", 1);
                self.emit().write_pop(Segment::Pointer, 0);
            }
            "method" => {
                self.emit().write_push(Segment::Argument, 0);
                self.emit().write_pop(Segment::Pointer, 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol("}")?;
        Ok(())
    }

    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("var")?;
        let type_name = self.type_name()?;
        loop {
            let name = self.ident()?;
            self.subroutine_scope.add(name, type_name.clone(), Kind::Local);
            if self.current_is_symbol(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            if !self.tok.has_more() || self.tok.current_kind() != TokenKind::Keyword {
                break;
            }
            match self.tok.current_lexeme() {
                "let" => self.compile_let()?,
                "if" => self.compile_if()?,
                "while" => self.compile_while()?,
                "do" => self.compile_do()?,
                "return" => self.compile_return()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("let")?;
        let line = self.tok_line();
        let name = self.ident()?;
        let Some((seg, idx)) = self.resolve(&name).map(|e| (segment_for(e.kind), e.index)) else {
            return Err(CompileError::UnknownName { name, line });
        };

        if self.current_is_symbol("[") {
            self.advance();
            self.compile_expression()?;
            self.expect_symbol("]")?;
            self.emit().write_push(seg, idx);
            self.emit().write_binary(BinaryOp::Add);
            self.expect_symbol("=")?;
            self.compile_expression()?;
            // Stash through temp so evaluating `expr` cannot clobber the
            // pointer-1/that rebinding we're about to do.
            self.emit().write_pop(Segment::Temp, 0);
            self.emit().write_pop(Segment::Pointer, 1);
            self.emit().write_push(Segment::Temp, 0);
            self.emit().write_pop(Segment::That, 0);
        } else {
            self.expect_symbol("=")?;
            self.compile_expression()?;
            self.emit().write_pop(seg, idx);
        }
        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("if")?;
        self.expect_symbol("(")?;
        self.compile_expression()?;
        self.expect_symbol(")")?;
        self.emit().write_unary(UnaryOp::Not);
        let l_false = self.next_label("ifLbl");
        self.emit().write_if_goto(&l_false);

        self.expect_symbol("{")?;
        self.compile_statements()?;
        self.expect_symbol("}")?;

        if self.at_keyword("else") {
            let l_end = self.next_label("ifLbl");
            self.emit().write_goto(&l_end);
            self.emit().write_label(&l_false);

            self.advance(); // over 'else'
            self.expect_symbol("{")?;
            self.compile_statements()?;
            self.expect_symbol("}")?;

            self.emit().write_label(&l_end);
        } else {
            self.emit().write_label(&l_false);
        }
        Ok(())
    }

    fn compile_while(&mut self) -> Result<(), CompileError> {
        let l_top = self.next_label("whileLbl");
        let l_end = self.next_label("whileLbl");

        self.emit().write_label(&l_top);
        self.expect_keyword("while")?;
        self.expect_symbol("(")?;
        self.compile_expression()?;
        self.expect_symbol(")")?;
        self.emit().write_unary(UnaryOp::Not);
        self.emit().write_if_goto(&l_end);

        self.expect_symbol("{")?;
        self.compile_statements()?;
        self.emit().write_goto(&l_top);
        self.emit().write_label(&l_end);
        self.expect_symbol("}")?;
        Ok(())
    }

    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("do")?;
        let line = self.tok_line();
        let name = self.ident()?;

        if self.current_is_symbol(".") {
            self.advance();
            let sub_name = self.ident()?;
            self.expect_symbol("(")?;
            let receiver = self
                .resolve(&name)
                .map(|e| (segment_for(e.kind), e.index, e.type_name.clone()));
            if let Some((seg, idx, type_name)) = receiver {
                self.emit().write_push(seg, idx);
                let n_args = self.compile_expression_list()?;
                self.emit().write_call(&format!("{type_name}.{sub_name}"), n_args + 1);
            } else {
                let n_args = self.compile_expression_list()?;
                self.emit().write_call(&format!("{name}.{sub_name}"), n_args);
            }
            self.expect_symbol(")")?;
        } else if self.current_is_symbol("(") {
            // Unqualified call: reference implementation treats this as an
            // implicit method call on the current object (spec §9).
            self.advance();
            self.emit().write_push(Segment::Pointer, 0);
            let n_args = self.compile_expression_list()?;
            self.emit()
                .write_call(&format!("{}.{name}", self.class_name), n_args + 1);
            self.expect_symbol(")")?;
        } else {
            return Err(CompileError::Syntax {
                line,
                message: format!("expected '(' or '.' after \"{name}\" in do statement"),
            });
        }

        self.expect_symbol(";")?;
        self.emit().write_pop(Segment::Temp, 0);
        Ok(())
    }

    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("return")?;
        if self.current_is_symbol(";") {
            self.advance();
            self.emit().write_push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
            self.expect_symbol(";")?;
        }
        self.emit().write_return();
        Ok(())
    }

    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        loop {
            if !self.tok.has_more() || self.tok.current_kind() != TokenKind::Symbol {
                break;
            }
            let Some(op) = binary_op_from_symbol(self.tok.current_lexeme()) else {
                break;
            };
            self.advance();
            self.compile_term()?;
            self.emit().write_binary(op);
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        if !self.tok.has_more() {
            return Err(self.eof_error());
        }

        match self.tok.current_kind() {
            TokenKind::IntegerConstant => {
                let lexeme = self.tok.current_lexeme().to_string();
                self.advance();
                // The spec does not range-check at parse time; the target
                // hardware wraps an out-of-range literal, so we do too.
                let value: i64 = lexeme.parse().unwrap_or(0);
                self.emit().write_push(Segment::Constant, (value & 0xFFFF) as u16);
                Ok(())
            }
            TokenKind::StringConstant => {
                let text = self.tok.current_lexeme().to_string();
                self.advance();
                self.emit().write_push(Segment::Constant, text.chars().count() as u16);
                self.emit().write_call("String.new", 1);
                for c in text.chars() {
                    self.emit().write_push(Segment::Constant, c as u16);
                    self.emit().write_call("String.appendChar", 2);
                }
                Ok(())
            }
            TokenKind::Keyword
                if matches!(self.tok.current_lexeme(), "true" | "false" | "null" | "this") =>
            {
                let kw = self.tok.current_lexeme().to_string();
                self.advance();
                match kw.as_str() {
                    "true" => {
                        self.emit().write_push(Segment::Constant, 0);
                        self.emit().write_unary(UnaryOp::Not);
                    }
                    "this" => self.emit().write_push(Segment::Pointer, 0),
                    _ => self.emit().write_push(Segment::Constant, 0),
                }
                Ok(())
            }
            TokenKind::Identifier => self.compile_identifier_term(),
            TokenKind::Symbol if self.current_is_symbol("(") => {
                self.advance();
                self.compile_expression()?;
                self.expect_symbol(")")?;
                Ok(())
            }
            TokenKind::Symbol if matches!(self.tok.current_lexeme(), "-" | "~") => {
                let sym = self.tok.current_lexeme().to_string();
                self.advance();
                self.compile_term()?;
                let op = unary_op_from_symbol(&sym).expect("guarded above");
                self.emit().write_unary(op);
                Ok(())
            }
            _ => {
                let line = self.tok_line();
                Err(CompileError::Syntax {
                    line,
                    message: format!("unexpected token \"{}\" in term", self.tok.current_lexeme()),
                })
            }
        }
    }

    /// The identifier-led term cases: a bare variable, an array access, or
    /// one of the three subroutine-call forms. Distinguishing them needs
    /// exactly the one-symbol lookahead the spec calls out (`[`, `.`, `(`,
    /// or none of those).
    fn compile_identifier_term(&mut self) -> Result<(), CompileError> {
        let name = self.tok.current_lexeme().to_string();
        let resolved = self
            .resolve(&name)
            .map(|e| (segment_for(e.kind), e.index, e.type_name.clone()));

        if let Some((seg, idx, type_name)) = resolved {
            match self.tok.next_lexeme() {
                Some("[") => {
                    self.advance(); // over name
                    self.advance(); // over '['
                    self.compile_expression()?;
                    self.expect_symbol("]")?;
                    self.emit().write_push(seg, idx);
                    self.emit().write_binary(BinaryOp::Add);
                    self.emit().write_pop(Segment::Pointer, 1);
                    self.emit().write_push(Segment::That, 0);
                    Ok(())
                }
                Some(".") => {
                    self.emit().write_push(seg, idx);
                    self.advance(); // over name
                    self.advance(); // over '.'
                    let sub_name = self.ident()?;
                    self.expect_symbol("(")?;
                    let n_args = self.compile_expression_list()?;
                    self.emit().write_call(&format!("{type_name}.{sub_name}"), n_args + 1);
                    self.expect_symbol(")")?;
                    Ok(())
                }
                _ => {
                    self.emit().write_push(seg, idx);
                    self.advance();
                    Ok(())
                }
            }
        } else {
            match self.tok.next_lexeme() {
                Some("(") => {
                    self.advance(); // over name
                    self.advance(); // over '('
                    self.emit().write_push(Segment::Pointer, 0);
                    let n_args = self.compile_expression_list()?;
                    self.emit()
                        .write_call(&format!("{}.{name}", self.class_name), n_args + 1);
                    self.expect_symbol(")")?;
                    Ok(())
                }
                Some(".") => {
                    self.advance(); // over name
                    self.advance(); // over '.'
                    let sub_name = self.ident()?;
                    self.expect_symbol("(")?;
                    let n_args = self.compile_expression_list()?;
                    self.emit().write_call(&format!("{name}.{sub_name}"), n_args);
                    self.expect_symbol(")")?;
                    Ok(())
                }
                _ => {
                    let line = self.tok_line();
                    Err(CompileError::UnknownName { name, line })
                }
            }
        }
    }

    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        let mut count = 0u16;
        while !self.current_is_symbol(")") {
            self.compile_expression()?;
            count += 1;
            if self.current_is_symbol(",") {
                self.advance();
            }
        }
        Ok(count)
    }

    // --- small parsing primitives -------------------------------------

    fn resolve(&self, name: &str) -> Option<&Entry> {
        self.subroutine_scope.get(name).or_else(|| self.class_scope.get(name))
    }

    fn type_name(&mut self) -> Result<String, CompileError> {
        if !self.tok.has_more() {
            return Err(self.eof_error());
        }
        let t = self.tok.current_lexeme().to_string();
        self.advance();
        Ok(t)
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        if !self.tok.has_more() {
            return Err(self.eof_error());
        }
        if self.tok.current_kind() != TokenKind::Identifier {
            let line = self.tok_line();
            return Err(CompileError::Syntax {
                line,
                message: format!("expected identifier, found \"{}\"", self.tok.current_lexeme()),
            });
        }
        let name = self.tok.current_lexeme().to_string();
        self.advance();
        Ok(name)
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), CompileError> {
        if !self.at_keyword(kw) {
            return Err(self.mismatch_error(kw));
        }
        self.advance();
        Ok(())
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), CompileError> {
        if !self.current_is_symbol(sym) {
            return Err(self.mismatch_error(sym));
        }
        self.advance();
        Ok(())
    }

    fn mismatch_error(&self, expected: &str) -> CompileError {
        if !self.tok.has_more() {
            return self.eof_error();
        }
        CompileError::Syntax {
            line: self.tok_line(),
            message: format!("expected \"{expected}\", found \"{}\"", self.tok.current_lexeme()),
        }
    }

    fn eof_error(&self) -> CompileError {
        CompileError::Syntax {
            line: self.last_line,
            message: "unexpected end of input".to_string(),
        }
    }

    fn at_keyword(&self, kw: &str) -> bool {
        self.tok.has_more() && self.tok.current_kind() == TokenKind::Keyword && self.tok.current_lexeme() == kw
    }

    fn at_any_keyword(&self, kws: &[&str]) -> bool {
        self.tok.has_more() && self.tok.current_kind() == TokenKind::Keyword && kws.contains(&self.tok.current_lexeme())
    }

    fn current_is_symbol(&self, sym: &str) -> bool {
        self.tok.has_more() && self.tok.current_kind() == TokenKind::Symbol && self.tok.current_lexeme() == sym
    }

    fn tok_line(&self) -> usize {
        if self.tok.has_more() {
            self.tok.current_line()
        } else {
            self.last_line
        }
    }

    /// Advances the tokenizer, remembering the line just consumed so an
    /// end-of-input error reported right after still names a real line.
    fn advance(&mut self) {
        self.last_line = self.tok.current_line();
        self.tok.advance();
    }

    fn next_label(&mut self, prefix: &str) -> String {
        let label = format!("{prefix}{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn emit(&mut self) -> VmWriter<'_> {
        VmWriter::new(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> String {
        let tok = Tokenizer::from_source(src).expect("tokenize should succeed");
        let mut engine = Engine::new(tok);
        engine.compile_class().expect("compile should succeed");
        engine.into_output()
    }

    fn lines(src: &str) -> Vec<String> {
        compile(src).lines().map(str::to_string).collect()
    }

    #[test]
    fn constructor_allocates_and_returns_this() {
        let out = lines(
            "class Point {
                field int x, y;
                constructor Point new() {
                    return this;
                }
            }",
        );
        assert_eq!(
            out,
            vec![
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn method_prologue_rebinds_this_from_argument_zero() {
        let out = lines(
            "class Point {
                field int x;
                method int getX() {
                    return x;
                }
            }",
        );
        assert_eq!(
            out,
            vec![
                "function Point.getX 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "return",
            ]
        );
    }

    #[test]
    fn array_assignment_uses_temp_stash_sequence() {
        let out = lines(
            "class Main {
                function void run() {
                    var Array a;
                    var int i, j;
                    let a[i] = a[j];
                    return;
                }
            }",
        );
        assert_eq!(
            out,
            vec![
                "function Main.run 3",
                "push local 1",
                "push local 0",
                "add",
                "push local 2",
                "push local 0",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn left_to_right_evaluation_ignores_precedence() {
        let out = lines(
            "class Main {
                function void run() {
                    var int x;
                    let x = 1 + 2 * 3;
                    return;
                }
            }",
        );
        assert_eq!(
            out,
            vec![
                "function Main.run 1",
                "push constant 1",
                "push constant 2",
                "add",
                "push constant 3",
                "call Math.multiply 2",
                "pop local 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn string_literal_builds_char_by_char() {
        let out = lines(
            r#"class Main {
                function void run() {
                    do Output.printString("Hi");
                    return;
                }
            }"#,
        );
        assert_eq!(
            out,
            vec![
                "function Main.run 0",
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn if_else_pairs_exactly_two_labels() {
        let out = lines(
            "class Main {
                function void run() {
                    var int a;
                    if (a) {
                        let a = 1;
                    } else {
                        let a = 2;
                    }
                    return;
                }
            }",
        );
        let labels: Vec<&str> = out.iter().filter(|l| l.starts_with("label")).map(String::as_str).collect();
        assert_eq!(labels, vec!["label ifLbl0", "label ifLbl1"]);
        // false branch sits between the two branches, end label after both
        assert!(out.iter().position(|l| l == "label ifLbl0").unwrap()
            < out.iter().rposition(|l| l.contains("pop local 0")).unwrap());
    }

    #[test]
    fn nested_while_loops_do_not_collide_on_labels() {
        let out = lines(
            "class Main {
                function void run() {
                    var int i, j;
                    while (i) {
                        while (j) {
                            let i = 0;
                        }
                    }
                    return;
                }
            }",
        );
        let labels: Vec<&str> = out.iter().filter(|l| l.starts_with("label")).map(String::as_str).collect();
        assert_eq!(
            labels,
            vec!["label whileLbl0", "label whileLbl2", "label whileLbl3", "label whileLbl1"]
        );
    }

    #[test]
    fn void_return_pushes_constant_zero() {
        let out = lines(
            "class Main {
                function void run() {
                    return;
                }
            }",
        );
        assert_eq!(out, vec!["function Main.run 0", "push constant 0", "return"]);
    }

    #[test]
    fn method_with_no_locals_emits_zero_locals() {
        let out = lines(
            "class Main {
                method void tick() {
                    return;
                }
            }",
        );
        assert_eq!(out[0], "function Main.tick 0");
    }

    #[test]
    fn empty_parameter_and_expression_lists() {
        let out = lines(
            "class Main {
                function void run() {
                    do Main.helper();
                    return;
                }
            }",
        );
        assert!(out.contains(&"call Main.helper 0".to_string()));
    }

    #[test]
    fn static_function_call_vs_method_call_on_variable() {
        let out = lines(
            "class Main {
                function void run() {
                    var Point p;
                    do p.move();
                    do Memory.alloc(1);
                    return;
                }
            }",
        );
        assert!(out.contains(&"push local 0".to_string()));
        assert!(out.contains(&"call Point.move 1".to_string()));
        assert!(out.contains(&"call Memory.alloc 1".to_string()));
    }

    #[test]
    fn unknown_name_in_let_target_is_an_error() {
        let tok = Tokenizer::from_source(
            "class Main {
                function void run() {
                    let nope = 1;
                    return;
                }
            }",
        )
        .unwrap();
        let mut engine = Engine::new(tok);
        let err = engine.compile_class().unwrap_err();
        assert!(matches!(err, CompileError::UnknownName { name, .. } if name == "nope"));
    }

    #[test]
    fn keyword_constants_compile_to_constant_pushes() {
        let out = lines(
            "class Main {
                function boolean run() {
                    var boolean t, f, n;
                    let t = true;
                    let f = false;
                    let n = null;
                    return t;
                }
            }",
        );
        assert!(out
            .windows(2)
            .any(|w| w[0] == "push constant 0" && w[1] == "not"));
        assert!(out.contains(&"push constant 0".to_string()));
    }

    #[test]
    fn translating_same_source_twice_is_byte_identical() {
        let src = "class Main { function void run() { return; } }";
        assert_eq!(compile(src), compile(src));
    }
}
