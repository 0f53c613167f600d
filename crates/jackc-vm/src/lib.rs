//! Textual VM instruction emitter.
//!
//! Stateless translator from the abstract VM operations the compilation
//! engine issues to the textual instruction lines the spec's output format
//! describes. Holds no state of its own beyond the output buffer: segment
//! selection, argument counts, and label names are all decided by the
//! caller.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };
        f.write_str(s)
    }
}

/// A binary operator as it appears in source (`+ - * / & | = > <`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    And,
    Or,
    Eq,
    Gt,
    Lt,
    Multiply,
    Divide,
}

/// A unary operator as it appears in source (`- ~`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Appends VM instruction text to `out`, one instruction per `\n`-terminated
/// line. No state is kept between calls - every method takes exactly the
/// operands it needs to produce one line (or, for `*`/`/`, one `call` line
/// standing in for the opcode the target VM doesn't have in hardware).
pub struct VmWriter<'a> {
    out: &'a mut String,
}

impl<'a> VmWriter<'a> {
    pub fn new(out: &'a mut String) -> Self {
        Self { out }
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.line(format_args!("push {segment} {index}"));
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.line(format_args!("pop {segment} {index}"));
    }

    pub fn write_label(&mut self, label: &str) {
        self.line(format_args!("label {label}"));
    }

    pub fn write_goto(&mut self, label: &str) {
        self.line(format_args!("goto {label}"));
    }

    pub fn write_if_goto(&mut self, label: &str) {
        self.line(format_args!("if-goto {label}"));
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) {
        self.line(format_args!("call {name} {n_args}"));
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) {
        self.line(format_args!("function {name} {n_locals}"));
    }

    pub fn write_return(&mut self) {
        self.line(format_args!("return"));
    }

    /// `*` and `/` have no hardware opcode on the target VM and compile to
    /// two-argument calls into `Math`; every other operator is a plain
    /// opcode line.
    pub fn write_binary(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => self.line(format_args!("add")),
            BinaryOp::Sub => self.line(format_args!("sub")),
            BinaryOp::And => self.line(format_args!("and")),
            BinaryOp::Or => self.line(format_args!("or")),
            BinaryOp::Eq => self.line(format_args!("eq")),
            BinaryOp::Gt => self.line(format_args!("gt")),
            BinaryOp::Lt => self.line(format_args!("lt")),
            BinaryOp::Multiply => self.write_call("Math.multiply", 2),
            BinaryOp::Divide => self.write_call("Math.divide", 2),
        }
    }

    pub fn write_unary(&mut self, op: UnaryOp) {
        match op {
            UnaryOp::Neg => self.line(format_args!("neg")),
            UnaryOp::Not => self.line(format_args!("not")),
        }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        use fmt::Write as _;
        writeln!(self.out, "{args}").expect("writing to an in-memory String cannot fail");
    }
}

/// Parses a source-level binary operator symbol (one of `+-*/&|=><`).
pub fn binary_op_from_symbol(symbol: &str) -> Option<BinaryOp> {
    match symbol {
        "+" => Some(BinaryOp::Add),
        "-" => Some(BinaryOp::Sub),
        "&" => Some(BinaryOp::And),
        "|" => Some(BinaryOp::Or),
        "=" => Some(BinaryOp::Eq),
        ">" => Some(BinaryOp::Gt),
        "<" => Some(BinaryOp::Lt),
        "*" => Some(BinaryOp::Multiply),
        "/" => Some(BinaryOp::Divide),
        _ => None,
    }
}

/// Parses a source-level unary operator symbol (one of `-~`).
pub fn unary_op_from_symbol(symbol: &str) -> Option<UnaryOp> {
    match symbol {
        "-" => Some(UnaryOp::Neg),
        "~" => Some(UnaryOp::Not),
        _ => None,
    }
}
