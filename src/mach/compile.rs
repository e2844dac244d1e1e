use super::expr;
use super::opcode::{Inst, Opcode};
use super::policy::{MAX_DELAY_MS, MAX_EMIT, MAX_EXPR_TOKENS, MAX_LINE_LEN, Policy};
use super::program::Program;
use super::strings::StringTable;
use super::Address;
use crate::lang::{self, Error, Operator, Token, MAX_EXPR_LEN};
use std::collections::HashMap;

/// ## Line compiler
///
/// Walks the source one line at a time, dispatching on the first word.
/// Structured forms are handled with explicit patch stacks: `if`/`else`
/// leave forward branches to fix up, `for`/`endfor` leave the loop-exit
/// branch. Compilation pushes diagnostics and keeps going; only the
/// offending line loses its emission.
pub fn compile(source: &str, policy: &Policy) -> Program {
    let mut compiler = Compiler::new(policy);
    let mut line_number = 0;
    for line in source.split('\n') {
        line_number += 1;
        compiler.line(line.strip_suffix('\r').unwrap_or(line), line_number);
    }
    compiler.finish(line_number)
}

/// One open `for`: where to jump back to, and which branch to patch at
/// `endfor`.
#[derive(Debug)]
struct LoopFrame {
    var: String,
    header: Address,
    exit_branch: Address,
}

/// Type of a variable's last literal assignment, tracked so `endfor` can
/// pick the step constant. Only pure literal `set`s update this; a
/// computed assignment keeps the previous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LitKind {
    Int,
    Float,
    Str,
}

struct Compiler<'a> {
    policy: &'a Policy,
    code: Vec<Inst>,
    strings: StringTable,
    if_stack: Vec<Address>,
    loop_stack: Vec<LoopFrame>,
    literals: HashMap<String, LitKind>,
    errors: Vec<Error>,
    full: bool,
}

impl<'a> Compiler<'a> {
    fn new(policy: &'a Policy) -> Compiler<'a> {
        Compiler {
            policy,
            code: vec![],
            strings: StringTable::new(policy.max_string_length()),
            if_stack: vec![],
            loop_stack: vec![],
            literals: HashMap::new(),
            errors: vec![],
            full: false,
        }
    }

    fn finish(mut self, last_line: usize) -> Program {
        if !self.if_stack.is_empty() {
            self.error(error!(UnclosedBlock, last_line; "IF WITHOUT ENDIF"));
        }
        if !self.loop_stack.is_empty() {
            self.error(error!(UnclosedBlock, last_line; "FOR WITHOUT ENDFOR"));
        }
        if self.code.last().map(|inst| inst.opcode) != Some(Opcode::Halt as u8) {
            self.emit(Inst::op(Opcode::Halt));
        }
        Program::new(self.code, self.strings, self.errors)
    }

    fn error(&mut self, error: Error) {
        self.errors.push(error);
    }

    fn here(&self) -> Address {
        self.code.len()
    }

    fn emit(&mut self, inst: Inst) {
        if self.code.len() >= MAX_EMIT {
            if !self.full {
                self.full = true;
                self.error(error!(ProgramTooLarge));
            }
            return;
        }
        self.code.push(inst);
    }

    fn patch(&mut self, branch: Address, target: Address) {
        if let Some(inst) = self.code.get_mut(branch) {
            inst.arg1 = target as u32;
        }
    }

    fn intern(&mut self, s: &str) -> u16 {
        match self.strings.intern(s) {
            Ok(idx) => idx,
            Err(e) => {
                self.error(e);
                0
            }
        }
    }

    fn valid_variable(&self, name: &str) -> bool {
        lang::is_valid_variable(name, self.policy.max_variable_name_length())
    }

    fn line(&mut self, line: &str, ln: usize) {
        let cleaned = lang::clean_line(line);
        if cleaned.is_empty() {
            return;
        }
        if cleaned.len() > MAX_LINE_LEN {
            self.error(error!(LineTooLong, ln));
            return;
        }
        let (command, args) = lang::split_command(cleaned);
        match command.as_str() {
            "print" => self.r#print(args, ln),
            "printnum" => self.emit(Inst::op(Opcode::PrintNum)),
            "led" => self.r#led(args, ln),
            "delay" => self.r#delay(args, ln),
            "push" => self.r#push(args, ln),
            "pop" => self.emit(Inst::op(Opcode::Pop)),
            "add" => self.emit(Inst::op(Opcode::Add)),
            "sub" => self.emit(Inst::op(Opcode::Sub)),
            "mul" => self.emit(Inst::op(Opcode::Mul)),
            "div" => self.emit(Inst::op(Opcode::Div)),
            "mod" => self.emit(Inst::op(Opcode::Mod)),
            "abs" => self.emit(Inst::op(Opcode::Abs)),
            "pow" => self.emit(Inst::op(Opcode::Pow)),
            "max" => self.emit(Inst::op(Opcode::Max)),
            "min" => self.emit(Inst::op(Opcode::Min)),
            "sqrt" => self.emit(Inst::op(Opcode::Sqrt)),
            "input" => self.r#input(args, ln),
            "set" => self.r#set(args, ln),
            "if" => self.r#if(args, ln),
            "else" => self.r#else(ln),
            "endif" => self.r#endif(ln),
            "for" => self.r#for(args, ln),
            "endfor" => self.r#endfor(ln),
            "halt" => self.emit(Inst::op(Opcode::Halt)),
            _ => self.error(error!(UnknownCommand, ln; "{}", command)),
        }
    }

    /// `print "literal"` or `print $var`.
    fn r#print(&mut self, args: &str, ln: usize) {
        if let Some(var) = args.strip_prefix('$') {
            if !self.valid_variable(var) {
                self.error(error!(InvalidVariableName, ln; "{}", var));
                return;
            }
            let idx = self.intern(var);
            self.emit(Inst::new(Opcode::Load, idx as u32));
            self.emit(Inst::op(Opcode::PrintNum));
            return;
        }
        let mut text = args;
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            text = &text[1..text.len() - 1];
        }
        let text = if text.len() > self.policy.max_string_length() {
            self.error(error!(StringTooLong, ln));
            ""
        } else {
            text
        };
        let idx = self.intern(text);
        self.emit(Inst::new(Opcode::Print, idx as u32));
    }

    fn r#led(&mut self, args: &str, ln: usize) {
        let (pin_str, state) = match args.split_once(char::is_whitespace) {
            Some(pair) => pair,
            None => {
                self.error(error!(SyntaxError, ln; "LED NEEDS PIN AND STATE"));
                return;
            }
        };
        let pin = match pin_str.trim().parse::<i32>() {
            Ok(pin) if (0..=255).contains(&pin) => pin as u32,
            _ => {
                self.error(error!(SyntaxError, ln; "INVALID PIN NUMBER"));
                return;
            }
        };
        match state.trim().to_ascii_lowercase().as_str() {
            "on" | "1" => self.emit(Inst::new(Opcode::LedOn, pin)),
            "off" | "0" => self.emit(Inst::new(Opcode::LedOff, pin)),
            _ => self.error(error!(SyntaxError, ln; "UNKNOWN LED STATE")),
        }
    }

    fn r#delay(&mut self, args: &str, ln: usize) {
        let ms = match args.parse::<i64>() {
            Ok(ms) => ms,
            Err(_) => {
                self.error(error!(SyntaxError, ln; "INVALID DELAY"));
                return;
            }
        };
        let ms = if !(0..=MAX_DELAY_MS as i64).contains(&ms) {
            self.error(error!(DelayTooLong, ln));
            ms.clamp(0, MAX_DELAY_MS as i64)
        } else {
            ms
        };
        self.emit(Inst::new(Opcode::Delay, ms as u32));
    }

    /// Bare stack push; the argument's shape picks the opcode.
    fn r#push(&mut self, args: &str, ln: usize) {
        if self.valid_variable(args) {
            let idx = self.intern(args);
            self.emit(Inst::new(Opcode::Load, idx as u32));
        } else if let Some(value) = lang::parse_float_literal(args) {
            self.emit(Inst::float(value));
        } else if args.len() >= 2 && args.starts_with('"') && args.ends_with('"') {
            let text = &args[1..args.len() - 1];
            let idx = self.intern(text);
            self.emit(Inst::new(Opcode::PushString, idx as u32));
        } else if let Some(value) = lang::parse_int_literal(args) {
            self.emit(Inst::int(value));
        } else {
            self.error(error!(SyntaxError, ln; "INVALID PUSH ARGUMENT"));
        }
    }

    fn r#input(&mut self, args: &str, ln: usize) {
        if !self.valid_variable(args) {
            self.error(error!(InvalidVariableName, ln; "{}", args));
            return;
        }
        let idx = self.intern(args);
        self.emit(Inst::new(Opcode::Input, idx as u32));
    }

    fn r#set(&mut self, args: &str, ln: usize) {
        let (var, expression) = match args.split_once(char::is_whitespace) {
            Some((var, expression)) => (var, expression.trim()),
            None => {
                self.error(error!(SyntaxError, ln; "SET NEEDS VARIABLE AND EXPRESSION"));
                return;
            }
        };
        if !self.valid_variable(var) {
            self.error(error!(InvalidVariableName, ln; "{}", var));
            return;
        }
        self.record_literal(var, expression);
        if !self.expression(expression, ln) {
            return;
        }
        let idx = self.intern(var);
        self.emit(Inst::new(Opcode::Store, idx as u32));
    }

    fn record_literal(&mut self, var: &str, expression: &str) {
        let kind = if lang::is_integer(expression) {
            LitKind::Int
        } else if lang::is_float(expression) {
            LitKind::Float
        } else if expression.starts_with('"') && expression.ends_with('"') && expression.len() >= 2
        {
            LitKind::Str
        } else {
            return;
        };
        self.literals.insert(var.to_string(), kind);
    }

    fn r#if(&mut self, args: &str, ln: usize) {
        if self.if_stack.len() >= self.policy.max_if_depth() {
            self.error(error!(NestingTooDeep, ln; "IF"));
            return;
        }
        let condition = match args.find(" then") {
            Some(pos) if pos > 0 => args[..pos].trim(),
            _ => {
                self.error(error!(SyntaxError, ln; "IF NEEDS THEN"));
                return;
            }
        };
        if !self.expression(condition, ln) {
            return;
        }
        let branch = self.here();
        self.emit(Inst::new(Opcode::JumpIf, 0));
        self.if_stack.push(branch);
    }

    fn r#else(&mut self, ln: usize) {
        let pending = match self.if_stack.pop() {
            Some(addr) => addr,
            None => {
                self.error(error!(ElseWithoutIf, ln));
                return;
            }
        };
        let else_jump = self.here();
        self.emit(Inst::new(Opcode::Jump, 0));
        // The taken branch of the condition lands just past this jump.
        let target = self.here();
        self.patch(pending, target);
        self.if_stack.push(else_jump);
    }

    fn r#endif(&mut self, ln: usize) {
        match self.if_stack.pop() {
            Some(pending) => {
                let target = self.here();
                self.patch(pending, target);
            }
            None => self.error(error!(EndifWithoutIf, ln)),
        }
    }

    fn r#for(&mut self, args: &str, ln: usize) {
        if self.loop_stack.len() >= self.policy.max_for_depth() {
            self.error(error!(NestingTooDeep, ln; "FOR"));
            return;
        }
        let (eq, to) = match (args.find('='), args.find(" to ")) {
            (Some(eq), Some(to)) if to > eq => (eq, to),
            _ => {
                self.error(error!(SyntaxError, ln; "FOR NEEDS '=' AND 'TO'"));
                return;
            }
        };
        let var = args[..eq].trim().to_string();
        if !self.valid_variable(&var) {
            self.error(error!(InvalidVariableName, ln; "{}", var));
            return;
        }
        let start = args[eq + 1..to].trim();
        let end = args[to + 4..].trim().to_string();

        if !self.expression(start, ln) {
            return;
        }
        let var_idx = self.intern(&var);
        self.emit(Inst::new(Opcode::Store, var_idx as u32));

        let header = self.here();
        self.emit(Inst::new(Opcode::Load, var_idx as u32));
        if !self.expression(&end, ln) {
            return;
        }
        self.emit(Inst::op(Opcode::Lte));
        let exit_branch = self.here();
        self.emit(Inst::new(Opcode::JumpIf, 0));
        self.loop_stack.push(LoopFrame {
            var,
            header,
            exit_branch,
        });
    }

    fn r#endfor(&mut self, ln: usize) {
        let frame = match self.loop_stack.pop() {
            Some(frame) => frame,
            None => {
                self.error(error!(EndforWithoutFor, ln));
                return;
            }
        };
        let var_idx = self.intern(&frame.var);
        self.emit(Inst::new(Opcode::Load, var_idx as u32));
        // The step stays integer unless the induction variable's last
        // literal assignment was a float. Float bounds alone do not
        // change it.
        if self.literals.get(&frame.var) == Some(&LitKind::Float) {
            self.emit(Inst::float(1.0));
        } else {
            self.emit(Inst::int(1));
        }
        self.emit(Inst::op(Opcode::Add));
        self.emit(Inst::new(Opcode::Store, var_idx as u32));
        self.emit(Inst::new(Opcode::Jump, frame.header as u32));
        let target = self.here();
        self.patch(frame.exit_branch, target);
    }

    /// Compiles one expression: function rewrite, tokenize, postfix,
    /// then an emission per postfix token. On failure anything already
    /// emitted for the expression is rolled back and false comes back,
    /// so the caller skips the rest of the line.
    fn expression(&mut self, expression: &str, ln: usize) -> bool {
        if expression.is_empty() || expression.len() > MAX_EXPR_LEN {
            self.error(error!(ExpressionTooLong, ln));
            return false;
        }
        let rewritten = match expr::rewrite(expression, self.policy.max_expression_depth()) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                self.error(e.in_line(ln));
                return false;
            }
        };
        let tokens = match lang::tokenize(&rewritten) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.error(e.in_line(ln));
                return false;
            }
        };
        let postfix = match expr::to_postfix(tokens) {
            Ok(postfix) => postfix,
            Err(e) => {
                self.error(e.in_line(ln));
                return false;
            }
        };
        if postfix.len() > MAX_EXPR_TOKENS {
            self.error(error!(TooManyTokens, ln));
            return false;
        }
        let mark = self.code.len();
        for token in postfix {
            if !self.postfix_token(token, ln) {
                self.code.truncate(mark);
                return false;
            }
        }
        true
    }

    fn postfix_token(&mut self, token: Token, ln: usize) -> bool {
        match token {
            Token::Integer(value) => self.emit(Inst::int(value)),
            Token::Float(value) => self.emit(Inst::float(value)),
            Token::Str(text) => {
                let text = if text.len() > self.policy.max_string_length() {
                    self.error(error!(StringTooLong, ln));
                    String::new()
                } else {
                    text
                };
                let idx = self.intern(&text);
                self.emit(Inst::new(Opcode::PushString, idx as u32));
            }
            Token::Ident(name) => {
                if !self.valid_variable(&name) {
                    self.error(error!(InvalidVariableName, ln; "{}", name));
                    return false;
                }
                let idx = self.intern(&name);
                self.emit(Inst::new(Opcode::Load, idx as u32));
            }
            Token::Operator(op) => self.emit(Inst::op(operator_opcode(op))),
            Token::Abs(body) => {
                if !self.expression(&body, ln) {
                    return false;
                }
                self.emit(Inst::op(Opcode::Abs));
            }
            Token::Sqrt(body) => {
                if !self.expression(&body, ln) {
                    return false;
                }
                self.emit(Inst::op(Opcode::Sqrt));
            }
            Token::Max(body) => return self.two_argument(&body, Opcode::Max, ln),
            Token::Min(body) => return self.two_argument(&body, Opcode::Min, ln),
            Token::LParen | Token::RParen => {}
        }
        true
    }

    fn two_argument(&mut self, body: &str, op: Opcode, ln: usize) -> bool {
        match expr::split_arguments(body) {
            Some((first, second)) => {
                if !self.expression(first, ln) {
                    return false;
                }
                if !self.expression(second, ln) {
                    return false;
                }
                self.emit(Inst::op(op));
                true
            }
            None => {
                self.error(error!(SyntaxError, ln; "{} REQUIRES TWO ARGUMENTS", op));
                false
            }
        }
    }
}

fn operator_opcode(op: Operator) -> Opcode {
    match op {
        Operator::Add => Opcode::Add,
        Operator::Subtract => Opcode::Sub,
        Operator::Multiply => Opcode::Mul,
        Operator::Divide => Opcode::Div,
        Operator::Modulo => Opcode::Mod,
        Operator::Power => Opcode::Pow,
        Operator::Equal => Opcode::Eq,
        Operator::NotEqual => Opcode::Neq,
        Operator::Less => Opcode::Lt,
        Operator::Greater => Opcode::Gt,
        Operator::LessEqual => Opcode::Lte,
        Operator::GreaterEqual => Opcode::Gte,
    }
}
