/// Diagnostic for a compile, verify, or runtime failure.
///
/// Errors never unwind through the machine; they are rendered to the host
/// error channel and execution recovers or stops as the situation demands.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    line: Option<usize>,
    message: Option<String>,
}

/// Builds an [`Error`] from an [`ErrorCode`], with optional source line
/// and detail message: `error!(Overflow)`, `error!(SyntaxError, line)`,
/// `error!(DivisionByZero; "IN STEP EXPRESSION")`.
macro_rules! error {
    ($code:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code)
    };
    ($code:ident, $line:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code).in_line($line)
    };
    ($code:ident; $($arg:tt)*) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code).with_message(format!($($arg)*))
    };
    ($code:ident, $line:expr; $($arg:tt)*) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code)
            .in_line($line)
            .with_message(format!($($arg)*))
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            line: None,
            message: None,
        }
    }

    pub fn in_line(mut self, line: usize) -> Error {
        self.line = Some(line);
        self
    }

    pub fn with_message(mut self, message: String) -> Error {
        self.message = Some(message);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Compile diagnostics
    SyntaxError,
    UnknownCommand,
    InvalidVariableName,
    ExpressionTooLong,
    ExpressionTooDeep,
    TooManyTokens,
    LiteralOutOfRange,
    NestingTooDeep,
    ElseWithoutIf,
    EndifWithoutIf,
    EndforWithoutFor,
    UnclosedBlock,
    StringTooLong,
    LineTooLong,

    // Verifier rejections
    ProgramTooLarge,
    StringTableOverflow,
    InvalidOpcode,
    InvalidJumpTarget,
    InvalidStringIndex,
    PinNotAllowed,
    DelayTooLong,
    MissingHalt,

    // Runtime arithmetic
    Overflow,
    DivisionByZero,
    ModuloByZero,
    TypeMismatch,
    SqrtOfNegative,

    // Runtime structural
    StackOverflow,
    StackUnderflow,
    VariableNotFound,

    // Budgets
    InstructionLimit,
    IterationLimit,
    InputTimeout,

    // Configuration
    InvalidConfig,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorCode::*;
        let s = match self.code {
            SyntaxError => "SYNTAX ERROR",
            UnknownCommand => "UNKNOWN COMMAND",
            InvalidVariableName => "INVALID VARIABLE NAME",
            ExpressionTooLong => "EXPRESSION TOO LONG",
            ExpressionTooDeep => "EXPRESSION TOO DEEP",
            TooManyTokens => "TOO MANY TOKENS",
            LiteralOutOfRange => "LITERAL OUT OF RANGE",
            NestingTooDeep => "NESTING TOO DEEP",
            ElseWithoutIf => "ELSE WITHOUT IF",
            EndifWithoutIf => "ENDIF WITHOUT IF",
            EndforWithoutFor => "ENDFOR WITHOUT FOR",
            UnclosedBlock => "UNCLOSED BLOCK",
            StringTooLong => "STRING TOO LONG",
            LineTooLong => "LINE TOO LONG",
            ProgramTooLarge => "PROGRAM TOO LARGE",
            StringTableOverflow => "STRING TABLE OVERFLOW",
            InvalidOpcode => "INVALID OPCODE",
            InvalidJumpTarget => "INVALID JUMP TARGET",
            InvalidStringIndex => "INVALID STRING INDEX",
            PinNotAllowed => "PIN NOT ALLOWED",
            DelayTooLong => "DELAY TOO LONG",
            MissingHalt => "MISSING HALT",
            Overflow => "OVERFLOW",
            DivisionByZero => "DIVISION BY ZERO",
            ModuloByZero => "MODULO BY ZERO",
            TypeMismatch => "TYPE MISMATCH",
            SqrtOfNegative => "SQUARE ROOT OF NEGATIVE",
            StackOverflow => "STACK OVERFLOW",
            StackUnderflow => "STACK UNDERFLOW",
            VariableNotFound => "VARIABLE NOT FOUND",
            InstructionLimit => "INSTRUCTION LIMIT EXCEEDED",
            IterationLimit => "ITERATION LIMIT EXCEEDED",
            InputTimeout => "INPUT TIMEOUT",
            InvalidConfig => "INVALID CONFIGURATION",
        };
        write!(f, "{}", s)?;
        if let Some(message) = &self.message {
            write!(f, "; {}", message)?;
        }
        if let Some(line) = self.line {
            write!(f, " IN LINE {}", line)?;
        }
        Ok(())
    }
}
