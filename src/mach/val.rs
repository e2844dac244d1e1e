use super::strings::StringTable;
use crate::lang::Error;

/// ## Runtime stack values
///
/// Values are small and freely copied. A `Str` value does not own any
/// text; it references an entry in the intern table, which never frees
/// or reorders entries while a program is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Val {
    Int(i32),
    Float(f32),
    Str(u16),
}

/// Comparison selector shared by the six comparison opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

/// Result of an arithmetic step: the value to push, plus the diagnostic
/// to report when the operation had to fall back to a neutral result.
/// Execution always continues; only stack discipline failures stop the VM.
pub type Outcome = (Val, Option<Error>);

impl Val {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Val::Int(_) | Val::Float(_))
    }

    fn as_float(&self) -> f32 {
        match self {
            Val::Int(n) => *n as f32,
            Val::Float(n) => *n,
            Val::Str(_) => 0.0,
        }
    }

    /// Text form used for concatenation: integers in decimal, floats with
    /// three fractional digits, strings verbatim.
    pub fn text(&self, strings: &StringTable) -> String {
        match self {
            Val::Int(n) => format!("{}", n),
            Val::Float(n) => format!("{:.3}", n),
            Val::Str(idx) => strings.get(*idx).unwrap_or("").to_string(),
        }
    }

    pub fn truthy(&self, strings: &StringTable) -> bool {
        match self {
            Val::Int(n) => *n != 0,
            Val::Float(n) => *n != 0.0,
            Val::Str(idx) => !strings.get(*idx).unwrap_or("").is_empty(),
        }
    }

    /// `+` doubles as string concatenation: one string operand coerces
    /// both sides to text and the joined result is interned.
    pub fn sum(lhs: Val, rhs: Val, strings: &mut StringTable) -> Outcome {
        use Val::*;
        if matches!(lhs, Str(_)) || matches!(rhs, Str(_)) {
            let joined = lhs.text(strings) + &rhs.text(strings);
            return match strings.intern(&joined) {
                Ok(idx) => (Str(idx), None),
                Err(e) => (Str(0), Some(e)),
            };
        }
        match (lhs, rhs) {
            (Int(l), Int(r)) => match l.checked_add(r) {
                Some(n) => (Int(n), None),
                None => (Int(0), Some(error!(Overflow))),
            },
            _ => (Float(lhs.as_float() + rhs.as_float()), None),
        }
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => match l.checked_sub(r) {
                Some(n) => (Int(n), None),
                None => (Int(0), Some(error!(Overflow))),
            },
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                (Float(lhs.as_float() - rhs.as_float()), None)
            }
            _ => (Int(0), None),
        }
    }

    pub fn multiply(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => match l.checked_mul(r) {
                Some(n) => (Int(n), None),
                None => (Int(0), Some(error!(Overflow))),
            },
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                (Float(lhs.as_float() * rhs.as_float()), None)
            }
            _ => (Int(0), None),
        }
    }

    pub fn divide(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => {
                if r == 0 {
                    (Int(0), Some(error!(DivisionByZero)))
                } else {
                    match l.checked_div(r) {
                        Some(n) => (Int(n), None),
                        None => (Int(0), Some(error!(Overflow))),
                    }
                }
            }
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                let divisor = rhs.as_float();
                if divisor == 0.0 {
                    (Float(0.0), Some(error!(DivisionByZero)))
                } else {
                    (Float(lhs.as_float() / divisor), None)
                }
            }
            _ => (Int(0), None),
        }
    }

    pub fn modulo(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => {
                if r == 0 {
                    (Int(0), Some(error!(ModuloByZero)))
                } else {
                    // INT_MIN % -1 is the one rem that can overflow.
                    (Int(l.checked_rem(r).unwrap_or(0)), None)
                }
            }
            _ => (
                Int(0),
                Some(error!(TypeMismatch; "MODULO REQUIRES INTEGER OPERANDS")),
            ),
        }
    }

    pub fn power(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(base), Int(exp)) => {
                if exp < 0 {
                    return (Int(0), Some(error!(Overflow; "NEGATIVE EXPONENT")));
                }
                let mut result: i32 = 1;
                for _ in 0..exp {
                    result = match result.checked_mul(base) {
                        Some(n) => n,
                        None => return (Int(0), Some(error!(Overflow))),
                    };
                }
                (Int(result), None)
            }
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                (Float(lhs.as_float().powf(rhs.as_float())), None)
            }
            _ => (Int(0), None),
        }
    }

    pub fn magnitude(val: Val) -> Outcome {
        use Val::*;
        match val {
            Int(i32::MIN) => (Int(i32::MAX), Some(error!(Overflow))),
            Int(n) => (Int(n.abs()), None),
            Float(n) => (Float(n.abs()), None),
            Str(_) => (Int(0), None),
        }
    }

    pub fn root(val: Val) -> Outcome {
        use Val::*;
        match val {
            Int(n) if n < 0 => (Float(0.0), Some(error!(SqrtOfNegative))),
            Int(n) => (Float((n as f32).sqrt()), None),
            Float(n) if n < 0.0 => (Float(0.0), Some(error!(SqrtOfNegative))),
            Float(n) => (Float(n.sqrt()), None),
            Str(_) => (Int(0), None),
        }
    }

    /// `max`/`min` on two integers stay integer; any float operand
    /// promotes the result to float.
    pub fn largest(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => (Int(l.max(r)), None),
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                (Float(lhs.as_float().max(rhs.as_float())), None)
            }
            _ => (Int(0), None),
        }
    }

    pub fn smallest(lhs: Val, rhs: Val) -> Outcome {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => (Int(l.min(r)), None),
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                (Float(lhs.as_float().min(rhs.as_float())), None)
            }
            _ => (Int(0), None),
        }
    }

    /// Comparison truth, before the opcode inverts it for the stack.
    ///
    /// Equal types compare by value (strings by byte order); mixed numeric
    /// operands promote to float; any other mix is false.
    pub fn compare(lhs: Val, rhs: Val, cmp: Cmp, strings: &StringTable) -> bool {
        use Val::*;
        match (lhs, rhs) {
            (Int(l), Int(r)) => cmp_ord(l.cmp(&r), cmp),
            (Str(l), Str(r)) => {
                let l = strings.get(l).unwrap_or("");
                let r = strings.get(r).unwrap_or("");
                cmp_ord(l.cmp(r), cmp)
            }
            _ if lhs.is_numeric() && rhs.is_numeric() => {
                cmp_float(lhs.as_float(), rhs.as_float(), cmp)
            }
            _ => false,
        }
    }
}

fn cmp_ord(ord: std::cmp::Ordering, cmp: Cmp) -> bool {
    match cmp {
        Cmp::Eq => ord.is_eq(),
        Cmp::Neq => ord.is_ne(),
        Cmp::Lt => ord.is_lt(),
        Cmp::Gt => ord.is_gt(),
        Cmp::Lte => ord.is_le(),
        Cmp::Gte => ord.is_ge(),
    }
}

fn cmp_float(l: f32, r: f32, cmp: Cmp) -> bool {
    match cmp {
        Cmp::Eq => l == r,
        Cmp::Neq => l != r,
        Cmp::Lt => l < r,
        Cmp::Gt => l > r,
        Cmp::Lte => l <= r,
        Cmp::Gte => l >= r,
    }
}
