//! Lua 5.1 string library.
//!
//! Strings are UTF-8 `Rc<str>`; indices count bytes and a slice that splits
//! a multi-byte sequence is decoded lossily. `find` supports plain search
//! only.

use moonhost_vm::coerce;
use moonhost_vm::error::ErrorKind;
use moonhost_vm::{new_table, CallContext, FunctionSet, Kind, LuaError, State, TableRef, Value};

const STRING_FUNCS: FunctionSet<'static> = &[
    ("len", native_string_len),
    ("sub", native_string_sub),
    ("upper", native_string_upper),
    ("lower", native_string_lower),
    ("rep", native_string_rep),
    ("reverse", native_string_reverse),
    ("byte", native_string_byte),
    ("char", native_string_char),
    ("format", native_string_format),
    ("find", native_string_find),
];

/// Longest string `rep` will build.
const MAX_STRING_LEN: usize = i32::MAX as usize;

/// Register `string` and, unless the host already set one, give strings a
/// metatable whose `__index` is the library table.
pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    let string = state.register_module("string", STRING_FUNCS)?;
    if state.string_metatable().is_none() {
        let mt = new_table(0, 1);
        mt.borrow_mut()
            .raw_set_str("__index", Value::Table(string.clone()));
        state.set_string_metatable(Some(mt));
    }
    Ok(string)
}

/// Map a 1-based, possibly negative Lua index onto `0..=len`.
fn str_index(i: isize, len: usize) -> usize {
    if i > 0 {
        (i as usize - 1).min(len)
    } else if i < 0 {
        len.saturating_sub(i.unsigned_abs())
    } else {
        0
    }
}

/// Exclusive end for a 1-based inclusive, possibly negative, end index.
fn str_end(j: isize, len: usize) -> usize {
    if j >= 0 {
        (j as usize).min(len)
    } else {
        (len as isize + j + 1).max(0) as usize
    }
}

fn from_bytes(bytes: &[u8]) -> Value {
    Value::from(String::from_utf8_lossy(bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Simple transforms
// ---------------------------------------------------------------------------

fn native_string_len(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    Ok(vec![Value::from(s.len())])
}

fn native_string_sub(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    let i = ctx.opt_int(2, 1)?;
    let j = ctx.opt_int(3, -1)?;
    let bytes = s.as_bytes();
    let start = str_index(i, bytes.len());
    let end = str_end(j, bytes.len());
    if start >= end {
        return Ok(vec![Value::from("")]);
    }
    Ok(vec![from_bytes(&bytes[start..end])])
}

fn native_string_upper(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    Ok(vec![Value::from(s.to_ascii_uppercase())])
}

fn native_string_lower(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    Ok(vec![Value::from(s.to_ascii_lowercase())])
}

fn native_string_rep(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    let n = ctx.check_int(2)?;
    if n <= 0 {
        return Ok(vec![Value::from("")]);
    }
    let fits = s
        .len()
        .checked_mul(n as usize)
        .is_some_and(|total| total <= MAX_STRING_LEN);
    if !fits {
        return Err(ctx.state.raise(ErrorKind::Runtime, "resulting string too large"));
    }
    Ok(vec![Value::from(s.repeat(n as usize))])
}

fn native_string_reverse(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    let mut bytes = s.as_bytes().to_vec();
    bytes.reverse();
    Ok(vec![from_bytes(&bytes)])
}

fn native_string_byte(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    let i = ctx.opt_int(2, 1)?;
    let j = ctx.opt_int(3, i)?;
    let bytes = s.as_bytes();
    let start = str_index(i, bytes.len());
    let end = str_end(j, bytes.len());
    if start >= end {
        return Ok(vec![]);
    }
    Ok(bytes[start..end]
        .iter()
        .map(|b| Value::Number(*b as f64))
        .collect())
}

fn native_string_char(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let mut bytes = Vec::with_capacity(ctx.arg_count());
    for n in 1..=ctx.arg_count() {
        let c = ctx.check_int(n)?;
        if !(0..=255).contains(&c) {
            return Err(ctx.arg_error(n, "invalid value"));
        }
        bytes.push(c as u8);
    }
    Ok(vec![from_bytes(&bytes)])
}

// ---------------------------------------------------------------------------
// find (plain)
// ---------------------------------------------------------------------------

fn native_string_find(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let s = ctx.check_string(1)?;
    let pattern = ctx.check_string(2)?;
    let init = ctx.opt_int(3, 1)?;
    let haystack = s.as_bytes();
    let start = str_index(init, haystack.len());
    if start > haystack.len() {
        return Ok(vec![Value::Nil]);
    }
    let needle = pattern.as_bytes();
    let found = if needle.is_empty() {
        Some(start)
    } else {
        haystack[start..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|p| p + start)
    };
    Ok(match found {
        Some(p) => vec![Value::from(p + 1), Value::from(p + needle.len())],
        None => vec![Value::Nil],
    })
}

// ---------------------------------------------------------------------------
// format
// ---------------------------------------------------------------------------

/// A parsed `%[flags][width][.precision]` directive.
#[derive(Default)]
struct Directive {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

impl Directive {
    /// Pad `body` (sign included) out to the field width.
    fn pad(&self, body: String, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        if self.left {
            format!("{body}{}", " ".repeat(fill))
        } else if self.zero && numeric {
            let split = if body.starts_with(['-', '+', ' ']) { 1 } else { 0 };
            let (sign, digits) = body.split_at(split);
            format!("{sign}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }
}

/// Rust renders exponents as `e5`; C uses `e+05`.
fn fix_exponent(s: &str, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    match s.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp.trim_start_matches('+')),
            };
            format!("{mantissa}{e}{sign}{digits:0>2}")
        }
        None => s.to_string(),
    }
}

fn format_number_arg(ctx: &CallContext, n: usize) -> Result<f64, LuaError> {
    match coerce::to_number(&ctx.arg(n)) {
        Some(f) => Ok(f),
        None => Err(ctx.type_error(n, Kind::Number)),
    }
}

fn quote_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\000"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn native_string_format(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let fmt = ctx.check_string(1)?;
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();
    let mut arg = 1usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut d = Directive::default();
        while let Some(&f) = chars.peek() {
            match f {
                '-' => d.left = true,
                '+' => d.plus = true,
                ' ' => d.space = true,
                '0' => d.zero = true,
                '#' => d.alt = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            d.width = d.width * 10 + digit as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p * 10 + digit as usize;
                chars.next();
            }
            d.precision = Some(p);
        }
        if d.width > 99 || d.precision.is_some_and(|p| p > 99) {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "invalid format (width or precision too long)"));
        }

        let conv = match chars.next() {
            Some(conv) => conv,
            None => {
                return Err(ctx
                    .state
                    .raise(ErrorKind::Runtime, "invalid option '%' to 'format'"))
            }
        };
        arg += 1;
        if arg > ctx.arg_count() {
            return Err(ctx.arg_error_kind(
                ErrorKind::ArgumentMissing,
                arg,
                "no value",
            ));
        }

        match conv {
            'd' | 'i' => {
                let n = format_number_arg(ctx, arg)?.trunc();
                let mut digits = format!("{}", n.abs() as i64);
                if let Some(p) = d.precision {
                    digits = format!("{digits:0>p$}");
                }
                out.push_str(&d.pad(format!("{}{digits}", d.sign(n < 0.0)), d.precision.is_none()));
            }
            'u' => {
                let n = format_number_arg(ctx, arg)? as i64 as u64;
                out.push_str(&d.pad(n.to_string(), true));
            }
            'c' => {
                let n = format_number_arg(ctx, arg)? as u32;
                let c = char::from_u32(n).unwrap_or(char::REPLACEMENT_CHARACTER);
                out.push_str(&d.pad(c.to_string(), false));
            }
            'x' | 'X' | 'o' => {
                let n = format_number_arg(ctx, arg)? as i64;
                let body = match (conv, d.alt) {
                    ('x', false) => format!("{n:x}"),
                    ('x', true) => format!("{n:#x}"),
                    ('X', false) => format!("{n:X}"),
                    ('X', true) => format!("0X{n:X}"),
                    (_, false) => format!("{n:o}"),
                    (_, true) => format!("0{n:o}"),
                };
                out.push_str(&d.pad(body, true));
            }
            'e' | 'E' => {
                let n = format_number_arg(ctx, arg)?;
                let p = d.precision.unwrap_or(6);
                let body = fix_exponent(&format!("{:.*e}", p, n.abs()), conv == 'E');
                out.push_str(&d.pad(format!("{}{body}", d.sign(n.is_sign_negative())), true));
            }
            'f' => {
                let n = format_number_arg(ctx, arg)?;
                let p = d.precision.unwrap_or(6);
                let body = format!("{:.*}", p, n.abs());
                out.push_str(&d.pad(format!("{}{body}", d.sign(n.is_sign_negative())), true));
            }
            'g' | 'G' => {
                let n = format_number_arg(ctx, arg)?;
                let p = d.precision.unwrap_or(6);
                let mut body = coerce::format_g(n.abs(), p);
                if conv == 'G' {
                    body = body.to_uppercase();
                }
                out.push_str(&d.pad(format!("{}{body}", d.sign(n.is_sign_negative())), true));
            }
            'q' => {
                let s = ctx.check_string(arg)?;
                quote_string(&mut out, &s);
            }
            's' => {
                let v = ctx.arg(arg);
                let s = ctx.state.tostring(&v)?.to_string();
                let s: String = match d.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                };
                out.push_str(&d.pad(s, false));
            }
            other => {
                return Err(ctx
                    .state
                    .raise(ErrorKind::Runtime, format!("invalid option '%{other}' to 'format'")))
            }
        }
    }
    Ok(vec![Value::from(out)])
}
