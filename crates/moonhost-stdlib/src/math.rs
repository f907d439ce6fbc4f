//! Lua 5.1 math library.

use moonhost_vm::{CallContext, ErrorKind, FunctionSet, LuaError, State, TableRef, Value};
use std::cell::RefCell;

thread_local! {
    static RNG_STATE: RefCell<u64> = const { RefCell::new(0x12345678_9abcdef0) };
}

/// SplitMix64 step.
fn prng_next() -> u64 {
    RNG_STATE.with(|state| {
        let mut s = state.borrow_mut();
        *s = s.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = *s;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    })
}

fn prng_seed(seed: u64) {
    RNG_STATE.with(|state| {
        *state.borrow_mut() = seed;
    });
}

/// Uniform float in `[0, 1)`.
fn prng_float() -> f64 {
    (prng_next() >> 11) as f64 / (1u64 << 53) as f64
}

const MATH_FUNCS: FunctionSet<'static> = &[
    ("abs", native_math_abs),
    ("ceil", native_math_ceil),
    ("floor", native_math_floor),
    ("sqrt", native_math_sqrt),
    ("sin", native_math_sin),
    ("cos", native_math_cos),
    ("tan", native_math_tan),
    ("asin", native_math_asin),
    ("acos", native_math_acos),
    ("atan", native_math_atan),
    ("atan2", native_math_atan2),
    ("exp", native_math_exp),
    ("log", native_math_log),
    ("log10", native_math_log10),
    ("pow", native_math_pow),
    ("fmod", native_math_fmod),
    ("modf", native_math_modf),
    ("max", native_math_max),
    ("min", native_math_min),
    ("random", native_math_random),
    ("randomseed", native_math_randomseed),
    ("deg", native_math_deg),
    ("rad", native_math_rad),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    let math = state.register_module("math", MATH_FUNCS)?;
    {
        let mut t = math.borrow_mut();
        t.raw_set_str("pi", Value::Number(std::f64::consts::PI));
        t.raw_set_str("huge", Value::Number(f64::INFINITY));
    }
    Ok(math)
}

/// One-argument functions that map a number to a number.
macro_rules! unary_math {
    ($($name:ident => $op:expr;)*) => {
        $(
            fn $name(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
                let x = ctx.check_number(1)?;
                let op: fn(f64) -> f64 = $op;
                Ok(vec![Value::Number(op(x))])
            }
        )*
    };
}

unary_math! {
    native_math_abs => f64::abs;
    native_math_ceil => f64::ceil;
    native_math_floor => f64::floor;
    native_math_sqrt => f64::sqrt;
    native_math_sin => f64::sin;
    native_math_cos => f64::cos;
    native_math_tan => f64::tan;
    native_math_asin => f64::asin;
    native_math_acos => f64::acos;
    native_math_atan => f64::atan;
    native_math_exp => f64::exp;
    native_math_log10 => f64::log10;
    native_math_deg => f64::to_degrees;
    native_math_rad => f64::to_radians;
}

fn native_math_atan2(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let y = ctx.check_number(1)?;
    let x = ctx.check_number(2)?;
    Ok(vec![Value::Number(y.atan2(x))])
}

/// log(x [,base])
fn native_math_log(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let x = ctx.check_number(1)?;
    let r = match ctx.opt_value::<f64>(2)? {
        None => x.ln(),
        Some(b) if b == 2.0 => x.log2(),
        Some(b) if b == 10.0 => x.log10(),
        Some(b) => x.ln() / b.ln(),
    };
    Ok(vec![Value::Number(r)])
}

fn native_math_pow(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let x = ctx.check_number(1)?;
    let y = ctx.check_number(2)?;
    Ok(vec![Value::Number(x.powf(y))])
}

/// C `fmod`: the result takes the sign of the dividend.
fn native_math_fmod(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let x = ctx.check_number(1)?;
    let y = ctx.check_number(2)?;
    Ok(vec![Value::Number(x % y)])
}

fn native_math_modf(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let x = ctx.check_number(1)?;
    let int = x.trunc();
    let frac = if x.is_infinite() { 0.0 } else { x - int };
    Ok(vec![Value::Number(int), Value::Number(frac)])
}

fn native_math_max(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let mut best = ctx.check_number(1)?;
    for n in 2..=ctx.arg_count() {
        let x = ctx.check_number(n)?;
        if x > best {
            best = x;
        }
    }
    Ok(vec![Value::Number(best)])
}

fn native_math_min(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let mut best = ctx.check_number(1)?;
    for n in 2..=ctx.arg_count() {
        let x = ctx.check_number(n)?;
        if x < best {
            best = x;
        }
    }
    Ok(vec![Value::Number(best)])
}

/// random(), random(m) in `[1, m]`, random(m, n) in `[m, n]`.
fn native_math_random(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let r = prng_float();
    let (lo, hi) = match ctx.arg_count() {
        0 => return Ok(vec![Value::Number(r)]),
        1 => (1.0, ctx.check_number(1)?.floor()),
        2 => (ctx.check_number(1)?.floor(), ctx.check_number(2)?.floor()),
        _ => {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "wrong number of arguments to 'random'"))
        }
    };
    if lo > hi {
        let n = ctx.arg_count();
        return Err(ctx.arg_error(n, "interval is empty"));
    }
    Ok(vec![Value::Number((r * (hi - lo + 1.0)).floor() + lo)])
}

fn native_math_randomseed(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let seed = ctx.check_number(1)?;
    prng_seed(seed as i64 as u64);
    Ok(vec![])
}
