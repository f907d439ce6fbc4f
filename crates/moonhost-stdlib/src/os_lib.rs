//! Lua 5.1 os library.
//!
//! Calendar work goes through `chrono`; `os.date` formats accept the
//! strftime directives chrono understands.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeDelta, TimeZone, Timelike, Utc};
use moonhost_vm::{new_table, CallContext, ErrorKind, FunctionSet, Kind, LuaError, State, TableRef, Value};
use std::fmt::{Display, Write as _};
use std::io::{self, Write};
use std::time::Instant;

thread_local! {
    static PROCESS_START: Instant = Instant::now();
}

const OS_FUNCS: FunctionSet<'static> = &[
    ("clock", native_os_clock),
    ("time", native_os_time),
    ("difftime", native_os_difftime),
    ("date", native_os_date),
    ("getenv", native_os_getenv),
    ("remove", native_os_remove),
    ("rename", native_os_rename),
    ("exit", native_os_exit),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    PROCESS_START.with(|_| ());
    state.register_module("os", OS_FUNCS)
}

/// `nil, "<path>: <reason>"` for a failed filesystem call.
fn os_fail(path: &str, err: &io::Error) -> Vec<Value> {
    let mut message = err.to_string();
    if let Some(i) = message.find(" (os error") {
        message.truncate(i);
    }
    vec![Value::Nil, Value::from(format!("{path}: {message}"))]
}

// ---------------------------------------------------------------------------
// os.clock()
// ---------------------------------------------------------------------------

fn native_os_clock(_ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let elapsed = PROCESS_START.with(|start| start.elapsed());
    Ok(vec![Value::Number(elapsed.as_secs_f64())])
}

// ---------------------------------------------------------------------------
// os.time([table])
// ---------------------------------------------------------------------------

fn native_os_time(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let Some(t) = ctx.opt_table(1)? else {
        return Ok(vec![Value::Number(Utc::now().timestamp() as f64)]);
    };

    let field = |name: &str, default: Option<i64>| -> Result<i64, LuaError> {
        match t.borrow().raw_get_str(name) {
            Value::Number(n) => Ok(n as i64),
            Value::Nil => default.ok_or_else(|| {
                ctx.state
                    .raise(ErrorKind::Runtime, format!("field '{name}' missing in date table"))
            }),
            _ => Err(ctx
                .state
                .raise(ErrorKind::Runtime, format!("field '{name}' is not an integer"))),
        }
    };
    let year = field("year", None)?;
    let month = field("month", None)?;
    let day = field("day", None)?;
    let hour = field("hour", Some(12))?;
    let min = field("min", Some(0))?;
    let sec = field("sec", Some(0))?;

    Ok(match local_timestamp(year, month, day, hour, min, sec) {
        Some(ts) => vec![Value::Number(ts as f64)],
        None => vec![Value::Nil],
    })
}

/// Seconds since the epoch for a local calendar time. Out-of-range fields
/// carry over the way `mktime` normalises them.
fn local_timestamp(year: i64, month: i64, day: i64, hour: i64, min: i64, sec: i64) -> Option<i64> {
    let month0 = month - 1;
    let year = i32::try_from(year + month0.div_euclid(12)).ok()?;
    let month = month0.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let offset = TimeDelta::try_days(day - 1)?
        .checked_add(&TimeDelta::try_seconds(hour * 3600 + min * 60 + sec)?)?;
    let naive = first.checked_add_signed(offset)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

fn native_os_difftime(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t2 = ctx.check_number(1)?;
    let t1 = ctx.opt_number(2, 0.0)?;
    Ok(vec![Value::Number(t2 - t1)])
}

// ---------------------------------------------------------------------------
// os.date([format [, time]])
// ---------------------------------------------------------------------------

fn native_os_date(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let format = ctx.opt_string(1, "%c")?;
    let secs = match ctx.opt_value::<f64>(2)? {
        Some(t) => t as i64,
        None => Utc::now().timestamp(),
    };
    let (utc, format) = match format.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, &*format),
    };

    let Some(now) = DateTime::from_timestamp(secs, 0) else {
        return Ok(vec![Value::Nil]);
    };
    let rendered = if utc {
        render_date(now, format)
    } else {
        render_date(now.with_timezone(&Local), format)
    };
    rendered.map_err(|message| ctx.state.raise(ErrorKind::Runtime, message))
}

fn render_date<Tz: TimeZone>(dt: DateTime<Tz>, format: &str) -> Result<Vec<Value>, String>
where
    Tz::Offset: Display,
{
    if format.starts_with("*t") {
        let t = new_table(0, 9);
        {
            let mut t = t.borrow_mut();
            t.raw_set_str("year", Value::from(dt.year() as i64));
            t.raw_set_str("month", Value::from(dt.month() as i64));
            t.raw_set_str("day", Value::from(dt.day() as i64));
            t.raw_set_str("hour", Value::from(dt.hour() as i64));
            t.raw_set_str("min", Value::from(dt.minute() as i64));
            t.raw_set_str("sec", Value::from(dt.second() as i64));
            t.raw_set_str(
                "wday",
                Value::from(dt.weekday().number_from_sunday() as i64),
            );
            t.raw_set_str("yday", Value::from(dt.ordinal() as i64));
            t.raw_set_str("isdst", Value::Bool(false));
        }
        return Ok(vec![Value::Table(t)]);
    }

    let mut out = String::new();
    write!(out, "{}", dt.format(format))
        .map_err(|_| format!("invalid conversion specifier '{format}'"))?;
    Ok(vec![Value::from(out)])
}

// ---------------------------------------------------------------------------
// Environment and filesystem
// ---------------------------------------------------------------------------

fn native_os_getenv(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let name = ctx.check_string(1)?;
    Ok(vec![match std::env::var(&*name) {
        Ok(v) => Value::from(v),
        Err(_) => Value::Nil,
    }])
}

fn native_os_remove(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let path = ctx.check_string(1)?;
    let result = match std::fs::metadata(&*path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir(&*path),
        _ => std::fs::remove_file(&*path),
    };
    Ok(match result {
        Ok(()) => vec![Value::Bool(true)],
        Err(e) => os_fail(&path, &e),
    })
}

fn native_os_rename(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let from = ctx.check_string(1)?;
    let to = ctx.check_string(2)?;
    Ok(match std::fs::rename(&*from, &*to) {
        Ok(()) => vec![Value::Bool(true)],
        Err(e) => os_fail(&from, &e),
    })
}

/// os.exit([code]): a boolean maps to success or failure.
fn native_os_exit(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let code = match ctx.arg(1) {
        Value::Nil => 0,
        Value::Bool(ok) => i32::from(!ok),
        _ => {
            ctx.check_kinds(1, &[Kind::Number, Kind::Bool])?;
            ctx.check_int(1)? as i32
        }
    };
    let _ = io::stdout().flush();
    std::process::exit(code)
}
