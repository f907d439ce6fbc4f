//! Runtime instance state.

use crate::callinfo::{CallInfo, FrameInfo};
use crate::error::LuaError;
use crate::interp;
use crate::table::{new_table, TableRef};
use crate::value::{Function, NativeFn, NativeFunction, Thread, Value};
use std::io::{BufRead, BufReader};
use std::rc::Rc;
use tracing::trace;

/// Remaining native stack below which a call moves to a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each extra native stack segment.
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Tunables for a [`State`].
#[derive(Clone, Debug)]
pub struct Options {
    /// Max call depth before "stack overflow".
    pub call_stack_size: usize,
    /// Leave the globals empty instead of opening the standard library.
    /// Read by whoever bootstraps the libraries.
    pub skip_open_libs: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            call_stack_size: 200,
            skip_open_libs: false,
        }
    }
}

/// One runtime instance: globals, registry, call stack.
///
/// Everything a script can reach hangs off one `State`, so independent
/// instances can coexist in a process. A `State` is single-writer: it is
/// neither `Send` nor `Sync`, and callers sharing one across execution
/// contexts must serialize access themselves.
pub struct State {
    globals: TableRef,
    registry: TableRef,
    /// Shared metatable for all string values.
    string_metatable: Option<TableRef>,
    pub(crate) call_stack: Vec<CallInfo>,
    options: Options,
    stdin: Box<dyn BufRead>,
    main_thread: Rc<Thread>,
}

impl State {
    pub fn new() -> Self {
        State::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        State {
            globals: new_table(0, 64),
            registry: new_table(0, 32),
            string_metatable: None,
            call_stack: Vec::new(),
            options,
            stdin: Box::new(BufReader::new(std::io::stdin())),
            main_thread: Rc::new(Thread { id: 0 }),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The global namespace table.
    pub fn globals(&self) -> TableRef {
        self.globals.clone()
    }

    /// The registry table for runtime bookkeeping (loaded modules, type metatables).
    pub fn registry(&self) -> TableRef {
        self.registry.clone()
    }

    pub fn get_global(&self, name: &str) -> Value {
        self.globals.borrow().raw_get_str(name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().raw_set_str(name, value);
    }

    pub fn string_metatable(&self) -> Option<TableRef> {
        self.string_metatable.clone()
    }

    pub fn set_string_metatable(&mut self, metatable: Option<TableRef>) {
        self.string_metatable = metatable;
    }

    /// Wrap a host callback as a callable value.
    pub fn new_function(&self, name: &str, func: NativeFn) -> Value {
        Value::Function(Rc::new(Function::Native(NativeFunction {
            name: Rc::from(name),
            func,
        })))
    }

    pub fn main_thread(&self) -> Value {
        Value::Thread(self.main_thread.clone())
    }

    /// Replace the stream used for standard input (`LoadFile("")`, `io.read`).
    pub fn set_stdin(&mut self, stdin: Box<dyn BufRead>) {
        self.stdin = stdin;
    }

    pub fn stdin_mut(&mut self) -> &mut dyn BufRead {
        self.stdin.as_mut()
    }

    // ---- Call stack ----

    /// Number of active frames.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Snapshot of the frame `level` levels below the innermost one.
    pub fn frame_info(&self, level: usize) -> Option<FrameInfo> {
        let len = self.call_stack.len();
        if level >= len {
            return None;
        }
        Some(FrameInfo::from(&self.call_stack[len - 1 - level]))
    }

    pub(crate) fn set_current_line(&mut self, line: u32) {
        if let Some(ci) = self.call_stack.last_mut() {
            ci.current_line = line;
        }
    }

    // ---- Calls ----

    /// Call `func` with `args`; errors propagate to the caller.
    pub fn call(&mut self, func: &Value, args: Vec<Value>) -> Result<Vec<Value>, LuaError> {
        self.call_named(func, args, None)
    }

    /// Call `func`, recording `name` as the callee's name for error messages.
    pub fn call_named(
        &mut self,
        func: &Value,
        args: Vec<Value>,
        name: Option<Rc<str>>,
    ) -> Result<Vec<Value>, LuaError> {
        let function = match func {
            Value::Function(f) => f.clone(),
            other => {
                let handler = self.get_meta_field(other, "__call");
                if let Value::Function(_) = handler {
                    let mut full = Vec::with_capacity(args.len() + 1);
                    full.push(other.clone());
                    full.extend(args);
                    return self.call_named(&handler, full, name);
                }
                return Err(
                    self.runtime_error(format!("attempt to call a {} value", other.kind()))
                );
            }
        };

        if self.call_stack.len() >= self.options.call_stack_size {
            return Err(LuaError::StackOverflow);
        }

        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.dispatch(&function, args, name)
        })
    }

    fn dispatch(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        name: Option<Rc<str>>,
    ) -> Result<Vec<Value>, LuaError> {
        match function {
            Function::Native(native) => {
                trace!(function = %native.name, args = args.len(), "native call");
                self.call_stack.push(CallInfo::native(name));
                let result = {
                    let mut ctx = CallContext::new(self, args);
                    (native.func)(&mut ctx)
                };
                self.call_stack.pop();
                result
            }
            Function::Lua(closure) => {
                self.call_stack.push(CallInfo::lua(
                    closure.chunk.clone(),
                    closure.body.line,
                    name,
                ));
                let result = interp::call_closure(self, closure, args);
                self.call_stack.pop();
                result
            }
        }
    }

    /// Protected call: an error is returned as a value and the call stack is
    /// restored to its depth on entry. Side effects performed before the
    /// error are kept.
    pub fn pcall(&mut self, func: &Value, args: Vec<Value>) -> Result<Vec<Value>, LuaError> {
        let depth = self.call_stack.len();
        let result = self.call(func, args);
        if result.is_err() {
            self.call_stack.truncate(depth);
        }
        result
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

/// The active invocation of a host function: its arguments and the state.
pub struct CallContext<'a> {
    pub state: &'a mut State,
    args: Vec<Value>,
}

impl<'a> CallContext<'a> {
    pub fn new(state: &'a mut State, args: Vec<Value>) -> Self {
        CallContext { state, args }
    }

    /// Number of arguments actually passed.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Argument at 1-based position `n`, or nil when absent.
    pub fn arg(&self, n: usize) -> Value {
        if n == 0 {
            return Value::Nil;
        }
        self.args.get(n - 1).cloned().unwrap_or(Value::Nil)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Take ownership of the argument list.
    pub fn take_args(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.args)
    }
}
