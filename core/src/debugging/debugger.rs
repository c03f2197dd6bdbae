use alloc::rc::{Rc, Weak};
use core::fmt;

use crate::Vec;
use crate::context::CallContext;
use crate::runtime::Value;
use crate::vm::CompiledFunction;

/// Live view of a running frame, available between `enter_function` and
/// `leave_function`.
#[derive(Clone)]
pub struct FunctionState {
    context: Weak<CallContext>,
}

impl FunctionState {
    pub fn argument(&self, index: usize) -> Option<Value> {
        let context = self.context.upgrade()?;
        (index < context.argument_count()).then(|| context.argument(index))
    }

    pub fn local(&self, index: usize) -> Option<Value> {
        let context = self.context.upgrade()?;
        (index < context.local_count()).then(|| context.local(index))
    }

    /// Stack-area slot `index` of the frame.
    pub fn temp(&self, index: usize) -> Option<Value> {
        let context = self.context.upgrade()?;
        (index < context.temp_count()).then(|| context.temp(index))
    }

    pub fn exception_handler_depth(&self) -> usize {
        self.context
            .upgrade()
            .map_or(0, |c| c.exception_handler_depth())
    }
}

/// One entry of the debugger's call stack.
pub struct CallInfo {
    pub context: Weak<CallContext>,
    pub function: Weak<CompiledFunction>,
    pub state: Option<FunctionState>,
}

impl CallInfo {
    pub fn function_name(&self) -> Option<Rc<str>> {
        self.function.upgrade().map(|f| f.display_name().into())
    }
}

/// Observes script calls and throws.
///
/// Attach with [`Engine::attach_debugger`](crate::api::Engine::attach_debugger).
/// The engine calls the hooks around every script call and throw; when no
/// debugger is attached each hook site costs a single `None` check. Hooks
/// only record state and never influence execution.
#[derive(Default)]
pub struct Debugger {
    call_stack: Vec<CallInfo>,
    last_exception: Option<Value>,
    throw_count: usize,
    calls_seen: usize,
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    // Hooks.

    pub(crate) fn about_to_call(&mut self, function: &Rc<CompiledFunction>, context: &Rc<CallContext>) {
        self.calls_seen += 1;
        self.call_stack.push(CallInfo {
            context: Rc::downgrade(context),
            function: Rc::downgrade(function),
            state: None,
        });
    }

    pub(crate) fn just_left(&mut self, context: &Rc<CallContext>) {
        // A debugger attached mid-call never saw the matching `about_to_call`.
        if self
            .call_stack
            .last()
            .is_some_and(|info| info.context.as_ptr() == Rc::as_ptr(context))
        {
            self.call_stack.pop();
        }
    }

    pub(crate) fn enter_function(&mut self, context: &Rc<CallContext>) {
        if let Some(top) = self.call_stack.last_mut() {
            top.state = Some(FunctionState {
                context: Rc::downgrade(context),
            });
        }
    }

    pub(crate) fn leave_function(&mut self, _context: &Rc<CallContext>) {
        if let Some(top) = self.call_stack.last_mut() {
            top.state = None;
        }
    }

    pub(crate) fn about_to_throw(&mut self, value: &Value) {
        self.throw_count += 1;
        self.last_exception = Some(value.clone());
    }

    // Introspection.

    /// Frames innermost first.
    pub fn call_stack(&self) -> impl Iterator<Item = &CallInfo> {
        self.call_stack.iter().rev()
    }

    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Total script calls observed since attach.
    pub fn calls_seen(&self) -> usize {
        self.calls_seen
    }

    pub fn current_state(&self) -> Option<&FunctionState> {
        self.call_stack.last().and_then(|info| info.state.as_ref())
    }

    fn frame_state(&self, frame: usize) -> Option<&FunctionState> {
        self.call_stack().nth(frame).and_then(|info| info.state.as_ref())
    }

    /// Argument `index` of frame `frame` (0 is the innermost).
    pub fn argument(&self, frame: usize, index: usize) -> Option<Value> {
        self.frame_state(frame)?.argument(index)
    }

    pub fn local(&self, frame: usize, index: usize) -> Option<Value> {
        self.frame_state(frame)?.local(index)
    }

    pub fn temp(&self, frame: usize, index: usize) -> Option<Value> {
        self.frame_state(frame)?.temp(index)
    }

    pub fn last_exception(&self) -> Option<&Value> {
        self.last_exception.as_ref()
    }

    pub fn throw_count(&self) -> usize {
        self.throw_count
    }

    /// Writes one line per frame, innermost first, e.g.
    /// `#0 fact(n = 1)`.
    pub fn print_stack_trace(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for (depth, info) in self.call_stack().enumerate() {
            let name = info.function_name().unwrap_or_else(|| "<dead>".into());
            write!(out, "#{} {}(", depth, name)?;
            if let (Some(function), Some(state)) = (info.function.upgrade(), &info.state) {
                for (i, formal) in function.formals.iter().enumerate() {
                    if i > 0 {
                        write!(out, ", ")?;
                    }
                    match state.argument(i) {
                        Some(value) => write!(out, "{} = {:?}", formal, value)?,
                        None => write!(out, "{}", formal)?,
                    }
                }
            }
            writeln!(out, ")")?;
        }
        Ok(())
    }
}
