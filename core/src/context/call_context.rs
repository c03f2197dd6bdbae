use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::context::scope::Scope;
use crate::instruction::Param;
use crate::runtime::{ObjectRef, Value};
use crate::vm::CompiledFunction;
use crate::{Box, Vec};

/// Installed by `CreateExceptionHandler`; consumed when a throw unwinds to
/// this frame.
#[derive(Clone)]
pub struct ExceptionHandler {
    /// Offset of the instruction following `CreateExceptionHandler`.
    pub resume_ip: usize,
    /// Temp receiving `true` when execution resumes after a throw.
    pub result: Param,
    /// Scope chain when the handler was installed; `with`/`catch` scopes
    /// pushed inside the protected region are dropped on unwind.
    pub scope: Scope,
    /// Stack-area temps at install time, restored on unwind.
    pub temps: Box<[Value]>,
}

/// Activation record of one script function call.
///
/// Created on call entry and dropped on return unless a closure created
/// during the call still references it through its scope chain.
pub struct CallContext {
    function: Rc<CompiledFunction>,
    this: Value,
    arguments: RefCell<Box<[Value]>>,
    locals: RefCell<Box<[Value]>>,
    temps: RefCell<Vec<Value>>,
    /// Object holding names declared at run time (`DeclareVar`).
    activation: RefCell<Option<ObjectRef>>,
    handlers: RefCell<Vec<ExceptionHandler>>,
    outer: Scope,
    parent: Option<Weak<CallContext>>,
}

impl CallContext {
    /// Builds a context for `function`. Arguments are padded with
    /// `undefined` (or truncated) to the declared formal count; locals start
    /// out undefined.
    pub fn new(
        function: Rc<CompiledFunction>,
        this: Value,
        args: &[Value],
        outer: Scope,
        parent: Option<Weak<CallContext>>,
    ) -> Rc<Self> {
        let formals = function.formals.len();
        let arguments: Box<[Value]> = (0..formals)
            .map(|i| args.get(i).cloned().unwrap_or_default())
            .collect();
        let locals: Box<[Value]> = (0..function.locals.len()).map(|_| Value::Undefined).collect();

        Rc::new(Self {
            function,
            this,
            arguments: RefCell::new(arguments),
            locals: RefCell::new(locals),
            temps: RefCell::new(Vec::new()),
            activation: RefCell::new(None),
            handlers: RefCell::new(Vec::new()),
            outer,
            parent,
        })
    }

    pub fn function(&self) -> &Rc<CompiledFunction> {
        &self.function
    }

    pub fn this(&self) -> &Value {
        &self.this
    }

    pub fn outer(&self) -> &Scope {
        &self.outer
    }

    /// The calling frame, if it is still alive.
    pub fn parent(&self) -> Option<Rc<CallContext>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_strict(&self) -> bool {
        self.function.strict
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.borrow().len()
    }

    pub fn argument(&self, index: usize) -> Value {
        self.arguments.borrow()[index].clone()
    }

    pub fn set_argument(&self, index: usize, value: Value) {
        self.arguments.borrow_mut()[index] = value;
    }

    pub fn local_count(&self) -> usize {
        self.locals.borrow().len()
    }

    pub fn local(&self, index: usize) -> Value {
        self.locals.borrow()[index].clone()
    }

    pub fn set_local(&self, index: usize, value: Value) {
        self.locals.borrow_mut()[index] = value;
    }

    pub fn temp_count(&self) -> usize {
        self.temps.borrow().len()
    }

    pub fn temp(&self, index: usize) -> Value {
        self.temps.borrow()[index].clone()
    }

    pub fn set_temp(&self, index: usize, value: Value) {
        self.temps.borrow_mut()[index] = value;
    }

    /// Sizes the stack area, discarding previous contents.
    pub fn allocate_temps(&self, count: usize) {
        let mut temps = self.temps.borrow_mut();
        temps.clear();
        temps.resize(count, Value::Undefined);
    }

    /// Copies `count` stack temps starting at `start`.
    pub fn temp_range(&self, start: usize, count: usize) -> smallvec::SmallVec<[Value; 4]> {
        self.temps.borrow()[start..start + count].iter().cloned().collect()
    }

    pub(crate) fn snapshot_temps(&self) -> Box<[Value]> {
        self.temps.borrow().as_slice().into()
    }

    pub(crate) fn restore_temps(&self, saved: &[Value]) {
        let mut temps = self.temps.borrow_mut();
        temps.clear();
        temps.extend_from_slice(saved);
    }

    pub fn local_index(&self, name: &str) -> Option<usize> {
        self.function.locals.iter().position(|l| &**l == name)
    }

    /// Later formals shadow earlier ones with the same name.
    pub fn formal_index(&self, name: &str) -> Option<usize> {
        self.function.formals.iter().rposition(|f| &**f == name)
    }

    pub fn activation(&self) -> Option<ObjectRef> {
        self.activation.borrow().clone()
    }

    pub fn activation_or_create(&self) -> ObjectRef {
        self.activation
            .borrow_mut()
            .get_or_insert_with(ObjectRef::plain)
            .clone()
    }

    pub fn push_exception_handler(&self, handler: ExceptionHandler) {
        self.handlers.borrow_mut().push(handler);
    }

    pub fn pop_exception_handler(&self) -> Option<ExceptionHandler> {
        self.handlers.borrow_mut().pop()
    }

    pub fn current_exception_handler(&self) -> Option<ExceptionHandler> {
        self.handlers.borrow().last().cloned()
    }

    pub fn exception_handler_depth(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Drops per-call state that must not outlive the call: the stack area
    /// and any handlers left installed. Locals and arguments stay, since
    /// closures may still read them.
    pub(crate) fn release(&self) {
        self.temps.borrow_mut().clear();
        self.handlers.borrow_mut().clear();
    }

    /// Reports every value reachable from this frame.
    pub fn mark(&self, f: &mut dyn FnMut(&Value)) {
        f(&self.this);
        self.arguments.borrow().iter().for_each(|v| f(v));
        self.locals.borrow().iter().for_each(|v| f(v));
        self.temps.borrow().iter().for_each(|v| f(v));
        if let Some(activation) = self.activation.borrow().as_ref() {
            activation.borrow().mark(f);
        }
        for handler in self.handlers.borrow().iter() {
            handler.temps.iter().for_each(|v| f(v));
        }
        self.outer.mark(f);
    }
}
