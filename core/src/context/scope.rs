use alloc::rc::Rc;
use core::cell::RefCell;

use crate::context::call_context::CallContext;
use crate::runtime::{ObjectRef, Value};

pub struct WithScope {
    pub object: ObjectRef,
    pub outer: Scope,
}

/// Binds the exception variable of a `catch` clause.
pub struct CatchScope {
    pub name: Rc<str>,
    pub value: RefCell<Value>,
    pub outer: Scope,
}

/// A link in the scope chain. Name resolution walks from the innermost link
/// outward until it reaches the global object.
#[derive(Clone)]
pub enum Scope {
    Global(ObjectRef),
    Call(Rc<CallContext>),
    With(Rc<WithScope>),
    Catch(Rc<CatchScope>),
}

impl Scope {
    pub fn outer(&self) -> Option<&Scope> {
        match self {
            Scope::Global(_) => None,
            Scope::Call(context) => Some(context.outer()),
            Scope::With(with) => Some(&with.outer),
            Scope::Catch(catch) => Some(&catch.outer),
        }
    }

    /// Iterates this link and every enclosing one.
    pub fn chain(&self) -> impl Iterator<Item = &Scope> {
        core::iter::successors(Some(self), |s| s.outer())
    }

    /// The innermost function call on the chain.
    pub fn call_context(&self) -> Option<&Rc<CallContext>> {
        self.chain().find_map(|s| match s {
            Scope::Call(context) => Some(context),
            _ => None,
        })
    }

    pub fn global(&self) -> &ObjectRef {
        match self.chain().last() {
            Some(Scope::Global(global)) => global,
            // The chain always bottoms out at the global scope.
            _ => unreachable!("scope chain without a global object"),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.call_context().is_some_and(|c| c.is_strict())
    }

    /// `this` of the innermost function; the global object at top level.
    pub fn this_value(&self) -> Value {
        match self.call_context() {
            Some(context) => context.this().clone(),
            None => Value::Object(self.global().clone()),
        }
    }

    pub fn push_with(&self, object: ObjectRef) -> Scope {
        Scope::With(Rc::new(WithScope {
            object,
            outer: self.clone(),
        }))
    }

    pub fn push_catch(&self, name: Rc<str>, value: Value) -> Scope {
        Scope::Catch(Rc::new(CatchScope {
            name,
            value: RefCell::new(value),
            outer: self.clone(),
        }))
    }

    /// Removes the innermost `with` or `catch` link.
    ///
    /// # Panics
    ///
    /// Panics if the innermost link is a function or the global scope, which
    /// means the bytecode popped more scopes than it pushed.
    pub fn pop(&self) -> Scope {
        match self {
            Scope::With(with) => with.outer.clone(),
            Scope::Catch(catch) => catch.outer.clone(),
            Scope::Call(_) | Scope::Global(_) => {
                panic!("PopScope without a matching PushWithScope/PushCatchScope")
            }
        }
    }

    /// Number of links up to and including the global scope.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    pub fn mark(&self, f: &mut dyn FnMut(&Value)) {
        match self {
            Scope::Global(global) => global.borrow().mark(f),
            Scope::Call(context) => context.mark(f),
            Scope::With(with) => {
                with.object.borrow().mark(f);
                with.outer.mark(f);
            }
            Scope::Catch(catch) => {
                f(&catch.value.borrow());
                catch.outer.mark(f);
            }
        }
    }
}
