use alloc::rc::Rc;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;

use hashbrown::HashMap;

use crate::api::Engine;
use crate::context::Scope;
use crate::runtime::Throw;
use crate::runtime::value::Value;
use crate::vm::CompiledFunction;
use crate::{String, Vec};

/// Host function callable from scripts.
pub type NativeFn = fn(&mut Engine, &Value, &[Value]) -> Result<Value, Throw>;

#[derive(Clone)]
pub enum FunctionObject {
    /// Compiled function closed over the scope it was created in.
    Script {
        function: Rc<CompiledFunction>,
        scope: Scope,
    },
    Native {
        name: Rc<str>,
        function: NativeFn,
    },
}

impl FunctionObject {
    pub fn name(&self) -> Option<&str> {
        match self {
            FunctionObject::Script { function, .. } => function.name.as_deref(),
            FunctionObject::Native { name, .. } => Some(name),
        }
    }
}

/// State of a `for-in` enumeration. Keys are snapshotted when the iterator
/// is created.
pub struct ForeachIterator {
    keys: Vec<Rc<str>>,
    position: usize,
}

impl ForeachIterator {
    pub fn new(keys: Vec<Rc<str>>) -> Self {
        Self { keys, position: 0 }
    }

    pub fn next_key(&mut self) -> Option<Rc<str>> {
        let key = self.keys.get(self.position).cloned();
        if key.is_some() {
            self.position += 1;
        }
        key
    }
}

pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(FunctionObject),
    Error,
    ForeachIterator(ForeachIterator),
}

#[derive(Clone)]
pub struct Property {
    pub value: Value,
    pub deletable: bool,
    pub enumerable: bool,
}

pub struct Object {
    kind: ObjectKind,
    properties: HashMap<Rc<str>, Property>,
    /// Insertion order, for enumeration.
    order: Vec<Rc<str>>,
    constructor: Option<ObjectRef>,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: HashMap::new(),
            order: Vec::new(),
            constructor: None,
        }
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ObjectKind {
        &mut self.kind
    }

    pub fn constructor(&self) -> Option<&ObjectRef> {
        self.constructor.as_ref()
    }

    pub fn set_constructor(&mut self, constructor: ObjectRef) {
        self.constructor = Some(constructor);
    }

    pub fn get_own(&self, name: &str) -> Option<Value> {
        if let ObjectKind::Array(elements) = &self.kind {
            if name == "length" {
                return Some(Value::Number(elements.len() as f64));
            }
            if let Some(value) = array_index(name).and_then(|i| elements.get(i)) {
                return Some(value.clone());
            }
        }
        self.properties.get(name).map(|p| p.value.clone())
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.get_own(name).is_some()
    }

    /// Assigns an existing property or creates a deletable, enumerable one.
    pub fn put(&mut self, name: &str, value: Value) {
        if let Some(index) = self.array_slot(name) {
            self.set_index(index, value);
            return;
        }
        match self.properties.get_mut(name) {
            Some(property) => property.value = value,
            None => self.insert(name, value, true),
        }
    }

    /// Creates or overwrites a property with explicit deletability.
    pub fn define(&mut self, name: &str, value: Value, deletable: bool) {
        if let Some(index) = self.array_slot(name) {
            self.set_index(index, value);
            return;
        }
        match self.properties.get_mut(name) {
            Some(property) => {
                property.value = value;
                property.deletable = deletable;
            }
            None => self.insert(name, value, deletable),
        }
    }

    fn insert(&mut self, name: &str, value: Value, deletable: bool) {
        let key: Rc<str> = Rc::from(name);
        self.order.push(key.clone());
        self.properties.insert(
            key,
            Property {
                value,
                deletable,
                enumerable: true,
            },
        );
    }

    fn array_slot(&self, name: &str) -> Option<usize> {
        match self.kind {
            ObjectKind::Array(_) => array_index(name),
            _ => None,
        }
    }

    /// Returns false when the property exists but may not be deleted.
    pub fn delete(&mut self, name: &str) -> bool {
        if let Some(index) = self.array_slot(name) {
            return self.delete_index(index);
        }
        self.delete_named(name)
    }

    fn delete_named(&mut self, name: &str) -> bool {
        match self.properties.get(name) {
            None => true,
            Some(property) if !property.deletable => false,
            Some(_) => {
                self.properties.remove(name);
                self.order.retain(|k| &**k != name);
                true
            }
        }
    }

    pub fn get_index(&self, index: usize) -> Option<Value> {
        match &self.kind {
            ObjectKind::Array(elements) if index < elements.len() => elements.get(index).cloned(),
            _ => self.properties.get(index_key(index).as_str()).map(|p| p.value.clone()),
        }
    }

    /// Array elements grow the array, padding with `undefined`. Indices more
    /// than `MAX_DENSE_GAP` past the end are kept as named properties.
    pub fn set_index(&mut self, index: usize, value: Value) {
        let ObjectKind::Array(elements) = &mut self.kind else {
            return self.put(&index_key(index), value);
        };
        let len = elements.len();
        if index < len {
            elements[index] = value;
        } else if index - len <= MAX_DENSE_GAP {
            elements.resize(index + 1, Value::Undefined);
            self.absorb_sparse(len..index + 1);
            if let ObjectKind::Array(elements) = &mut self.kind {
                elements[index] = value;
            }
        } else {
            let key = index_key(index);
            match self.properties.get_mut(key.as_str()) {
                Some(property) => property.value = value,
                None => self.insert(&key, value, true),
            }
        }
    }

    /// Moves named index properties that now fall inside the dense store
    /// into it.
    fn absorb_sparse(&mut self, range: core::ops::Range<usize>) {
        if self.properties.is_empty() {
            return;
        }
        let sparse: Vec<(usize, Rc<str>)> = self
            .order
            .iter()
            .filter_map(|k| array_index(k).filter(|i| range.contains(i)).map(|i| (i, k.clone())))
            .collect();
        for (index, key) in sparse {
            if let Some(property) = self.properties.remove(&key) {
                if let ObjectKind::Array(elements) = &mut self.kind {
                    elements[index] = property.value;
                }
            }
            self.order.retain(|k| *k != key);
        }
    }

    /// Deleting a dense array element leaves `undefined` in its slot.
    pub fn delete_index(&mut self, index: usize) -> bool {
        match &mut self.kind {
            ObjectKind::Array(elements) if index < elements.len() => {
                elements[index] = Value::Undefined;
                true
            }
            _ => self.delete_named(&index_key(index)),
        }
    }

    /// Enumerable keys in enumeration order: array indices first, then named
    /// properties in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        let mut keys = Vec::new();
        if let ObjectKind::Array(elements) = &self.kind {
            keys.extend((0..elements.len()).map(|i| Rc::from(index_key(i).as_str())));
        }
        keys.extend(
            self.order
                .iter()
                .filter(|k| self.properties.get(&***k).is_some_and(|p| p.enumerable))
                .cloned(),
        );
        keys
    }

    /// Reports every value this object keeps alive.
    pub fn mark(&self, f: &mut dyn FnMut(&Value)) {
        for property in self.properties.values() {
            f(&property.value);
        }
        if let ObjectKind::Array(elements) = &self.kind {
            elements.iter().for_each(|v| f(v));
        }
    }
}

/// How far past the end of an array a store may grow the dense elements.
const MAX_DENSE_GAP: usize = 1024;

fn index_key(index: usize) -> String {
    crate::format!("{}", index)
}

/// Canonical array index: decimal digits without leading zeros.
pub(crate) fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Shared handle to a heap object. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(kind: ObjectKind) -> Self {
        ObjectRef(Rc::new(RefCell::new(Object::new(kind))))
    }

    pub fn plain() -> Self {
        Self::new(ObjectKind::Plain)
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Self::new(ObjectKind::Array(elements))
    }

    pub fn native_function(name: &str, function: NativeFn) -> Self {
        Self::new(ObjectKind::Function(FunctionObject::Native {
            name: Rc::from(name),
            function,
        }))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.borrow().get_own(name)
    }

    pub fn put(&self, name: &str, value: Value) {
        self.borrow_mut().put(name, value);
    }

    /// The callable behind this object, if any.
    pub fn as_function(&self) -> Option<FunctionObject> {
        match self.borrow().kind() {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(object) = self.0.try_borrow() else {
            return write!(f, "[object <borrowed>]");
        };
        match object.kind() {
            ObjectKind::Plain => write!(f, "[object Object]"),
            ObjectKind::Array(elements) => write!(f, "[array; {}]", elements.len()),
            ObjectKind::Function(function) => {
                write!(f, "[function {}]", function.name().unwrap_or("<anonymous>"))
            }
            ObjectKind::Error => {
                let name = object.get_own("name").unwrap_or_default();
                let message = object.get_own("message").unwrap_or_default();
                write!(f, "[{:?}: {:?}]", name, message)
            }
            ObjectKind::ForeachIterator(_) => write!(f, "[object Iterator]"),
        }
    }
}
