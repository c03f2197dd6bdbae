//! Moth - a register-style bytecode VM for a dynamically typed scripting
//! language
//!
//! # Overview
//!
//! A front end lowers source code into the three-address [`ir`]. Moth takes
//! it from there:
//!
//! - the instruction selector turns each IR function into compact bytecode,
//!   compressing temporaries into as few frame slots as liveness allows
//! - the VM executes the bytecode with either switch or threaded dispatch
//! - call contexts and scope chains resolve names the way the language's
//!   dynamic scoping rules require (`with`, `catch`, activation objects)
//! - an optional debugger observes calls, returns and throws
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use moth::{Engine, EngineOptions, Value};
//! use moth::ir::{AluOp, FunctionBuilder, ModuleBuilder};
//!
//! // f(a) { return a + 1; }
//! let arena = Bump::new();
//! let mut f = FunctionBuilder::new(&arena, Some("f"), &["a"], &[]);
//! let entry = f.new_block();
//! let sum = f.new_temp();
//! f.mov(entry, f.temp(sum), f.binop(AluOp::Add, f.arg(0), f.number(1.0)));
//! f.ret(entry, f.temp(sum));
//!
//! let mut module = ModuleBuilder::new();
//! let root = module.add(f.build());
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let compiled = engine.compile(&module.finish(root));
//! assert_eq!(engine.run(&compiled, &[Value::Number(41.0)]).unwrap(), Value::Number(42.0));
//! ```
//!
//! # Dispatch Modes
//!
//! Bytecode is selected for one [`DispatchMode`], chosen through
//! [`CompilationOptions`]:
//!
//! 1. **Switch**: each instruction header holds its opcode tag
//! 2. **Threaded**: each header holds the address of the opcode's handler
//!
//! Both produce identical results.
//!
//! # Native Functions
//!
//! Host functions are plain Rust functions registered on the engine:
//!
//! ```
//! use moth::{Engine, EngineOptions, Throw, Value};
//!
//! fn twice(engine: &mut Engine, _this: &Value, args: &[Value]) -> Result<Value, Throw> {
//!     match args.first().and_then(Value::as_number) {
//!         Some(n) => Ok(Value::Number(n * 2.0)),
//!         None => Err(engine.throw_type_error("twice expects a number")),
//!     }
//! }
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! engine.register_function("twice", twice);
//! ```

pub use moth_core::api::{
    CompilationOptions, Engine, EngineOptions, Error, ExecutionOptions, make_closure,
};
pub use moth_core::debugging::Debugger;
pub use moth_core::instruction::DispatchMode;
pub use moth_core::runtime::{NativeFn, ObjectRef, Throw, Value};
pub use moth_core::vm::{CompiledFunction, CompiledModule};

pub use moth_core::compiler;
pub use moth_core::context;
pub use moth_core::debugging;
pub use moth_core::instruction;
pub use moth_core::ir;
pub use moth_core::runtime;
pub use moth_core::vm;
