use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compiler::compile;
use crate::config::RuntimeConfig;
use crate::vm::chunk::{Chunk, OpCode};
use crate::vm::debug;
use crate::vm::heap::Heap;
use crate::vm::object::{
    BoundMethodObj, ClassObj, ClosureObj, FunctionObj, GcRef, InstanceObj, NativeFn, NativeObj,
    ObjKind, StrObj, UpvalueObj, UpvalueState,
};
use crate::vm::table::{hash_str, Table};
use crate::vm::value::Value;
use crate::vm::{FRAMES_MAX, STACK_MAX};
use crate::Error;

/// One function invocation: the closure being run, the instruction
/// offset into its chunk, and the index of its first stack slot (the
/// callee for plain functions, the receiver for methods).
struct CallFrame {
    closure: GcRef,
    ip: usize,
    slots: usize,
}

/// The virtual machine. Owns the heap and every GC root: the value
/// stack, the call frames, the globals table, the open-upvalue list and
/// the cached `"init"` string. Runtime errors reset the stack, so one
/// `Vm` can serve a whole interactive session.
pub struct Vm {
    pub heap: Heap,
    globals: Table,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    /// Head of the list of open upvalues, sorted by descending stack
    /// slot and threaded through the upvalue objects themselves.
    open_upvalues: Option<GcRef>,
    init_string: Option<GcRef>,
    config: RuntimeConfig,
    output: Box<dyn Write>,
}

impl Vm {
    pub fn new(config: RuntimeConfig) -> Vm {
        Vm::with_output(config, Box::new(io::stdout()))
    }

    /// Build a VM whose `print` statement writes somewhere else; tests
    /// use this to capture program output in-process.
    pub fn with_output(config: RuntimeConfig, output: Box<dyn Write>) -> Vm {
        let mut vm = Vm {
            heap: Heap::new(config.trace_gc),
            globals: Table::new(),
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            open_upvalues: None,
            init_string: None,
            config,
            output,
        };
        vm.init_string = Some(vm.copy_string("init"));
        vm.define_native("clock", native_clock);
        vm
    }

    /// Compile and run one whole program. Diagnostics go to stderr; the
    /// returned error only classifies the failure for exit-code mapping.
    pub fn interpret(&mut self, source: &str) -> Result<(), Error> {
        let function = match compile(self, source) {
            Ok(function) => function,
            Err(diagnostics) => {
                for line in &diagnostics {
                    eprintln!("{}", line);
                }
                return Err(Error::Compile);
            }
        };

        if self.config.dump_bytecode {
            eprint!("{}", debug::disassemble(&self.heap, function));
        }

        // Keep the fresh function reachable while its closure allocates.
        self.push(Value::Obj(function));
        self.maybe_collect();
        let closure = self.heap.alloc(ObjKind::Closure(ClosureObj {
            function,
            upvalues: Vec::new(),
        }));
        self.pop();
        self.push(Value::Obj(closure));

        let result = self.call(closure, 0).and_then(|()| self.run());
        if let Err(message) = result {
            self.report_runtime_error(&message);
            self.reset_stack();
            return Err(Error::Runtime);
        }
        Ok(())
    }

    // ----- stack ----------------------------------------------------------

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap()
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues = None;
    }

    // ----- allocation helpers --------------------------------------------

    /// Intern a string, copying the bytes. Returns the canonical object
    /// if one already exists. The fresh string rides the VM stack across
    /// the pool insert so a collection there cannot free it.
    pub(crate) fn copy_string(&mut self, chars: &str) -> GcRef {
        let hash = hash_str(chars);
        if let Some(existing) = self.heap.find_interned(chars, hash) {
            return existing;
        }
        self.maybe_collect();
        let string = self.heap.alloc(ObjKind::Str(StrObj {
            chars: chars.to_string(),
            hash,
        }));
        self.push(Value::Obj(string));
        self.heap.intern(string, hash);
        self.pop();
        string
    }

    /// Intern a string, taking ownership of the buffer. An existing
    /// canonical entry wins and the input is dropped.
    pub(crate) fn take_string(&mut self, chars: String) -> GcRef {
        let hash = hash_str(&chars);
        if let Some(existing) = self.heap.find_interned(&chars, hash) {
            return existing;
        }
        self.maybe_collect();
        let string = self.heap.alloc(ObjKind::Str(StrObj { chars, hash }));
        self.push(Value::Obj(string));
        self.heap.intern(string, hash);
        self.pop();
        string
    }

    /// A blank function template for the compiler.
    pub(crate) fn new_function(&mut self) -> GcRef {
        self.maybe_collect();
        self.heap.alloc(ObjKind::Function(FunctionObj {
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
            name: None,
        }))
    }

    fn define_native(&mut self, name: &'static str, function: NativeFn) {
        let name_ref = self.copy_string(name);
        self.push(Value::Obj(name_ref));
        self.maybe_collect();
        let native = self.heap.alloc(ObjKind::Native(NativeObj { name, function }));
        self.push(Value::Obj(native));
        let hash = self.heap.string_hash(name_ref);
        self.globals.set(name_ref, hash, Value::Obj(native));
        self.pop();
        self.pop();
    }

    // ----- garbage collection --------------------------------------------

    /// Collect if the threshold has been crossed (or on every call in
    /// stress mode). Every allocation site runs through here first, so
    /// anything reachable from the roots survives the allocation.
    pub(crate) fn maybe_collect(&mut self) {
        if self.config.stress_gc || self.heap.wants_gc() {
            self.collect_garbage();
        }
    }

    fn collect_garbage(&mut self) {
        let before = self.heap.bytes_allocated();
        if self.config.trace_gc {
            eprintln!("[GC] collect begin, {} bytes live", before);
        }

        self.mark_roots();
        self.heap.trace_references();
        // Weak intern entries are reconciled after marking, before the
        // sweep frees their keys.
        self.heap.remove_unmarked_strings();
        let freed = self.heap.sweep();

        if self.config.trace_gc {
            eprintln!(
                "[GC] collect end, freed {} bytes ({} -> {})",
                freed,
                before,
                self.heap.bytes_allocated()
            );
        }
    }

    fn mark_roots(&mut self) {
        for &value in &self.stack {
            self.heap.mark_value(value);
        }
        for frame in &self.frames {
            self.heap.mark_object(frame.closure);
        }
        let mut upvalue = self.open_upvalues;
        while let Some(r) = upvalue {
            self.heap.mark_object(r);
            upvalue = self.heap.upvalue(r).next;
        }
        self.heap.mark_table(&self.globals);
        if let Some(init) = self.init_string {
            self.heap.mark_object(init);
        }
        self.heap.mark_own_roots();
    }

    // ----- dispatch -------------------------------------------------------

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().unwrap();
        let byte = self.heap.closure_chunk(frame.closure).code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let high = self.read_byte();
        let low = self.read_byte();
        ((high as u16) << 8) | low as u16
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        let frame = self.frames.last().unwrap();
        self.heap.closure_chunk(frame.closure).constants[index]
    }

    fn read_string(&mut self) -> GcRef {
        self.read_constant().as_obj().unwrap()
    }

    fn run(&mut self) -> Result<(), String> {
        loop {
            if self.stack.len() > STACK_MAX {
                return Err("Stack overflow.".to_string());
            }

            let op = match OpCode::from_byte(self.read_byte()) {
                Some(op) => op,
                None => return Err("Unknown opcode.".to_string()),
            };
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slots;
                    let value = self.stack[base + slot];
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slots;
                    // Assignment is an expression; the value stays put.
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    match self.globals.get(name, hash) {
                        Some(value) => self.push(value),
                        None => {
                            return Err(format!(
                                "Undefined variable '{}'.",
                                self.heap.string(name)
                            ));
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    let value = self.peek(0);
                    self.globals.set(name, hash, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    let value = self.peek(0);
                    // Assignment never creates a binding; undo and error
                    // if the name was unknown.
                    if self.globals.set(name, hash, value) {
                        self.globals.delete(name, hash);
                        return Err(format!(
                            "Undefined variable '{}'.",
                            self.heap.string(name)
                        ));
                    }
                }
                OpCode::GetUpvalue => {
                    let index = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = self.heap.closure(closure).upvalues[index];
                    let value = match self.heap.upvalue(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[slot],
                        UpvalueState::Closed(value) => value,
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let index = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = self.heap.closure(closure).upvalues[index];
                    let value = self.peek(0);
                    match self.heap.upvalue(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[slot] = value,
                        UpvalueState::Closed(_) => {
                            self.heap.upvalue_mut(upvalue).state = UpvalueState::Closed(value);
                        }
                    }
                }
                OpCode::GetProperty => {
                    let name = self.read_string();
                    let receiver = self.peek(0);
                    let instance = match receiver
                        .as_obj()
                        .filter(|&r| matches!(self.heap.get(r).kind, ObjKind::Instance(_)))
                    {
                        Some(instance) => instance,
                        None => return Err("Only instances have properties.".to_string()),
                    };
                    let hash = self.heap.string_hash(name);
                    if let Some(value) = self.heap.instance(instance).fields.get(name, hash) {
                        self.pop();
                        self.push(value);
                    } else {
                        let class = self.heap.instance(instance).class;
                        self.bind_method(class, name)?;
                    }
                }
                OpCode::SetProperty => {
                    let name = self.read_string();
                    let target = self.peek(1);
                    let instance = match target
                        .as_obj()
                        .filter(|&r| matches!(self.heap.get(r).kind, ObjKind::Instance(_)))
                    {
                        Some(instance) => instance,
                        None => return Err("Only instances have fields.".to_string()),
                    };
                    let hash = self.heap.string_hash(name);
                    let value = self.peek(0);
                    self.heap.instance_mut(instance).fields.set(name, hash, value);
                    let value = self.pop();
                    self.pop(); // receiver
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_obj().unwrap();
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.numeric_binary(|a, b| Value::Bool(a > b))?,
                OpCode::Less => self.numeric_binary(|a, b| Value::Bool(a < b))?,
                OpCode::Add => {
                    let (a, b) = (self.peek(1), self.peek(0));
                    match (a, b) {
                        (Value::Number(x), Value::Number(y)) => {
                            self.pop();
                            self.pop();
                            self.push(Value::Number(x + y));
                        }
                        (Value::Obj(x), Value::Obj(y))
                            if matches!(self.heap.get(x).kind, ObjKind::Str(_))
                                && matches!(self.heap.get(y).kind, ObjKind::Str(_)) =>
                        {
                            self.pop();
                            self.pop();
                            let mut chars = self.heap.string(x).to_string();
                            chars.push_str(self.heap.string(y));
                            let result = self.take_string(chars);
                            self.push(Value::Obj(result));
                        }
                        _ => {
                            return Err(
                                "Operands must be two numbers or two strings.".to_string()
                            );
                        }
                    }
                }
                OpCode::Subtract => self.numeric_binary(|a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.numeric_binary(|a, b| Value::Number(a * b))?,
                OpCode::Divide => self.numeric_binary(|a, b| Value::Number(a / b))?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => match self.peek(0) {
                    Value::Number(n) => {
                        self.pop();
                        self.push(Value::Number(-n));
                    }
                    _ => return Err("Operand must be a number.".to_string()),
                },
                OpCode::Print => {
                    let value = self.pop();
                    let text = self.heap.format_value(value);
                    let _ = writeln!(self.output, "{}", text);
                }
                OpCode::Jump => {
                    let offset = self.read_u16() as usize;
                    self.frames.last_mut().unwrap().ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16() as usize;
                    // The condition is left on the stack; logical
                    // operators rely on that.
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().unwrap().ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16() as usize;
                    self.frames.last_mut().unwrap().ip -= offset;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte() as usize;
                    let callee = self.peek(arg_count);
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte() as usize;
                    self.invoke(name, arg_count)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte() as usize;
                    let superclass = self.pop().as_obj().unwrap();
                    self.invoke_from_class(superclass, name, arg_count)?;
                }
                OpCode::Closure => {
                    let function = self.read_constant().as_obj().unwrap();
                    let upvalue_count = self.heap.function(function).upvalue_count;
                    self.maybe_collect();
                    let closure = self.heap.alloc(ObjKind::Closure(ClosureObj {
                        function,
                        upvalues: Vec::with_capacity(upvalue_count),
                    }));
                    // On the stack before the upvalues are captured, so
                    // collections triggered by capture see it.
                    self.push(Value::Obj(closure));
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() != 0;
                        let index = self.read_byte() as usize;
                        let upvalue = if is_local {
                            let base = self.frames.last().unwrap().slots;
                            self.capture_upvalue(base + index)
                        } else {
                            let enclosing = self.frames.last().unwrap().closure;
                            self.heap.closure(enclosing).upvalues[index]
                        };
                        self.heap.closure_mut(closure).upvalues.push(upvalue);
                    }
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().unwrap();
                    self.close_upvalues(frame.slots);
                    if self.frames.is_empty() {
                        // Pop the script closure itself.
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.slots);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    self.maybe_collect();
                    let class = self.heap.alloc(ObjKind::Class(ClassObj {
                        name,
                        methods: Table::new(),
                    }));
                    self.push(Value::Obj(class));
                }
                OpCode::Inherit => {
                    let superclass = match self
                        .peek(1)
                        .as_obj()
                        .filter(|&r| matches!(self.heap.get(r).kind, ObjKind::Class(_)))
                    {
                        Some(class) => class,
                        None => return Err("Superclass must be a class.".to_string()),
                    };
                    let subclass = self.peek(0).as_obj().unwrap();
                    // Copy-down inheritance: methods land in the subclass
                    // table before its own declarations overwrite them.
                    let methods: Vec<(GcRef, Value)> =
                        self.heap.class(superclass).methods.iter().collect();
                    for (name, method) in methods {
                        let hash = self.heap.string_hash(name);
                        self.heap.class_mut(subclass).methods.set(name, hash, method);
                    }
                    self.pop(); // subclass; the superclass stays as the 'super' binding
                }
                OpCode::Method => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    let method = self.peek(0);
                    let class = self.peek(1).as_obj().unwrap();
                    self.heap.class_mut(class).methods.set(name, hash, method);
                    self.pop();
                }
            }
        }
    }

    fn numeric_binary(&mut self, op: fn(f64, f64) -> Value) -> Result<(), String> {
        let (Value::Number(b), Value::Number(a)) = (self.peek(0), self.peek(1)) else {
            return Err("Operands must be numbers.".to_string());
        };
        self.pop();
        self.pop();
        self.push(op(a, b));
        Ok(())
    }

    // ----- calls ----------------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: usize) -> Result<(), String> {
        enum Kind {
            Bound(Value, GcRef),
            Class,
            Closure,
            Native(NativeFn),
            NotCallable,
        }

        if let Value::Obj(r) = callee {
            let kind = match &self.heap.get(r).kind {
                ObjKind::BoundMethod(b) => Kind::Bound(b.receiver, b.method),
                ObjKind::Class(_) => Kind::Class,
                ObjKind::Closure(_) => Kind::Closure,
                ObjKind::Native(n) => Kind::Native(n.function),
                _ => Kind::NotCallable,
            };
            match kind {
                Kind::Bound(receiver, method) => {
                    // The receiver takes over the callee slot, so methods
                    // see it as local slot zero.
                    let base = self.stack.len() - arg_count - 1;
                    self.stack[base] = receiver;
                    return self.call(method, arg_count);
                }
                Kind::Class => {
                    self.maybe_collect();
                    let instance = self.heap.alloc(ObjKind::Instance(InstanceObj {
                        class: r,
                        fields: Table::new(),
                    }));
                    let base = self.stack.len() - arg_count - 1;
                    self.stack[base] = Value::Obj(instance);

                    if let Some(init) = self.init_string {
                        let hash = self.heap.string_hash(init);
                        if let Some(initializer) = self.heap.class(r).methods.get(init, hash) {
                            return self.call(initializer.as_obj().unwrap(), arg_count);
                        }
                    }
                    if arg_count != 0 {
                        return Err(format!("Expected 0 arguments but got {}.", arg_count));
                    }
                    return Ok(());
                }
                Kind::Closure => return self.call(r, arg_count),
                Kind::Native(function) => {
                    let base = self.stack.len() - arg_count;
                    let result = function(&self.stack[base..])?;
                    self.stack.truncate(base - 1);
                    self.push(result);
                    return Ok(());
                }
                Kind::NotCallable => {}
            }
        }
        Err("Can only call functions and classes.".to_string())
    }

    /// Push a frame for a closure call. The frame is not pushed when the
    /// arity check fails or the frame limit is hit.
    fn call(&mut self, closure: GcRef, arg_count: usize) -> Result<(), String> {
        let arity = self.heap.function(self.heap.closure(closure).function).arity;
        if arg_count != arity {
            return Err(format!(
                "Expected {} arguments but got {}.",
                arity, arg_count
            ));
        }
        if self.frames.len() == FRAMES_MAX {
            return Err("Stack overflow.".to_string());
        }
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slots: self.stack.len() - arg_count - 1,
        });
        Ok(())
    }

    fn invoke(&mut self, name: GcRef, arg_count: usize) -> Result<(), String> {
        let receiver = self.peek(arg_count);
        let instance = match receiver
            .as_obj()
            .filter(|&r| matches!(self.heap.get(r).kind, ObjKind::Instance(_)))
        {
            Some(instance) => instance,
            None => return Err("Only instances have methods.".to_string()),
        };

        // A field holding a callable shadows the method of the same name.
        let hash = self.heap.string_hash(name);
        if let Some(field) = self.heap.instance(instance).fields.get(name, hash) {
            let base = self.stack.len() - arg_count - 1;
            self.stack[base] = field;
            return self.call_value(field, arg_count);
        }

        let class = self.heap.instance(instance).class;
        self.invoke_from_class(class, name, arg_count)
    }

    fn invoke_from_class(
        &mut self,
        class: GcRef,
        name: GcRef,
        arg_count: usize,
    ) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        match self.heap.class(class).methods.get(name, hash) {
            Some(method) => self.call(method.as_obj().unwrap(), arg_count),
            None => Err(format!("Undefined property '{}'.", self.heap.string(name))),
        }
    }

    fn bind_method(&mut self, class: GcRef, name: GcRef) -> Result<(), String> {
        let hash = self.heap.string_hash(name);
        let method = match self.heap.class(class).methods.get(name, hash) {
            Some(method) => method.as_obj().unwrap(),
            None => {
                return Err(format!("Undefined property '{}'.", self.heap.string(name)));
            }
        };

        self.maybe_collect();
        let receiver = self.peek(0);
        let bound = self.heap.alloc(ObjKind::BoundMethod(BoundMethodObj {
            receiver,
            method,
        }));
        self.pop();
        self.push(Value::Obj(bound));
        Ok(())
    }

    // ----- upvalues -------------------------------------------------------

    /// Find or create the open upvalue over a stack slot. The list is
    /// sorted by descending slot, so the walk stops as soon as it passes
    /// the target.
    fn capture_upvalue(&mut self, slot: usize) -> GcRef {
        let mut prev = None;
        let mut current = self.open_upvalues;
        while let Some(r) = current {
            match self.heap.upvalue(r).state {
                UpvalueState::Open(s) if s > slot => {
                    prev = Some(r);
                    current = self.heap.upvalue(r).next;
                }
                _ => break,
            }
        }
        if let Some(r) = current {
            if let UpvalueState::Open(s) = self.heap.upvalue(r).state {
                if s == slot {
                    return r;
                }
            }
        }

        self.maybe_collect();
        let created = self.heap.alloc(ObjKind::Upvalue(UpvalueObj {
            state: UpvalueState::Open(slot),
            next: current,
        }));
        match prev {
            None => self.open_upvalues = Some(created),
            Some(prev) => self.heap.upvalue_mut(prev).next = Some(created),
        }
        created
    }

    /// Close every open upvalue at or above `floor`: the captured value
    /// moves into the upvalue and the object leaves the open list.
    fn close_upvalues(&mut self, floor: usize) {
        while let Some(r) = self.open_upvalues {
            let slot = match self.heap.upvalue(r).state {
                UpvalueState::Open(slot) => slot,
                UpvalueState::Closed(_) => unreachable!("closed upvalue on open list"),
            };
            if slot < floor {
                break;
            }
            let value = self.stack[slot];
            let next = self.heap.upvalue(r).next;
            let upvalue = self.heap.upvalue_mut(r);
            upvalue.state = UpvalueState::Closed(value);
            upvalue.next = None;
            self.open_upvalues = next;
        }
    }

    // ----- diagnostics ----------------------------------------------------

    /// Print the message and a traceback, innermost frame first. Lines
    /// come from the per-byte line map; `ip` has already advanced past
    /// the failing instruction.
    fn report_runtime_error(&self, message: &str) {
        eprintln!("{}", message);
        for frame in self.frames.iter().rev() {
            let function = self.heap.closure(frame.closure).function;
            let function = self.heap.function(function);
            let line = function.chunk.lines[frame.ip.saturating_sub(1)];
            match function.name {
                Some(name) => eprintln!("[line {}] in {}()", line, self.heap.string(name)),
                None => eprintln!("[line {}] in script", line),
            }
        }
    }
}

fn native_clock(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("clock went backwards: {}.", e))?;
    Ok(Value::Number(now.as_secs_f64()))
}
